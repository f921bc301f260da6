//! Tenant inbox messages.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{MessageId, TenantId};

/// Author shown for messages produced by the system itself.
pub const SYSTEM_AUTHOR: &str = "Server";

/// A message addressed to one tenant, read and cleared by that tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub tenant: TenantId,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a system-authored message.
    #[must_use]
    pub fn system(tenant: TenantId, body: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            tenant,
            author: SYSTEM_AUTHOR.to_string(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}
