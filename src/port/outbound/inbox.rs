//! Tenant inbox port.

use crate::domain::{Message, TenantId};
use crate::error::Result;

/// Per-tenant message list, read and cleared by the tenant.
pub trait Inbox: Send + Sync {
    /// Append a message to its tenant's inbox.
    fn push(&self, message: Message) -> Result<()>;

    /// Return and remove all of a tenant's messages, oldest first.
    fn drain(&self, tenant: &TenantId) -> Result<Vec<Message>>;
}

impl<T: Inbox + ?Sized> Inbox for std::sync::Arc<T> {
    fn push(&self, message: Message) -> Result<()> {
        (**self).push(message)
    }

    fn drain(&self, tenant: &TenantId) -> Result<Vec<Message>> {
        (**self).drain(tenant)
    }
}
