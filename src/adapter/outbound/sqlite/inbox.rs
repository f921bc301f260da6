//! SQLite tenant inbox.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{MessageRow, NewMessageRow};
use crate::adapter::outbound::sqlite::database::schema::messages;
use crate::domain::{Message, MessageId, TenantId};
use crate::error::{Error, Result};
use crate::port::outbound::inbox::Inbox;

/// SQLite-backed per-tenant message list.
pub struct SqliteInbox {
    pool: DbPool,
}

impl SqliteInbox {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn from_row(row: MessageRow) -> Result<Message> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| Error::Parse(e.to_string()))?
            .with_timezone(&Utc);
        Ok(Message {
            id: MessageId::from(row.id),
            tenant: TenantId::parse(&row.tenant).map_err(|e| Error::Parse(e.to_string()))?,
            author: row.author,
            body: row.body,
            created_at,
        })
    }
}

impl Inbox for SqliteInbox {
    fn push(&self, message: Message) -> Result<()> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let row = NewMessageRow {
            id: message.id.to_string(),
            tenant: message.tenant.to_string(),
            author: message.author,
            body: message.body,
            created_at: message.created_at.to_rfc3339(),
        };
        diesel::insert_into(messages::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn drain(&self, tenant: &TenantId) -> Result<Vec<Message>> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let rows: Vec<MessageRow> = conn.immediate_transaction(|conn| {
            let rows: Vec<MessageRow> = messages::table
                .filter(messages::tenant.eq(tenant.as_str()))
                .order(messages::seq.asc())
                .select(MessageRow::as_select())
                .load(conn)?;
            diesel::delete(messages::table.filter(messages::tenant.eq(tenant.as_str())))
                .execute(conn)?;
            Ok::<_, Error>(rows)
        })?;

        rows.into_iter().map(Self::from_row).collect()
    }
}
