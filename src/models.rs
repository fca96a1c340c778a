//! Diesel models for session persistence.
//!
//! Two tables back a persisted chat session: `conversations` groups turns
//! under a human-readable session name, and `messages` holds one row per
//! turn. See `crate::schema` for the table definitions; the tables are
//! created on demand by [`crate::session::ChatSession::with_persistence`].

use diesel::prelude::*;

/// A named chat session.
#[derive(Queryable, Identifiable, Insertable, Debug, Selectable)]
#[diesel(table_name = crate::schema::conversations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Conversation {
    /// Auto-increment primary key (set by the DB on insert).
    #[diesel(deserialize_as = i32)]
    pub id: Option<i32>,
    /// Unique session name for this conversation.
    pub session_name: String,
}

/// One turn in a persisted conversation. `role` is `"system"`, `"user"`,
/// or `"assistant"`.
#[derive(Queryable, Associations, Insertable, Debug, Selectable, Clone)]
#[diesel(belongs_to(Conversation))]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Message {
    /// Auto-increment primary key (set by the DB on insert).
    #[diesel(deserialize_as = i32)]
    pub id: Option<i32>,
    pub role: String,
    pub content: String,
    pub conversation_id: Option<i32>,
}
