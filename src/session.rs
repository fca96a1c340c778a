//! Per-session conversation state.
//!
//! A [`ChatSession`] owns the transcript of one user session: an
//! append-only list of turns in strict chronological order. Nothing is ever
//! reordered or deleted from the transcript; the history *sent* to the
//! model is bounded separately by [`ChatSession::bounded_history`], which
//! drops the oldest user/assistant pairs from the view (not the transcript)
//! until the token budget fits.
//!
//! When the configuration carries a session name, turns are mirrored to a
//! SQLite database and prior turns are rehydrated on open, so a named
//! session survives process restarts.

use diesel::prelude::*;
use diesel::SqliteConnection;
use tiktoken_rs::cl100k_base;
use tracing::info;

use crate::config::{ClerkConfig, establish_connection};
use crate::error::{ClerkError, Result};
use crate::message::{Role, Turn};
use crate::models::{Conversation, Message};
use crate::schema;

pub struct ChatSession {
    turns: Vec<Turn>,
    config: ClerkConfig,
    connection: Option<SqliteConnection>,
    conversation_id: Option<i32>,
}

fn ensure_tables(conn: &mut SqliteConnection) -> Result<()> {
    diesel::sql_query(
        "CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_name TEXT NOT NULL UNIQUE
        )",
    )
    .execute(conn)?;
    diesel::sql_query(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            conversation_id INTEGER REFERENCES conversations(id)
        )",
    )
    .execute(conn)?;
    Ok(())
}

fn ensure_conversation(conn: &mut SqliteConnection, name: &str) -> Result<Conversation> {
    let conversation = conn.transaction(|conn| {
        let existing: Option<Conversation> = schema::conversations::table
            .filter(schema::conversations::session_name.eq(name))
            .first(conn)
            .optional()?;

        match existing {
            Some(conversation) => Ok(conversation),
            None => diesel::insert_into(schema::conversations::table)
                .values(&Conversation {
                    id: None,
                    session_name: name.to_string(),
                })
                .returning(Conversation::as_returning())
                .get_result(conn),
        }
    })?;
    Ok(conversation)
}

impl ChatSession {
    /// A transient in-memory session.
    pub fn new(config: ClerkConfig) -> Self {
        Self {
            turns: Vec::new(),
            config,
            connection: None,
            conversation_id: None,
        }
    }

    /// Open (or resume) the named session from `config.session_db_url`,
    /// creating tables on first use and rehydrating prior turns.
    pub fn with_persistence(config: ClerkConfig) -> Result<Self> {
        let name = config
            .session_name
            .clone()
            .ok_or_else(|| ClerkError::Config("no session name configured".to_string()))?;

        let mut connection = establish_connection(&config.session_db_url)?;
        ensure_tables(&mut connection)?;
        let conversation = ensure_conversation(&mut connection, &name)?;
        let conversation_id = conversation
            .id
            .ok_or_else(|| ClerkError::Config("conversation row has no id".to_string()))?;

        let rows: Vec<Message> = schema::messages::table
            .filter(schema::messages::conversation_id.eq(Some(conversation_id)))
            .order(schema::messages::id.asc())
            .load(&mut connection)?;

        let turns = rows
            .into_iter()
            .filter_map(|row| Role::parse(&row.role).map(|role| Turn::new(role, row.content)))
            .collect::<Vec<_>>();

        info!(session = %name, prior_turns = turns.len(), "session opened");

        Ok(Self {
            turns,
            config,
            connection: Some(connection),
            conversation_id: Some(conversation_id),
        })
    }

    /// Append one turn, mirroring it to the database for named sessions.
    /// This is the only mutator; turns arrive in completion order.
    pub fn append(&mut self, turn: Turn) -> Result<()> {
        if let (Some(conn), Some(conversation_id)) =
            (self.connection.as_mut(), self.conversation_id)
        {
            let row = Message {
                id: None,
                role: turn.role.to_string(),
                content: turn.content.clone(),
                conversation_id: Some(conversation_id),
            };
            conn.transaction(|conn| {
                diesel::insert_into(schema::messages::table)
                    .values(&row)
                    .returning(Message::as_returning())
                    .get_result::<Message>(conn)
            })?;
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Read-only view of the full transcript, chronological order.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Token budget available to history:
    /// `context_max_tokens - assistant_minimum_context_tokens`.
    pub fn history_token_budget(&self) -> isize {
        self.config.context_max_tokens as isize
            - self.config.assistant_minimum_context_tokens as isize
    }

    /// The suffix of the transcript that fits the token budget, dropping
    /// the oldest user/assistant pair first. The stored transcript is left
    /// untouched.
    pub fn bounded_history(&self) -> Vec<Turn> {
        let budget = self.history_token_budget();
        let bpe = cl100k_base().unwrap();
        let tokens_of = |turns: &[Turn]| -> isize {
            turns
                .iter()
                .map(|t| bpe.encode_with_special_tokens(&t.content).len() as isize)
                .sum()
        };

        let mut start = 0;
        while self.turns.len() - start > 2 && tokens_of(&self.turns[start..]) > budget {
            start += 2;
        }
        self.turns[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(db_url: &str, session_name: Option<&str>) -> ClerkConfig {
        ClerkConfig {
            api_key: String::new(),
            api_base: String::new(),
            model: "test".to_string(),
            context_max_tokens: 8192,
            assistant_minimum_context_tokens: 2048,
            should_stream: None,
            top_k: 3,
            faq_match: Default::default(),
            faq: vec![],
            session_db_url: db_url.to_string(),
            session_name: session_name.map(str::to_string),
            indices: vec![],
        }
    }

    #[test]
    fn append_is_monotonic_and_alternating() {
        let mut session = ChatSession::new(config(":memory:", None));
        for i in 0..4 {
            session.append(Turn::user(format!("question {i}"))).unwrap();
            session.append(Turn::assistant(format!("answer {i}"))).unwrap();
        }

        let transcript = session.snapshot();
        assert_eq!(transcript.len(), 8);
        for (i, turn) in transcript.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected);
        }
        assert_eq!(transcript[0].content, "question 0");
        assert_eq!(transcript[7].content, "answer 3");
    }

    #[test]
    fn bounded_history_drops_oldest_pairs_but_keeps_transcript() {
        let mut cfg = config(":memory:", None);
        cfg.context_max_tokens = 40;
        cfg.assistant_minimum_context_tokens = 10;
        let mut session = ChatSession::new(cfg);

        for i in 0..6 {
            session
                .append(Turn::user(format!(
                    "a fairly long customer question number {i} with extra words"
                )))
                .unwrap();
            session
                .append(Turn::assistant(format!(
                    "a fairly long assistant answer number {i} with extra words"
                )))
                .unwrap();
        }

        let bounded = session.bounded_history();
        assert!(bounded.len() < session.len());
        assert!(bounded.len() >= 2);
        // The view keeps the most recent turns and starts on a user turn.
        assert_eq!(bounded.last(), session.snapshot().last());
        assert_eq!(bounded[0].role, Role::User);
        // Transcript untouched.
        assert_eq!(session.len(), 12);
    }

    #[test]
    fn bounded_history_returns_everything_under_budget() {
        let mut session = ChatSession::new(config(":memory:", None));
        session.append(Turn::user("hi")).unwrap();
        session.append(Turn::assistant("hello")).unwrap();
        assert_eq!(session.bounded_history(), session.snapshot().to_vec());
    }

    #[test]
    fn persisted_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("clerk.db");
        let db_url = db.to_str().unwrap().to_string();

        {
            let mut session =
                ChatSession::with_persistence(config(&db_url, Some("demo"))).unwrap();
            assert!(session.is_empty());
            session.append(Turn::user("do you sell tea")).unwrap();
            session.append(Turn::assistant("we do")).unwrap();
        }

        let session = ChatSession::with_persistence(config(&db_url, Some("demo"))).unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.snapshot()[0], Turn::user("do you sell tea"));
        assert_eq!(session.snapshot()[1], Turn::assistant("we do"));
    }

    #[test]
    fn sessions_are_isolated_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("clerk.db");
        let db_url = db.to_str().unwrap().to_string();

        {
            let mut session =
                ChatSession::with_persistence(config(&db_url, Some("alpha"))).unwrap();
            session.append(Turn::user("alpha question")).unwrap();
        }

        let session = ChatSession::with_persistence(config(&db_url, Some("beta"))).unwrap();
        assert!(session.is_empty());
    }

    #[test]
    fn persistence_without_a_session_name_is_a_config_error() {
        let err = ChatSession::with_persistence(config(":memory:", None))
            .err()
            .unwrap();
        assert!(matches!(err, ClerkError::Config(_)));
    }
}
