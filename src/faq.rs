//! FAQ fast path.
//!
//! A static trigger → reply table checked before retrieval. A hit answers
//! the question with zero embedding or network calls; a miss hands control
//! to the retriever. The matching policy is an explicit construction-time
//! choice, not an accident of which script variant is running.

use serde::{Deserialize, Serialize};

use crate::config::ClerkConfig;

/// How a query is matched against the table.
///
/// `Exact` requires the query to equal a trigger verbatim. `Substring`
/// answers with the first declared trigger that occurs anywhere inside the
/// query, which catches phrasings like "what are your hours today" but has a
/// higher false-positive rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    Exact,
    Substring,
}

/// One canned answer, keyed by its trigger text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub trigger: String,
    pub reply: String,
}

/// Read-only table of canned answers, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FaqTable {
    entries: Vec<FaqEntry>,
    policy: MatchPolicy,
}

impl FaqTable {
    pub fn new(entries: Vec<FaqEntry>, policy: MatchPolicy) -> Self {
        Self { entries, policy }
    }

    /// Build the table from the loaded configuration.
    pub fn from_config(config: &ClerkConfig) -> Self {
        Self::new(config.faq.clone(), config.faq_match)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up a canned answer. `None` means "no match", not an error.
    ///
    /// Under `Substring`, triggers are tried in declaration order and the
    /// first match wins.
    pub fn lookup(&self, query: &str) -> Option<&str> {
        match self.policy {
            MatchPolicy::Exact => self
                .entries
                .iter()
                .find(|e| e.trigger == query)
                .map(|e| e.reply.as_str()),
            MatchPolicy::Substring => self
                .entries
                .iter()
                .find(|e| query.contains(&e.trigger))
                .map(|e| e.reply.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours_table(policy: MatchPolicy) -> FaqTable {
        FaqTable::new(
            vec![FaqEntry {
                trigger: "hours".to_string(),
                reply: "9-6 Mon-Fri".to_string(),
            }],
            policy,
        )
    }

    #[test]
    fn exact_policy_matches_verbatim_only() {
        let table = hours_table(MatchPolicy::Exact);
        assert_eq!(table.lookup("hours"), Some("9-6 Mon-Fri"));
        assert_eq!(table.lookup("what are your hours today"), None);
    }

    #[test]
    fn substring_policy_matches_inside_query() {
        let table = hours_table(MatchPolicy::Substring);
        assert_eq!(table.lookup("hours"), Some("9-6 Mon-Fri"));
        assert_eq!(table.lookup("what are your hours today"), Some("9-6 Mon-Fri"));
        assert_eq!(table.lookup("where is the store"), None);
    }

    #[test]
    fn substring_policy_first_declared_trigger_wins() {
        let table = FaqTable::new(
            vec![
                FaqEntry {
                    trigger: "pay".to_string(),
                    reply: "first".to_string(),
                },
                FaqEntry {
                    trigger: "payment".to_string(),
                    reply: "second".to_string(),
                },
            ],
            MatchPolicy::Substring,
        );
        assert_eq!(table.lookup("how do payments work"), Some("first"));
    }

    #[test]
    fn empty_table_never_matches() {
        let table = FaqTable::default();
        assert!(table.is_empty());
        assert_eq!(table.lookup("hours"), None);
    }
}
