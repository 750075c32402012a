//! Trigger detection over the conversation log.
//!
//! The detector walks adjacent (user, assistant) turn pairs and tests the
//! user side against the rule set. An assistant turn is scanned at most
//! once for the life of the conversation - matched or clean, its id goes
//! into the scanned set and later scans skip it. Turns still streaming are
//! left for a later scan so a reveal never fires while the reply is
//! arriving.

use std::collections::HashSet;

use omnis_types::{Role, TriggerRule, TurnId, default_trigger_rules, matches_trigger};

use crate::store::MessageStore;

/// A fresh trigger match reported by [`TriggerDetector::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// The assistant turn whose completion made the pair scannable.
    pub turn: TurnId,
    /// Dashboard slug of the matched rule.
    pub dashboard: String,
}

#[derive(Debug)]
pub struct TriggerDetector {
    rules: Vec<TriggerRule>,
    scanned: HashSet<TurnId>,
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new(default_trigger_rules())
    }
}

impl TriggerDetector {
    #[must_use]
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        Self {
            rules,
            scanned: HashSet::new(),
        }
    }

    #[must_use]
    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Scan the store for unscanned (user, assistant) pairs whose assistant
    /// turn has left its streaming phase. Re-scanning is a no-op for ids
    /// already seen.
    pub fn scan(&mut self, store: &MessageStore) -> Vec<TriggerMatch> {
        let mut matches = Vec::new();

        for pair in store.turns().windows(2) {
            let [user, assistant] = pair else { continue };
            if user.role() != Role::User || assistant.role() != Role::Assistant {
                continue;
            }
            if assistant.is_streaming() {
                continue;
            }
            if !self.scanned.insert(assistant.id()) {
                continue;
            }

            let rule = self
                .rules
                .iter()
                .find(|rule| matches_trigger(user.content(), rule));
            if let Some(rule) = rule {
                matches.push(TriggerMatch {
                    turn: assistant.id(),
                    dashboard: rule.dashboard.clone(),
                });
            }
        }

        matches
    }

    /// Forget every scanned id. Called as part of a conversation reset so
    /// the same phrase can trigger again in the fresh conversation.
    pub fn clear(&mut self) {
        self.scanned.clear();
    }
}
