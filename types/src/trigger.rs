//! Declarative trigger rules for scripted dashboard reveals.
//!
//! A user turn that matches a rule causes the UI to reveal the rule's
//! dashboard after a fixed delay. Matching is centralized in
//! [`matches_trigger`] so the detector, the scripted backend, and tests all
//! apply the same policy instead of each growing its own keyword check.

use aho_corasick::AhoCorasickBuilder;
use serde::{Deserialize, Serialize};

/// One trigger rule.
///
/// The match policy is: exact (case-insensitive, trimmed) equality with the
/// canonical sentence, OR presence of the primary phrase AND at least one
/// secondary keyword. The secondary requirement keeps incidental mentions of
/// the primary phrase from revealing a dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Slug of the dashboard this rule reveals.
    pub dashboard: String,
    /// The scripted demo sentence; matches on its own.
    pub canonical: String,
    /// Required phrase.
    pub primary: String,
    /// At least one of these must accompany the primary phrase.
    pub secondary: Vec<String>,
}

impl TriggerRule {
    #[must_use]
    pub fn new(
        dashboard: impl Into<String>,
        canonical: impl Into<String>,
        primary: impl Into<String>,
        secondary: &[&str],
    ) -> Self {
        Self {
            dashboard: dashboard.into(),
            canonical: canonical.into(),
            primary: primary.into(),
            secondary: secondary.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Does `text` satisfy `rule`?
///
/// Pure; no state. The at-most-once bookkeeping lives with the detector, not
/// here.
#[must_use]
pub fn matches_trigger(text: &str, rule: &TriggerRule) -> bool {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case(rule.canonical.trim()) {
        return true;
    }

    let mut patterns: Vec<&str> = Vec::with_capacity(1 + rule.secondary.len());
    patterns.push(rule.primary.as_str());
    patterns.extend(rule.secondary.iter().map(String::as_str));

    let Ok(automaton) = AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(&patterns)
    else {
        return false;
    };

    let mut primary_seen = false;
    let mut secondary_seen = false;
    for hit in automaton.find_overlapping_iter(trimmed) {
        if hit.pattern().as_usize() == 0 {
            primary_seen = true;
        } else {
            secondary_seen = true;
        }
        if primary_seen && secondary_seen {
            return true;
        }
    }
    false
}

/// The built-in rule set for the Omnis demo dashboards.
#[must_use]
pub fn default_trigger_rules() -> Vec<TriggerRule> {
    vec![
        TriggerRule::new(
            "av-fleet",
            "Show today's autonomous truck performance with insights from Gatik, NVIDIA, and Applied Intuition",
            "autonomous truck",
            &["gatik", "nvidia", "applied intuition"],
        ),
        TriggerRule::new(
            "esg-portfolio",
            "Analyze the ESG portfolio with emissions and sustainability breakdowns",
            "esg portfolio",
            &["emissions", "sustainability", "carbon"],
        ),
        TriggerRule::new(
            "measles-outbreak",
            "Map the current measles outbreak with case counts and vaccination coverage",
            "measles outbreak",
            &["map", "cases", "vaccination"],
        ),
        TriggerRule::new(
            "digital-twin",
            "Open the manufacturing digital twin with throughput and defect analytics",
            "digital twin",
            &["manufacturing", "throughput", "defect"],
        ),
        TriggerRule::new(
            "retail-nudge",
            "Run the retail nudge simulation with bundle and basket conversion data",
            "retail nudge",
            &["bundle", "basket", "conversion"],
        ),
    ]
}
