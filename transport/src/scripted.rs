//! Scripted backend: canned replies streamed word by word.
//!
//! Used when no agent endpoint is configured, and by tests that need a
//! deterministic stream. Replies are selected with the same
//! [`matches_trigger`] policy the session's detector uses, so a query that
//! reveals a dashboard also gets that dashboard's narration.

use std::time::Duration;

use futures_util::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;

use omnis_types::{StreamEvent, TriggerRule, default_trigger_rules, matches_trigger};

use crate::StreamHandle;

const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(30);

const FALLBACK_REPLY: &str = "I can pull up any of the Omnis demo dashboards for you: \
autonomous fleet telemetry, ESG portfolio analysis, the measles outbreak map, \
the manufacturing digital twin, or the retail nudge simulation. \
Ask about one of those and I'll walk you through it.";

#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    rules: Vec<TriggerRule>,
    chunk_delay: Duration,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new(default_trigger_rules())
    }
}

impl ScriptedTransport {
    #[must_use]
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        Self {
            rules,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    /// Zero delay makes tests immediate; the default paces the stream so the
    /// demo looks like a live agent.
    #[must_use]
    pub fn with_chunk_delay(mut self, chunk_delay: Duration) -> Self {
        self.chunk_delay = chunk_delay;
        self
    }

    #[must_use]
    pub fn open(&self, query: &str) -> StreamHandle {
        let reply = self.reply_for(query).to_string();
        let delay = self.chunk_delay;

        let (tx, rx) = mpsc::unbounded_channel();
        let (abort_handle, abort_registration) = AbortHandle::new_pair();

        let task = async move {
            for piece in split_streamable(&reply) {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(StreamEvent::Chunk(piece.to_string())).is_err() {
                    return;
                }
            }
            let _ = tx.send(StreamEvent::Done);
        };
        tokio::spawn(async move {
            let _ = Abortable::new(task, abort_registration).await;
        });

        StreamHandle::new(rx, abort_handle)
    }

    fn reply_for(&self, query: &str) -> &'static str {
        self.rules
            .iter()
            .find(|rule| matches_trigger(query, rule))
            .map_or(FALLBACK_REPLY, |rule| narration(&rule.dashboard))
    }
}

/// Split on word boundaries, keeping the trailing whitespace with each word
/// so concatenating the pieces reproduces the reply byte-for-byte.
fn split_streamable(reply: &str) -> impl Iterator<Item = &str> {
    reply.split_inclusive(' ')
}

fn narration(dashboard: &str) -> &'static str {
    match dashboard {
        "av-fleet" => {
            "Here's today's autonomous fleet picture. Fourteen trucks are on \
route with a 98.2% on-time delivery rate. Gatik's middle-mile runs are \
averaging 41 mph with zero disengagements since 6am, NVIDIA's perception \
stack is reporting nominal confidence across all routes, and Applied \
Intuition's simulation replay flagged two intersections worth reviewing. \
Opening the fleet telemetry dashboard now."
        }
        "esg-portfolio" => {
            "Portfolio ESG exposure is trending better than benchmark this \
quarter. Scope 1 and 2 emissions intensity is down 7% year over year, \
sustainability-linked holdings now make up 34% of the book, and the two \
laggards flagged last review have both published remediation plans. The \
full breakdown is in the ESG dashboard."
        }
        "measles-outbreak" => {
            "The outbreak map shows 312 confirmed measles cases across five \
counties, concentrated where vaccination coverage has slipped below 90%. \
Case growth has slowed to 4% week over week and two counties are past \
their peak. Bringing up the outbreak map with county-level detail."
        }
        "digital-twin" => {
            "The digital twin has line 3 running at 87% of rated throughput \
with a projected defect rate of 0.8%. The bottleneck moved from the press \
to final inspection after yesterday's changeover, and the twin suggests a \
4% throughput gain from rebalancing two stations. Loading the \
manufacturing analytics view."
        }
        "retail-nudge" => {
            "The nudge simulation projects a 6.3% basket-size lift from the \
proposed bundle placement, with conversion strongest in the 25-34 \
segment. Margin impact stays positive under all three pricing scenarios. \
Opening the simulation results."
        }
        _ => FALLBACK_REPLY,
    }
}
