//! Threshold-crossing detection. The core only decides *that* a rate
//! crossed a user's threshold and hands a `RateAlert` to an `AlertSink`;
//! delivery (email, SMS) lives behind the sink, outside this crate's
//! knowledge.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Upper/lower rate thresholds for one (user, symbol).
#[derive(Debug, Clone)]
pub struct AlertRule {
    pub user: String,
    pub symbol: String,
    pub upper_threshold: Option<f64>,
    pub lower_threshold: Option<f64>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdCrossing {
    Upper(f64),
    Lower(f64),
}

/// Event emitted when a freshly observed rate is at or beyond a
/// configured threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct RateAlert {
    pub user: String,
    pub symbol: String,
    pub previous_rate: Option<f64>,
    pub current_rate: f64,
    pub crossing: ThresholdCrossing,
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, alert: &RateAlert);
}

/// Default sink: structured log lines only.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn notify(&self, alert: &RateAlert) {
        warn!(
            user = %alert.user,
            symbol = %alert.symbol,
            previous_rate = ?alert.previous_rate,
            current_rate = alert.current_rate,
            crossing = ?alert.crossing,
            "rate threshold crossed"
        );
    }
}

/// Watches observed rates against configured rules and emits events to
/// the sink. Remembers the last rate per symbol so events carry the
/// previous observation.
pub struct AlertMonitor {
    rules: Vec<AlertRule>,
    last_seen: Mutex<HashMap<String, f64>>,
    sink: Arc<dyn AlertSink>,
}

impl AlertMonitor {
    pub fn new(rules: Vec<AlertRule>, sink: Arc<dyn AlertSink>) -> Self {
        AlertMonitor {
            rules,
            last_seen: Mutex::new(HashMap::new()),
            sink,
        }
    }

    pub async fn observe(&self, symbol: &str, rate: f64) {
        let previous_rate = {
            let mut seen = self.last_seen.lock().await;
            seen.insert(symbol.to_string(), rate)
        };

        for rule in self.rules.iter().filter(|r| r.active && r.symbol == symbol) {
            let mut crossings = Vec::new();
            if let Some(upper) = rule.upper_threshold {
                if rate >= upper {
                    crossings.push(ThresholdCrossing::Upper(upper));
                }
            }
            if let Some(lower) = rule.lower_threshold {
                if rate <= lower {
                    crossings.push(ThresholdCrossing::Lower(lower));
                }
            }

            for crossing in crossings {
                debug!(user = %rule.user, symbol, rate, ?crossing, "emitting rate alert");
                self.sink
                    .notify(&RateAlert {
                        user: rule.user.clone(),
                        symbol: symbol.to_string(),
                        previous_rate,
                        current_rate: rate,
                        crossing,
                    })
                    .await;
            }
        }
    }
}
