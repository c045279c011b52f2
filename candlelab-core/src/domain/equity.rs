use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cash balance plus mark-to-market of open positions, one per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    pub balance: f64,
}
