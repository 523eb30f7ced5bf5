use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::call::Phase;

/// Point-in-time view of a call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub transcript_id: String,

    /// Current lifecycle phase
    pub phase: Phase,

    /// Loop iterations started so far
    pub loops: usize,

    /// Completed user/assistant exchanges
    pub turns: usize,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,
}
