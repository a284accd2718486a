//! Counters for one reading session.
//!
//! Recorded by the poll loop and printed as a summary on shutdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::os::raw::c_int;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Live session counters.
#[derive(Debug)]
pub struct SessionStats {
    /// Number of `read_packets` calls
    polls: AtomicU64,
    /// Polls that returned at least one packet
    polls_with_packets: AtomicU64,
    /// Sum of packets reported by the driver
    packets_read: AtomicU64,
    /// Output lines written
    readings_emitted: AtomicU64,
    session_start: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            polls: AtomicU64::new(0),
            polls_with_packets: AtomicU64::new(0),
            packets_read: AtomicU64::new(0),
            readings_emitted: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Record one poll and the driver's packet count for it.
    ///
    /// Negative counts are driver error codes and add no packets.
    pub fn record_poll(&self, packets: c_int) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        if packets > 0 {
            self.polls_with_packets.fetch_add(1, Ordering::Relaxed);
            self.packets_read
                .fetch_add(u64::from(packets.unsigned_abs()), Ordering::Relaxed);
        }
    }

    pub fn record_reading(&self) {
        self.readings_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            polls_with_packets: self.polls_with_packets.load(Ordering::Relaxed),
            packets_read: self.packets_read.load(Ordering::Relaxed),
            readings_emitted: self.readings_emitted.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start)
                .num_seconds()
                .max(0) as u64,
        }
    }

    /// Human-readable summary for the end of a session.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Started: {}\n\
             - Polls: {} ({} with new packets)\n\
             - Packets read: {}\n\
             - Readings written: {}\n\
             - Session duration: {} seconds",
            stats.session_start.format("%Y-%m-%d %H:%M:%S UTC"),
            stats.polls,
            stats.polls_with_packets,
            stats.packets_read,
            stats.readings_emitted,
            stats.session_duration_secs
        )
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub polls: u64,
    pub polls_with_packets: u64,
    pub packets_read: u64,
    pub readings_emitted: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Session counters shared between the poll loop and the caller.
pub type SharedSessionStats = Arc<SessionStats>;

pub fn create_shared_stats() -> SharedSessionStats {
    Arc::new(SessionStats::new())
}
