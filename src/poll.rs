//! Poll loop and cooperative shutdown.
//!
//! The loop sleeps for the poll interval, asks the driver for buffered
//! packets, and when any arrived reads every tracked channel and rewrites
//! the output line. It ends only when its [`Shutdown`] token is triggered.

use crate::driver::{DataType, Driver};
use crate::session::{Connection, SessionError};
use crate::stats::SharedSessionStats;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Cancellation token shared between the interrupt handler and the loop.
///
/// Triggering also wakes a pending [`Shutdown::wait`], so the loop does not
/// sit out the rest of its interval.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

struct ShutdownInner {
    triggered: AtomicBool,
    requests: AtomicUsize,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            inner: Arc::new(ShutdownInner {
                triggered: AtomicBool::new(false),
                requests: AtomicUsize::new(0),
                wake_tx,
                wake_rx,
            }),
        }
    }

    /// Request shutdown. Returns how many requests have been made so far,
    /// this one included.
    pub fn trigger(&self) -> usize {
        let requests = self.inner.requests.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.triggered.store(true, Ordering::SeqCst);
        // A full channel already holds a wake-up.
        let _ = self.inner.wake_tx.try_send(());
        requests
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`. Returns `true` if shutdown was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.inner.wake_rx.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.is_triggered()
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Channel values read during one poll cycle, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub values: Vec<(DataType, f32)>,
}

impl Reading {
    pub fn get(&self, data_type: DataType) -> Option<f32> {
        self.values
            .iter()
            .find(|(d, _)| *d == data_type)
            .map(|(_, v)| *v)
    }
}

impl fmt::Display for Reading {
    /// `PoorSig:  26, Att:  54, Med:  61`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (data_type, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {:3.0}", data_type.label(), value)?;
        }
        Ok(())
    }
}

/// Errors that stop the poll loop early.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Could not write reading: {0}")]
    Output(#[from] io::Error),
}

/// Polls one open connection.
pub struct Poller<'c, 'd, D: Driver + ?Sized> {
    connection: &'c Connection<'d, D>,
    channels: Vec<DataType>,
    interval: Duration,
    stats: SharedSessionStats,
}

impl<'c, 'd, D: Driver + ?Sized> Poller<'c, 'd, D> {
    pub fn new(
        connection: &'c Connection<'d, D>,
        channels: Vec<DataType>,
        interval: Duration,
        stats: SharedSessionStats,
    ) -> Self {
        Self {
            connection,
            channels,
            interval,
            stats,
        }
    }

    /// One cycle without the sleep: read packets, and if any arrived,
    /// read every channel.
    pub fn poll_once(&self) -> Result<Option<Reading>, SessionError> {
        let packets = self.connection.read_packets()?;
        self.stats.record_poll(packets);

        if packets < 0 {
            tracing::debug!(status = packets, "read_packets returned an error code");
        }
        if packets <= 0 {
            return Ok(None);
        }

        let values = self
            .channels
            .iter()
            .map(|&channel| Ok((channel, self.connection.value(channel)?)))
            .collect::<Result<Vec<_>, SessionError>>()?;

        Ok(Some(Reading { values }))
    }

    /// Run until `shutdown` fires, rewriting one line of `out` per reading.
    pub fn run<W: Write>(&self, shutdown: &Shutdown, out: &mut W) -> Result<(), PollError> {
        tracing::debug!(
            interval_ms = self.interval.as_millis() as u64,
            channels = self.channels.len(),
            "poll loop started"
        );

        while !shutdown.wait(self.interval) {
            if let Some(reading) = self.poll_once()? {
                write!(out, "\r{reading}")?;
                out.flush()?;
                self.stats.record_reading();
            }
        }

        tracing::debug!("poll loop stopped");
        Ok(())
    }
}
