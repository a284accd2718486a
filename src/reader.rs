//! One reading session from connect to release.
//!
//! Readings go to `out`; connection status, the disconnect notice and the
//! session summary go to `status`. The binary passes stdout and stderr.

use crate::config::Config;
use crate::driver::Driver;
use crate::poll::{PollError, Poller, Shutdown};
use crate::session::{Connection, SessionError};
use crate::stats::{create_shared_stats, StatsSnapshot};
use std::io::{self, Write};
use thiserror::Error;

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Could not write status: {0}")]
    Status(#[from] io::Error),
}

impl ReaderError {
    /// Whether the message was already written to the status stream.
    pub fn is_reported(&self) -> bool {
        matches!(self, ReaderError::Session(SessionError::ConnectFailed(_)))
    }
}

/// Connect on `port`, poll until `shutdown` fires, then release the
/// connection. The driver itself is left to the caller.
///
/// Shutdown is honoured before connecting, right after the connect call
/// returns, and between polls. Whichever applies, the connection is
/// disconnected and freed at most once before this returns.
pub fn run_session<D, W, E>(
    driver: &D,
    port: &str,
    config: &Config,
    shutdown: &Shutdown,
    out: &mut W,
    status: &mut E,
) -> Result<StatsSnapshot, ReaderError>
where
    D: Driver + ?Sized,
    W: Write,
    E: Write,
{
    let stats = create_shared_stats();

    if shutdown.is_triggered() {
        writeln!(status, "\nDisconnecting...")?;
        return Ok(stats.snapshot());
    }

    write!(status, "Connecting to {port} ... ")?;
    status.flush()?;
    let mut connection = match Connection::open(driver, &config.connect_settings(port)) {
        Ok(connection) => {
            writeln!(status, "connected.")?;
            connection
        }
        Err(e @ SessionError::ConnectFailed(_)) => {
            writeln!(status, "{e}")?;
            return Err(e.into());
        }
        Err(e) => {
            writeln!(status, "failed.")?;
            return Err(e.into());
        }
    };

    let result = if shutdown.is_triggered() {
        Ok(())
    } else {
        Poller::new(
            &connection,
            config.channels.clone(),
            config.poll_interval,
            stats.clone(),
        )
        .run(shutdown, out)
    };

    writeln!(status, "\nDisconnecting...")?;
    connection.close();

    writeln!(status, "{}", stats.summary())?;
    result?;
    Ok(stats.snapshot())
}
