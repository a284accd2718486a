//! Connection lifecycle for one headset session.
//!
//! ```text
//! Uninitialized ──▶ Connecting ──▶ Connected ──▶ Disconnected
//!                        │                            ▲
//!                        └──── connect failed ────────┘
//! ```
//!
//! A [`Connection`] owns its handle: it is disconnected and freed exactly
//! once, either through [`Connection::close`] or when the value is dropped.

use crate::driver::{BaudRate, ConnectionId, DataType, Driver, StreamFormat, READ_ALL_PACKETS};
use std::ffi::CString;
use std::fmt;
use std::os::raw::c_int;
use thiserror::Error;

/// Where a [`Connection`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No handle requested yet
    Uninitialized,
    /// Handle issued, connect not yet successful
    Connecting,
    /// Connected and readable
    Connected,
    /// Handle released; terminal
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Uninitialized => "uninitialized",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Parameters passed to `TG_Connect`.
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    /// Serial port or device name, e.g. `/dev/tty.MindWaveMobile-DevA`
    pub port: String,
    pub baud: BaudRate,
    pub stream_format: StreamFormat,
}

impl ConnectSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud: BaudRate::default(),
            stream_format: StreamFormat::default(),
        }
    }
}

/// Errors from the connection lifecycle.
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Invalid port name {0:?}: contains a NUL byte")]
    InvalidPort(String),

    #[error("Driver did not issue a connection id ({0})")]
    NoConnectionId(c_int),

    #[error("unable to connect. ({0})")]
    ConnectFailed(c_int),

    #[error("Connection is {0}, not connected")]
    NotConnected(ConnectionState),

    #[error("Connection is already {0}")]
    AlreadyOpened(ConnectionState),
}

/// One device session on a driver.
pub struct Connection<'d, D: Driver + ?Sized> {
    driver: &'d D,
    id: ConnectionId,
    state: ConnectionState,
}

impl<'d, D: Driver + ?Sized> Connection<'d, D> {
    /// A connection that has not asked the driver for anything yet.
    pub fn new(driver: &'d D) -> Self {
        Self {
            driver,
            id: ConnectionId::SENTINEL,
            state: ConnectionState::Uninitialized,
        }
    }

    /// Request a handle and connect it in one step.
    pub fn open(driver: &'d D, settings: &ConnectSettings) -> Result<Self, SessionError> {
        let mut connection = Self::new(driver);
        connection.connect(settings)?;
        Ok(connection)
    }

    /// Drive `Uninitialized → Connecting → Connected`.
    ///
    /// On a non-zero connect status the issued handle is freed before the
    /// error is returned, leaving the connection `Disconnected`.
    pub fn connect(&mut self, settings: &ConnectSettings) -> Result<(), SessionError> {
        if self.state != ConnectionState::Uninitialized {
            return Err(SessionError::AlreadyOpened(self.state));
        }

        let port = CString::new(settings.port.as_str())
            .map_err(|_| SessionError::InvalidPort(settings.port.clone()))?;

        let id = self.driver.new_connection_id();
        if !id.is_valid() {
            return Err(SessionError::NoConnectionId(id.raw()));
        }
        self.id = id;
        self.state = ConnectionState::Connecting;
        tracing::debug!(%id, port = %settings.port, "connection id issued");

        let status = self
            .driver
            .connect(id, &port, settings.baud, settings.stream_format);
        if status != 0 {
            tracing::debug!(%id, status, "connect failed");
            self.release();
            return Err(SessionError::ConnectFailed(status));
        }

        self.state = ConnectionState::Connected;
        tracing::info!(
            %id,
            port = %settings.port,
            baud = %settings.baud,
            format = ?settings.stream_format,
            "connected"
        );
        Ok(())
    }

    /// Read every packet the driver has buffered. Returns how many arrived.
    pub fn read_packets(&self) -> Result<c_int, SessionError> {
        self.expect_connected()?;
        Ok(self.driver.read_packets(self.id, READ_ALL_PACKETS))
    }

    /// Latest value of one channel.
    pub fn value(&self, data_type: DataType) -> Result<f32, SessionError> {
        self.expect_connected()?;
        Ok(self.driver.get_value(self.id, data_type))
    }

    /// Disconnect and free the handle. Safe to call more than once.
    pub fn close(&mut self) {
        self.release();
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn expect_connected(&self) -> Result<(), SessionError> {
        if self.state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(SessionError::NotConnected(self.state))
        }
    }

    fn release(&mut self) {
        match self.state {
            ConnectionState::Connected => {
                let status = self.driver.disconnect(self.id);
                if status != 0 {
                    tracing::warn!(id = %self.id, status, "disconnect returned an error");
                }
                self.driver.free_connection(self.id);
                tracing::debug!(id = %self.id, "connection released");
            }
            ConnectionState::Connecting => {
                self.driver.free_connection(self.id);
                tracing::debug!(id = %self.id, "connection id freed");
            }
            ConnectionState::Uninitialized | ConnectionState::Disconnected => {}
        }
        self.id = ConnectionId::SENTINEL;
        self.state = ConnectionState::Disconnected;
    }
}

impl<D: Driver + ?Sized> Drop for Connection<'_, D> {
    fn drop(&mut self) {
        self.release();
    }
}
