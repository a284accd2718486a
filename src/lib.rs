//! ThinkGear Reader - eSense values from a NeuroSky headset.
//!
//! The headset protocol lives entirely inside the vendor's closed-source
//! ThinkGear driver. This crate loads that driver at runtime, binds its
//! seven C entry points behind the [`driver::Driver`] trait, and polls one
//! connection for readings.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ NativeDriver  │──▶│  Connection   │──▶│    Poller     │──▶ stdout
//! │ (libloading)  │   │ (RAII handle) │   │ (interval)    │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!                                                 ▲
//!                               Ctrl+C ──▶ Shutdown token
//! ```
//!
//! # Example
//!
//! ```no_run
//! use thinkgear_reader::{
//!     create_shared_stats, Connection, ConnectSettings, DataType, NativeDriver, Poller, Shutdown,
//! };
//! use std::time::Duration;
//!
//! let driver = NativeDriver::load("ThinkGear.bundle").expect("driver bundle");
//! let connection = Connection::open(&driver, &ConnectSettings::new("/dev/tty.MindWave"))
//!     .expect("connect");
//!
//! let shutdown = Shutdown::new();
//! let poller = Poller::new(
//!     &connection,
//!     DataType::DEFAULT_CHANNELS.to_vec(),
//!     Duration::from_millis(500),
//!     create_shared_stats(),
//! );
//! poller.run(&shutdown, &mut std::io::stdout()).expect("poll");
//! ```

pub mod config;
pub mod driver;
pub mod poll;
pub mod reader;
pub mod session;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use driver::{
    BaudRate, ConnectionId, DataType, Driver, DriverError, NativeDriver, StreamFormat,
};
pub use poll::{PollError, Poller, Reading, Shutdown};
pub use reader::{run_session, ReaderError};
pub use session::{ConnectSettings, Connection, ConnectionState, SessionError};
pub use stats::{create_shared_stats, SessionStats, SharedSessionStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
