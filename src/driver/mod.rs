//! Bindings to the ThinkGear driver bundle.
//!
//! [`Driver`] describes the seven entry points the vendor library exports.
//! [`NativeDriver`] binds them from a bundle on disk; the session and poll
//! layers only ever see the trait.

pub mod native;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use std::ffi::CStr;
use std::os::raw::c_int;
use std::path::PathBuf;
use thiserror::Error;

pub use native::NativeDriver;
pub use types::{BaudRate, ConnectionId, DataType, StreamFormat};

/// Entry points every driver bundle must export, in binding order.
pub const REQUIRED_SYMBOLS: [&str; 7] = [
    "TG_GetDriverVersion",
    "TG_GetNewConnectionId",
    "TG_Connect",
    "TG_ReadPackets",
    "TG_GetValue",
    "TG_Disconnect",
    "TG_FreeConnection",
];

/// `count` argument to [`Driver::read_packets`] meaning "everything buffered".
pub const READ_ALL_PACKETS: c_int = -1;

/// The ThinkGear driver interface.
///
/// Return codes are passed through untouched; interpreting them is the
/// caller's job (see [`crate::session::Connection`]).
pub trait Driver {
    /// `TG_GetDriverVersion`
    fn driver_version(&self) -> c_int;

    /// `TG_GetNewConnectionId`. Negative ids are errors.
    fn new_connection_id(&self) -> ConnectionId;

    /// `TG_Connect`. Zero means connected.
    fn connect(
        &self,
        id: ConnectionId,
        port: &CStr,
        baud: BaudRate,
        format: StreamFormat,
    ) -> c_int;

    /// `TG_ReadPackets`. Returns the number of packets read.
    fn read_packets(&self, id: ConnectionId, count: c_int) -> c_int;

    /// `TG_GetValue`
    fn get_value(&self, id: ConnectionId, data_type: DataType) -> f32;

    /// `TG_Disconnect`
    fn disconnect(&self, id: ConnectionId) -> c_int;

    /// `TG_FreeConnection`
    fn free_connection(&self, id: ConnectionId);
}

/// Errors raised while loading a driver bundle.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Could not find {}. Does it exist in the current directory?", path.display())]
    BundleNotFound { path: PathBuf },

    #[error("Could not load {}: {source}", path.display())]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error(
        "Expected functions in {} were not found ({}). Are you using the right version?",
        path.display(),
        missing.join(", ")
    )]
    IncompatibleVersion {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    #[error("Could not bind {name} from {}: {source}", path.display())]
    Symbol {
        path: PathBuf,
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
}

/// Names from [`REQUIRED_SYMBOLS`] that `is_exported` reports as absent.
pub fn missing_symbols(mut is_exported: impl FnMut(&str) -> bool) -> Vec<&'static str> {
    REQUIRED_SYMBOLS
        .into_iter()
        .filter(|name| !is_exported(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_symbols_all_present() {
        assert!(missing_symbols(|_| true).is_empty());
    }

    #[test]
    fn test_missing_symbols_reports_each_absent_name() {
        let missing = missing_symbols(|name| name != "TG_Connect" && name != "TG_FreeConnection");
        assert_eq!(missing, vec!["TG_Connect", "TG_FreeConnection"]);

        assert_eq!(missing_symbols(|_| false).len(), REQUIRED_SYMBOLS.len());
    }

    #[test]
    fn test_incompatible_version_message() {
        let err = DriverError::IncompatibleVersion {
            path: PathBuf::from("ThinkGear.bundle"),
            missing: vec!["TG_GetValue"],
        };
        let message = err.to_string();
        assert!(message.contains("TG_GetValue"));
        assert!(message.contains("right version"));
    }
}
