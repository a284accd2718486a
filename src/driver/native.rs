//! Driver bound from the vendor bundle at runtime with `libloading`.
//!
//! On macOS the vendor ships `ThinkGear.bundle`, a directory whose loadable
//! binary sits under `Contents/MacOS/`. Elsewhere the driver is a plain
//! shared library.

use crate::driver::types::{BaudRate, ConnectionId, DataType, StreamFormat};
use crate::driver::{missing_symbols, Driver, DriverError};
use libloading::Library;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};

type GetDriverVersionFn = unsafe extern "C" fn() -> c_int;
type GetNewConnectionIdFn = unsafe extern "C" fn() -> c_int;
type ConnectFn = unsafe extern "C" fn(c_int, *const c_char, c_int, c_int) -> c_int;
type ReadPacketsFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type GetValueFn = unsafe extern "C" fn(c_int, c_int) -> f32;
type DisconnectFn = unsafe extern "C" fn(c_int) -> c_int;
type FreeConnectionFn = unsafe extern "C" fn(c_int);

/// A loaded driver bundle and its resolved entry points.
///
/// The function pointers are only valid while `_library` is loaded; keeping
/// both in one value ties their lifetimes together.
pub struct NativeDriver {
    path: PathBuf,
    get_driver_version: GetDriverVersionFn,
    get_new_connection_id: GetNewConnectionIdFn,
    connect: ConnectFn,
    read_packets: ReadPacketsFn,
    get_value: GetValueFn,
    disconnect: DisconnectFn,
    free_connection: FreeConnectionFn,
    _library: Library,
}

impl NativeDriver {
    /// Bundle location used when none is configured, relative to the
    /// working directory.
    pub fn default_bundle_path() -> PathBuf {
        if cfg!(target_os = "macos") {
            PathBuf::from("ThinkGear.bundle")
        } else {
            PathBuf::from(libloading::library_filename("thinkgear"))
        }
    }

    /// Map a bundle path to the file that actually gets loaded.
    ///
    /// `Foo.bundle/` resolves to `Foo.bundle/Contents/MacOS/Foo`; anything
    /// that is not a directory is returned unchanged.
    pub fn binary_path(bundle: &Path) -> PathBuf {
        if !bundle.is_dir() {
            return bundle.to_path_buf();
        }
        let name = bundle.file_stem().unwrap_or(bundle.as_os_str());
        bundle.join("Contents").join("MacOS").join(name)
    }

    /// Load the bundle and bind all seven entry points.
    ///
    /// Nothing is returned unless every symbol resolved.
    pub fn load(bundle: impl AsRef<Path>) -> Result<Self, DriverError> {
        let bundle = bundle.as_ref();
        if !bundle.exists() {
            return Err(DriverError::BundleNotFound {
                path: bundle.to_path_buf(),
            });
        }

        // dlopen only searches the working directory for paths with a
        // separator, so hand it an absolute one.
        let path = Self::binary_path(bundle);
        let path = match path.canonicalize() {
            Ok(path) => path,
            Err(_) => return Err(DriverError::BundleNotFound { path }),
        };

        tracing::debug!(path = %path.display(), "loading driver library");

        // SAFETY: loading runs the library's initialisers. The bundle is the
        // vendor driver the user pointed us at; there is no way to vet it.
        let library = unsafe { Library::new(&path) }.map_err(|source| DriverError::LoadFailed {
            path: path.clone(),
            source,
        })?;

        let missing = missing_symbols(|name| {
            // SAFETY: only probing for presence, the pointer is never used.
            unsafe { library.get::<*const ()>(name.as_bytes()) }.is_ok()
        });
        if !missing.is_empty() {
            return Err(DriverError::IncompatibleVersion { path, missing });
        }

        // SAFETY: the signatures below are the documented ThinkGear C API.
        let driver = unsafe {
            Self {
                get_driver_version: bind(&library, &path, "TG_GetDriverVersion")?,
                get_new_connection_id: bind(&library, &path, "TG_GetNewConnectionId")?,
                connect: bind(&library, &path, "TG_Connect")?,
                read_packets: bind(&library, &path, "TG_ReadPackets")?,
                get_value: bind(&library, &path, "TG_GetValue")?,
                disconnect: bind(&library, &path, "TG_Disconnect")?,
                free_connection: bind(&library, &path, "TG_FreeConnection")?,
                path,
                _library: library,
            }
        };

        tracing::info!(
            path = %driver.path.display(),
            version = driver.driver_version(),
            "ThinkGear driver loaded"
        );

        Ok(driver)
    }
}

/// Copy one function pointer out of `library`.
///
/// # Safety
///
/// `T` must match the exported symbol's real signature.
unsafe fn bind<T: Copy>(
    library: &Library,
    path: &Path,
    name: &'static str,
) -> Result<T, DriverError> {
    let symbol = library
        .get::<T>(name.as_bytes())
        .map_err(|source| DriverError::Symbol {
            path: path.to_path_buf(),
            name,
            source,
        })?;
    Ok(*symbol)
}

impl Driver for NativeDriver {
    fn driver_version(&self) -> c_int {
        unsafe { (self.get_driver_version)() }
    }

    fn new_connection_id(&self) -> ConnectionId {
        ConnectionId::new(unsafe { (self.get_new_connection_id)() })
    }

    fn connect(
        &self,
        id: ConnectionId,
        port: &CStr,
        baud: BaudRate,
        format: StreamFormat,
    ) -> c_int {
        unsafe { (self.connect)(id.raw(), port.as_ptr(), baud.as_raw(), format.as_raw()) }
    }

    fn read_packets(&self, id: ConnectionId, count: c_int) -> c_int {
        unsafe { (self.read_packets)(id.raw(), count) }
    }

    fn get_value(&self, id: ConnectionId, data_type: DataType) -> f32 {
        unsafe { (self.get_value)(id.raw(), data_type.as_raw()) }
    }

    fn disconnect(&self, id: ConnectionId) -> c_int {
        unsafe { (self.disconnect)(id.raw()) }
    }

    fn free_connection(&self, id: ConnectionId) {
        unsafe { (self.free_connection)(id.raw()) }
    }
}

impl Drop for NativeDriver {
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), "releasing driver library");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("thinkgear-reader-native-test")
            .join(format!("{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_bundle_is_not_found() {
        let path = scratch_dir("missing").join("NoSuch.bundle");
        match NativeDriver::load(&path) {
            Err(DriverError::BundleNotFound { path: reported }) => assert_eq!(reported, path),
            other => panic!("expected BundleNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_bundle_directory_resolves_inner_binary() {
        let bundle = scratch_dir("layout").join("ThinkGear.bundle");
        std::fs::create_dir_all(&bundle).unwrap();

        let binary = NativeDriver::binary_path(&bundle);
        assert_eq!(binary, bundle.join("Contents").join("MacOS").join("ThinkGear"));

        // Directory exists but the binary inside does not.
        match NativeDriver::load(&bundle) {
            Err(DriverError::BundleNotFound { path }) => assert_eq!(path, binary),
            other => panic!("expected BundleNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_plain_file_is_loaded_directly() {
        let file = scratch_dir("plain").join("libthinkgear.so");
        assert_eq!(NativeDriver::binary_path(&file), file);
    }

    #[test]
    fn test_non_library_file_fails_to_load() {
        let file = scratch_dir("garbage").join("libthinkgear.so");
        std::fs::write(&file, b"this is not a shared library").unwrap();

        match NativeDriver::load(&file) {
            Err(DriverError::LoadFailed { path, .. }) => {
                assert!(path.is_absolute());
                assert!(path.ends_with("libthinkgear.so"));
            }
            other => panic!("expected LoadFailed, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_default_bundle_path() {
        let path = NativeDriver::default_bundle_path();
        if cfg!(target_os = "macos") {
            assert_eq!(path, PathBuf::from("ThinkGear.bundle"));
        } else {
            assert!(path.to_string_lossy().contains("thinkgear"));
        }
    }
}
