// crates/ethercat-esi/src/store.rs

//! Persistence and transport collaborators around the compiler.

use crate::error::EsiError;
use crate::parser::{load_setup_from_str, save_setup_to_string};
use crate::types::Setup;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads and saves the editable setup.
pub trait SetupStore {
    fn load(&self) -> Result<Setup, EsiError>;
    fn save(&self, setup: &Setup) -> Result<(), EsiError>;
}

/// Hands a compiled document to its destination.
///
/// A failed publish leaves the document with the caller, who may retry.
pub trait Publisher {
    fn publish(&self, device_name: &str, document: &[u8]) -> Result<(), EsiError>;
}

/// Stores the setup as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SetupStore for JsonFileStore {
    fn load(&self) -> Result<Setup, EsiError> {
        let json = fs::read_to_string(&self.path)?;
        let setup = load_setup_from_str(&json)?;
        info!(
            "Loaded setup with {} device(s) from {}",
            setup.devices.len(),
            self.path.display()
        );
        Ok(setup)
    }

    fn save(&self, setup: &Setup) -> Result<(), EsiError> {
        fs::write(&self.path, save_setup_to_string(setup)?)?;
        info!("Saved setup to {}", self.path.display());
        Ok(())
    }
}

/// Writes each document to `<dir>/<device name>.xml`.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target path of `device_name`'s document.
    pub fn target(&self, device_name: &str) -> PathBuf {
        self.dir.join(format!("{}.xml", device_name))
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(&self, device_name: &str, document: &[u8]) -> Result<(), EsiError> {
        let target = self.target(device_name);
        fs::write(&target, document)?;
        info!("Published {} bytes to {}", document.len(), target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Device, Group};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ethercat-esi-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = scratch_dir("store");
        let store = JsonFileStore::new(dir.join("setup.json"));

        let mut setup = Setup::default();
        setup.vendor.id = 0x1337;
        setup.groups.push(Group {
            group_type: "Drives".into(),
            name: "Servo drives".into(),
        });
        let mut servo = Device::new("Servo");
        servo.group_type = "Drives".into();
        setup.devices.push(servo);
        store.save(&setup).unwrap();
        assert_eq!(store.load().unwrap(), setup);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let store = JsonFileStore::new(scratch_dir("missing").join("nope.json"));
        assert!(matches!(store.load(), Err(EsiError::Io(_))));
    }

    #[test]
    fn test_directory_publisher() {
        let dir = scratch_dir("publish");
        let publisher = DirectoryPublisher::new(&dir);
        publisher.publish("Servo", b"<EtherCATInfo/>").unwrap();
        assert_eq!(fs::read(dir.join("Servo.xml")).unwrap(), b"<EtherCATInfo/>");

        let broken = DirectoryPublisher::new(dir.join("does-not-exist"));
        assert!(matches!(broken.publish("Servo", b"x"), Err(EsiError::Io(_))));

        fs::remove_dir_all(dir).unwrap();
    }
}
