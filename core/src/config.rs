// Volume configuration
// Read-time policy knobs for opening a FAT16 volume

use crate::error::{FatError, FatResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeOptions {
    /// Reject free, reserved and bad-cluster links (0x0000, 0x0001,
    /// 0xFFF0-0xFFF7) while following a chain instead of treating them as
    /// ordinary links.
    pub strict_chains: bool,

    /// Place the data region after the exact root-directory span,
    /// `ceil(root_entries * 32 / 512)`, rather than `root_entries / 16`.
    pub exact_root_dir_sectors: bool,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            strict_chains: false,
            exact_root_dir_sectors: false,
        }
    }
}

impl VolumeOptions {
    pub fn from_json_str(text: &str) -> FatResult<Self> {
        let options: VolumeOptions = serde_json::from_str(text)?;
        debug!("Loaded volume options: {:?}", options);
        Ok(options)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> FatResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FatError::Configuration(format!("options file {} does not exist", path.display()))
            } else {
                FatError::IoError(e)
            }
        })?;
        Self::from_json_str(&text)
    }
}
