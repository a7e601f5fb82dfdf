// Read-only FAT16 driver over raw disk images

pub mod device_reader;
pub mod fat_common;
pub mod fat16;

// Image fixtures shared by unit and integration tests
#[doc(hidden)]
pub mod test_helpers;

pub use device_reader::{BlockDevice, BlockSource, SECTOR_SIZE};
pub use fat16::{
    ClusterChain, ClusterLink, DirectoryEntryView, DirectoryHandle, Fat16PathResolver, FileHandle, PathTarget,
    Volume, VolumeInfo,
};
pub use fat_common::{DirectoryEntry, FatAttributes};

pub use fatlens_core::{FatError, FatResult, VolumeOptions};
