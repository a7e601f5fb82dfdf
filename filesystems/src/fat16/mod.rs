// FAT16 module - volume, path resolution, file and directory streams

pub mod volume;
pub mod cluster_chain;
pub mod path_resolver;
pub mod file;
pub mod directory;

#[cfg(test)]
mod tests;

pub use volume::{Volume, VolumeInfo};
pub use cluster_chain::{ClusterChain, ClusterLink};
pub use path_resolver::{Fat16PathResolver, PathTarget, PATH_SEPARATOR};
pub use file::FileHandle;
pub use directory::{DirectoryEntryView, DirectoryHandle};
