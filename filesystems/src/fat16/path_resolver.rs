// FAT16 Path Resolver
// Walks backslash-separated paths from the root directory down through
// subdirectory cluster chains.

use crate::device_reader::alloc_buffer;
use crate::fat16::cluster_chain::ClusterChain;
use crate::fat16::volume::Volume;
use crate::fat_common::{fold_component, DirectoryEntry, DirectorySlots};
use fatlens_core::{FatError, FatResult};
use log::{debug, trace};

pub const PATH_SEPARATOR: char = '\\';

/// Where a path ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTarget {
    /// The fixed root directory, which has no entry of its own
    Root,
    Entry(DirectoryEntry),
}

/// Directory currently being searched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Root,
    Directory(u16),
    File,
}

/// Non-empty components of `path`, upper-cased for comparison with stored
/// short names. Leading, trailing and doubled separators are ignored.
pub fn split_components(path: &str) -> Vec<String> {
    path.split(PATH_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(fold_component)
        .collect()
}

pub struct Fat16PathResolver<'v> {
    volume: &'v Volume<'v>,
}

impl<'v> Fat16PathResolver<'v> {
    pub fn new(volume: &'v Volume<'v>) -> Self {
        Self { volume }
    }

    /// Resolve a path to the entry it names. The root itself has no entry
    /// and resolves to `NotFound`.
    pub fn resolve(&self, path: &str) -> FatResult<DirectoryEntry> {
        match self.resolve_target(path)? {
            PathTarget::Entry(entry) => Ok(entry),
            PathTarget::Root => Err(FatError::NotFound(format!("{} names the root directory", path))),
        }
    }

    /// Resolve a path to either the root or a directory entry
    pub fn resolve_target(&self, path: &str) -> FatResult<PathTarget> {
        debug!("Resolving FAT16 path: {}", path);

        let mut context = Context::Root;
        let mut target = PathTarget::Root;

        for component in split_components(path) {
            trace!("Resolving component {} in {:?}", component, context);

            let found = match context {
                Context::Root => self.find_in_root(&component),
                Context::Directory(cluster) => self.find_in_subdirectory(cluster, &component)?,
                // A file cannot have children
                Context::File => None,
            };

            let entry = found.ok_or_else(|| {
                FatError::NotFound(format!("path component '{}' of {}", component, path))
            })?;

            if entry.is_directory() {
                if entry.first_cluster == 0 {
                    // ".." of a first-level directory points back at the root
                    context = Context::Root;
                    target = PathTarget::Root;
                } else {
                    context = Context::Directory(entry.first_cluster);
                    target = PathTarget::Entry(entry);
                }
            } else {
                context = Context::File;
                target = PathTarget::Entry(entry);
            }
        }

        Ok(target)
    }

    /// First root entry whose short name equals `name`
    pub fn find_in_root(&self, name: &str) -> Option<DirectoryEntry> {
        self.volume
            .root_entries()
            .iter()
            .find(|entry| entry.short_name() == name)
            .copied()
    }

    /// Scan a subdirectory cluster by cluster for `name`, stopping at the
    /// end-of-directory marker.
    pub fn find_in_subdirectory(&self, first_cluster: u16, name: &str) -> FatResult<Option<DirectoryEntry>> {
        let chain = ClusterChain::resolve(self.volume, first_cluster)?;
        let mut buffer = alloc_buffer(self.volume.bytes_per_cluster() as usize)?;

        for link in chain.links() {
            self.volume.read_cluster(link, &mut buffer)?;

            let mut slots = DirectorySlots::new(&buffer);
            if let Some(entry) = slots.by_ref().find(|entry| entry.short_name() == name) {
                return Ok(Some(entry));
            }
            if slots.reached_end() {
                break;
            }
        }

        Ok(None)
    }
}
