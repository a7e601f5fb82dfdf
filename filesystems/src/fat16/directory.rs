// FAT16 directory stream
// Snapshots a directory's live entries at open time and hands them out in
// on-disk order.

use crate::device_reader::alloc_buffer;
use crate::fat16::cluster_chain::ClusterChain;
use crate::fat16::path_resolver::{Fat16PathResolver, PathTarget};
use crate::fat16::volume::Volume;
use crate::fat_common::{DirectoryEntry, DirectorySlots};
use chrono::{NaiveDate, NaiveDateTime};
use fatlens_core::{FatError, FatResult};
use log::debug;
use serde::Serialize;

/// Caller-facing view of one directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntryView {
    pub name: String,
    pub size: u32,
    pub is_archived: bool,
    pub is_readonly: bool,
    pub is_system: bool,
    pub is_hidden: bool,
    /// Derived from a zero size, so empty regular files also report true
    pub is_directory: bool,
    pub first_cluster: u16,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDate>,
}

impl From<&DirectoryEntry> for DirectoryEntryView {
    fn from(entry: &DirectoryEntry) -> Self {
        let attrs = entry.attributes;
        Self {
            name: entry.short_name(),
            size: entry.size,
            is_archived: attrs.is_archive(),
            is_readonly: attrs.is_read_only(),
            is_system: attrs.is_system(),
            is_hidden: attrs.is_hidden(),
            is_directory: entry.size == 0,
            first_cluster: entry.first_cluster,
            created: entry.created(),
            modified: entry.modified(),
            accessed: entry.accessed(),
        }
    }
}

/// Entry storage: the root list is shared with the volume, subdirectories
/// are collected into a list the handle owns.
enum DirectoryEntries<'v> {
    Root(&'v [DirectoryEntry]),
    Owned(Vec<DirectoryEntry>),
}

impl DirectoryEntries<'_> {
    fn as_slice(&self) -> &[DirectoryEntry] {
        match self {
            DirectoryEntries::Root(entries) => *entries,
            DirectoryEntries::Owned(entries) => entries.as_slice(),
        }
    }
}

/// An open directory with a cursor over its entries
pub struct DirectoryHandle<'v> {
    entries: DirectoryEntries<'v>,
    position: usize,
}

impl<'v> DirectoryHandle<'v> {
    /// Open the directory named by `path`. The root (`\`, or a path that
    /// walks back to it through `..`) shares the volume's root entry list.
    pub fn open(volume: &'v Volume<'v>, path: &str) -> FatResult<Self> {
        let entry = match Fat16PathResolver::new(volume).resolve_target(path)? {
            PathTarget::Root => {
                debug!("Opened root directory ({} entries)", volume.root_entries().len());
                return Ok(Self {
                    entries: DirectoryEntries::Root(volume.root_entries()),
                    position: 0,
                });
            }
            PathTarget::Entry(entry) => entry,
        };

        if !entry.is_directory() || entry.is_volume_label() {
            return Err(FatError::NotADirectory(path.to_string()));
        }

        let entries = Self::collect(volume, entry.first_cluster)?;
        debug!("Opened directory {} ({} entries)", entry.short_name(), entries.len());

        Ok(Self {
            entries: DirectoryEntries::Owned(entries),
            position: 0,
        })
    }

    /// Gather live entries across the directory's cluster chain, stopping at
    /// the end-of-directory marker.
    fn collect(volume: &Volume<'_>, first_cluster: u16) -> FatResult<Vec<DirectoryEntry>> {
        let chain = ClusterChain::resolve(volume, first_cluster)?;
        let mut buffer = alloc_buffer(volume.bytes_per_cluster() as usize)?;
        let mut entries = Vec::new();

        for link in chain.links() {
            volume.read_cluster(link, &mut buffer)?;

            let mut slots = DirectorySlots::new(&buffer);
            for entry in slots.by_ref() {
                entries.try_reserve(1)?;
                entries.push(entry);
            }
            if slots.reached_end() {
                break;
            }
        }

        Ok(entries)
    }

    /// Next entry in on-disk order, or `None` once every entry was returned
    pub fn read(&mut self) -> Option<DirectoryEntryView> {
        let entry = self.entries.as_slice().get(self.position)?;
        self.position += 1;
        Some(DirectoryEntryView::from(entry))
    }

    /// Start over from the first entry
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn close(self) {
        debug!("Closed directory ({} entries)", self.len());
    }

    /// Whether this handle shares the volume's root entry list
    pub fn is_root(&self) -> bool {
        matches!(self.entries, DirectoryEntries::Root(_))
    }

    pub fn len(&self) -> usize {
        self.entries.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw entries backing this handle
    pub fn entries(&self) -> &[DirectoryEntry] {
        self.entries.as_slice()
    }
}

impl Iterator for DirectoryHandle<'_> {
    type Item = DirectoryEntryView;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}
