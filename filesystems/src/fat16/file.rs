// FAT16 file stream
// Buffered, cluster-at-a-time reads over a chain resolved at open time

use crate::device_reader::alloc_buffer;
use crate::fat16::cluster_chain::ClusterChain;
use crate::fat16::path_resolver::{Fat16PathResolver, PathTarget};
use crate::fat16::volume::Volume;
use crate::fat_common::FatAttributes;
use fatlens_core::{FatError, FatResult};
use log::{debug, warn};
use std::io::{self, Read, Seek, SeekFrom};

/// An open file. Holds its own cluster chain and cursor; borrows the volume
/// for geometry and device access.
pub struct FileHandle<'v> {
    volume: &'v Volume<'v>,
    name: String,
    attributes: FatAttributes,
    size: u32,
    position: u64,
    chain: ClusterChain,
    // Last cluster read from the device and its index in the chain
    scratch: Vec<u8>,
    loaded: Option<usize>,
}

impl<'v> FileHandle<'v> {
    pub fn open(volume: &'v Volume<'v>, path: &str) -> FatResult<Self> {
        let entry = match Fat16PathResolver::new(volume).resolve_target(path)? {
            PathTarget::Root => {
                return Err(FatError::IsADirectory(format!("{} is the root directory", path)));
            }
            PathTarget::Entry(entry) => entry,
        };

        if entry.is_directory() || entry.is_volume_label() {
            return Err(FatError::IsADirectory(path.to_string()));
        }

        let chain = ClusterChain::resolve(volume, entry.first_cluster)?;
        let name = entry.short_name();

        let capacity = chain.len() as u64 * volume.bytes_per_cluster() as u64;
        if entry.first_cluster >= 2 && entry.size as u64 > capacity {
            warn!(
                "{}: declared size {} exceeds {} bytes of allocated clusters",
                name, entry.size, capacity
            );
        }

        let scratch = alloc_buffer(volume.bytes_per_cluster() as usize)?;
        debug!("Opened file {} ({} bytes, {} clusters)", name, entry.size, chain.len());

        Ok(Self {
            volume,
            name,
            attributes: entry.attributes,
            size: entry.size,
            position: 0,
            chain,
            scratch,
            loaded: None,
        })
    }

    /// Copy up to `buf.len()` bytes from the cursor, never past the declared
    /// size. Returns 0 at end of file.
    ///
    /// Clusters are read whole into a scratch buffer owned by the handle, so
    /// memory use is one cluster regardless of the request size, and small
    /// consecutive reads within a cluster touch the device once. If a device
    /// read fails after some bytes were copied, the partial count is returned
    /// and the error surfaces on the next call.
    pub fn read(&mut self, buf: &mut [u8]) -> FatResult<usize> {
        let size = self.size as u64;
        if self.position >= size || buf.is_empty() {
            return Ok(0);
        }

        let bytes_per_cluster = self.volume.bytes_per_cluster() as u64;
        let mut copied = 0usize;

        while copied < buf.len() && self.position < size {
            let index = (self.position / bytes_per_cluster) as usize;
            let link = match self.chain.get(index) {
                Some(link) => *link,
                None => {
                    warn!("{}: cluster chain ends before byte {}", self.name, self.position);
                    break;
                }
            };

            if self.loaded != Some(index) {
                self.loaded = None;
                if let Err(e) = self.volume.read_cluster(&link, &mut self.scratch) {
                    if copied == 0 {
                        return Err(e);
                    }
                    break;
                }
                self.loaded = Some(index);
            }

            let offset = (self.position % bytes_per_cluster) as usize;
            let in_cluster = bytes_per_cluster as usize - offset;
            let in_file = (size - self.position) as usize;
            let count = in_cluster.min(in_file).min(buf.len() - copied);

            buf[copied..copied + count].copy_from_slice(&self.scratch[offset..offset + count]);
            copied += count;
            self.position += count as u64;
        }

        Ok(copied)
    }

    /// Move the cursor. The target must lie within `0..=size`; otherwise
    /// `OutOfRange` is returned and the cursor is left where it was.
    pub fn seek(&mut self, pos: SeekFrom) -> FatResult<u64> {
        let size = self.size as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.position as i128 + delta as i128,
            SeekFrom::End(delta) => size + delta as i128,
        };

        if target < 0 || target > size {
            return Err(FatError::OutOfRange(format!(
                "seek to {} outside 0..={} in {}",
                target, size, self.name
            )));
        }

        self.position = target as u64;
        Ok(self.position)
    }

    /// Release the cluster chain
    pub fn close(self) {
        debug!("Closed file {}", self.name);
    }

    /// Cleaned 8.3 name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn attributes(&self) -> FatAttributes {
        self.attributes
    }

    pub fn cluster_chain(&self) -> &ClusterChain {
        &self.chain
    }
}

impl Read for FileHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        FileHandle::read(self, buf).map_err(io::Error::from)
    }
}

impl Seek for FileHandle<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        FileHandle::seek(self, pos).map_err(io::Error::from)
    }
}
