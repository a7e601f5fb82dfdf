// Sector-addressed block device over a raw image
// Every read is absolute: callers never rely on the source's stream position

use fatlens_core::{FatError, FatResult};
use log::{debug, trace};
use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

pub const SECTOR_SIZE: usize = 512;

/// Zeroed buffer of `len` bytes; allocation failure is reported, not fatal
pub fn alloc_buffer(len: usize) -> FatResult<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Anything a block device can be backed by
pub trait BlockSource: Read + Seek {}

impl<T: Read + Seek> BlockSource for T {}

/// Read-only, sector-granular view of a backing image.
///
/// The source sits behind a `RefCell` so that a volume and every handle
/// opened on it can issue reads through a shared reference. The device is
/// single-threaded: it is neither `Send` nor `Sync`.
pub struct BlockDevice {
    source: RefCell<Box<dyn BlockSource>>,
    len: u64,
    sectors: u64,
}

impl BlockDevice {
    /// Open an image file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> FatResult<Self> {
        let path = path.as_ref();
        debug!("Opening block device: {}", path.display());

        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FatError::NotFound(format!("image {}", path.display())),
            _ => FatError::IoError(e),
        })?;

        Self::from_source(file)
    }

    /// Wrap an arbitrary seekable source, e.g. an in-memory image
    pub fn from_source<S: BlockSource + 'static>(mut source: S) -> FatResult<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;
        let sectors = len / SECTOR_SIZE as u64;

        debug!("Block device: {} bytes, {} sectors", len, sectors);

        Ok(Self {
            source: RefCell::new(Box::new(source)),
            len,
            sectors,
        })
    }

    /// Read `sector_count` sectors starting at `first_sector` into `buffer`.
    ///
    /// Returns the number of sectors read, which is always `sector_count`.
    pub fn read(&self, first_sector: u64, buffer: &mut [u8], sector_count: usize) -> FatResult<usize> {
        let byte_count = sector_count
            .checked_mul(SECTOR_SIZE)
            .ok_or_else(|| FatError::OutOfRange(format!("{} sectors", sector_count)))?;

        if buffer.len() < byte_count {
            return Err(FatError::InvalidArgument(format!(
                "buffer of {} bytes cannot hold {} sectors",
                buffer.len(),
                sector_count
            )));
        }

        let end = first_sector
            .checked_add(sector_count as u64)
            .filter(|&end| end <= self.sectors)
            .ok_or_else(|| {
                FatError::OutOfRange(format!(
                    "sectors {}..+{} exceed device of {} sectors",
                    first_sector, sector_count, self.sectors
                ))
            })?;

        trace!("Reading sectors {}..{}", first_sector, end);

        let mut source = self.source.borrow_mut();
        source.seek(SeekFrom::Start(first_sector * SECTOR_SIZE as u64))?;
        source.read_exact(&mut buffer[..byte_count])?;

        Ok(sector_count)
    }

    /// Release the backing source
    pub fn close(self) -> FatResult<()> {
        debug!("Closing block device ({} sectors)", self.sectors);
        Ok(())
    }

    /// Total length of the backing image in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of whole sectors; a trailing partial sector is not addressable
    pub fn sector_count(&self) -> u64 {
        self.sectors
    }
}

impl fmt::Debug for BlockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockDevice")
            .field("len", &self.len)
            .field("sectors", &self.sectors)
            .finish()
    }
}
