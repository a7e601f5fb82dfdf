// FAT16 volume parser
// Loads the boot record, allocation table and root directory once, and
// derives the geometry every later cluster-to-sector translation uses.

use crate::device_reader::{alloc_buffer, BlockDevice, SECTOR_SIZE};
use crate::fat16::cluster_chain::ClusterLink;
use crate::fat16::directory::DirectoryHandle;
use crate::fat16::file::FileHandle;
use crate::fat16::path_resolver::Fat16PathResolver;
use crate::fat_common::{BootRecord, DirectoryEntry, DirectorySlots, FatTable, DIR_ENTRIES_PER_SECTOR, DIR_ENTRY_SIZE};
use fatlens_core::{FatResult, VolumeOptions};
use log::{debug, info, warn};
use serde::Serialize;

/// Summary of an open volume, suitable for reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
    pub fs_type: String,
    pub label: Option<String>,
    pub oem_name: String,
    pub volume_id: u32,
    pub total_sectors: u32,
    pub sectors_per_cluster: u8,
    pub bytes_per_cluster: u32,
    pub reserved_sectors: u16,
    pub fat_copies: u8,
    pub sectors_per_fat: u16,
    pub hidden_sectors: u32,
    pub root_entry_capacity: u16,
    pub root_entries_in_use: usize,
    pub root_dir_start: u64,
    pub first_data_sector: u64,
}

/// An open FAT16 volume.
///
/// Borrows its block device for its whole lifetime and never closes it.
/// Handles opened on the volume borrow the volume in turn, so the borrow
/// checker rules out closing a volume while a file or directory handle
/// (including one sharing the root entry list) is still alive.
pub struct Volume<'d> {
    device: &'d BlockDevice,
    boot_record: BootRecord,
    options: VolumeOptions,
    fat: FatTable,
    root_dir: Vec<u8>,
    root_entries: Vec<DirectoryEntry>,
    root_dir_start: u64,
    first_data_sector: u64,
    bytes_per_cluster: u32,
}

impl<'d> Volume<'d> {
    /// Open the volume whose boot record sits at `first_sector`
    pub fn open(device: &'d BlockDevice, first_sector: u64) -> FatResult<Self> {
        Self::open_with_options(device, first_sector, VolumeOptions::default())
    }

    pub fn open_with_options(device: &'d BlockDevice, first_sector: u64, options: VolumeOptions) -> FatResult<Self> {
        info!("Opening FAT16 volume at sector {}", first_sector);

        let mut sector = [0u8; SECTOR_SIZE];
        device.read(first_sector, &mut sector, 1)?;

        let boot_record = BootRecord::parse(&sector)?;
        boot_record.validate()?;
        debug!("Boot record: {:?}", boot_record);

        // Copy values out once; everything below is derived from these
        let reserved_sectors = boot_record.reserved_sectors as u64;
        let sectors_per_fat = boot_record.sectors_per_fat as u64;
        let fat_copies = boot_record.fat_copies as u64;
        let root_entry_capacity = boot_record.root_entries as usize;

        // Allocation table (first copy only)
        let mut fat_raw = alloc_buffer(sectors_per_fat as usize * SECTOR_SIZE)?;
        device.read(reserved_sectors, &mut fat_raw, sectors_per_fat as usize)?;
        let fat = FatTable::from_bytes(&fat_raw)?;

        // Fixed root directory region
        let root_dir_size = root_entry_capacity * DIR_ENTRY_SIZE;
        let root_dir_sectors = root_dir_size / SECTOR_SIZE;
        let root_dir_start = reserved_sectors + fat_copies * sectors_per_fat;

        let mut root_dir = alloc_buffer(root_dir_size)?;
        device.read(root_dir_start, &mut root_dir, root_dir_sectors)?;

        let mut root_entries = Vec::new();
        for entry in DirectorySlots::new(&root_dir) {
            root_entries.try_reserve(1)?;
            root_entries.push(entry);
        }

        // Data region start. The default divides the entry count by 16;
        // that only matches the true root span when it is a multiple of 16.
        let formula_root_sectors = (root_entry_capacity / DIR_ENTRIES_PER_SECTOR) as u64;
        let exact_root_sectors = root_dir_size.div_ceil(SECTOR_SIZE) as u64;
        if formula_root_sectors != exact_root_sectors {
            warn!(
                "Root directory spans {} sectors but data-start formula assumes {} ({} entries)",
                exact_root_sectors, formula_root_sectors, root_entry_capacity
            );
        }
        let root_span = if options.exact_root_dir_sectors {
            exact_root_sectors
        } else {
            formula_root_sectors
        };

        let first_data_sector = reserved_sectors
            + boot_record.hidden_sectors as u64
            + fat_copies * sectors_per_fat
            + root_span;
        let bytes_per_cluster = boot_record.sectors_per_cluster as u32 * SECTOR_SIZE as u32;

        info!("FAT16 volume details:");
        info!("  Sectors per cluster: {}", boot_record.sectors_per_cluster);
        info!("  Allocation table entries: {}", fat.len());
        info!("  Root directory: sector {}, {} of {} entries in use", root_dir_start, root_entries.len(), root_entry_capacity);
        info!("  First data sector: {}", first_data_sector);

        Ok(Self {
            device,
            boot_record,
            options,
            fat,
            root_dir,
            root_entries,
            root_dir_start,
            first_data_sector,
            bytes_per_cluster,
        })
    }

    /// Release the table and root directory; the block device stays open
    pub fn close(self) -> FatResult<()> {
        debug!("Closing FAT16 volume ({} root entries)", self.root_entries.len());
        Ok(())
    }

    pub fn device(&self) -> &'d BlockDevice {
        self.device
    }

    pub fn boot_record(&self) -> &BootRecord {
        &self.boot_record
    }

    pub fn options(&self) -> &VolumeOptions {
        &self.options
    }

    pub fn fat(&self) -> &FatTable {
        &self.fat
    }

    /// Raw root directory region as read from disk
    pub fn root_dir(&self) -> &[u8] {
        &self.root_dir
    }

    /// Live root entries in on-disk order
    pub fn root_entries(&self) -> &[DirectoryEntry] {
        &self.root_entries
    }

    pub fn root_dir_start(&self) -> u64 {
        self.root_dir_start
    }

    pub fn first_data_sector(&self) -> u64 {
        self.first_data_sector
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_cluster
    }

    pub fn sectors_per_cluster(&self) -> u8 {
        self.boot_record.sectors_per_cluster
    }

    /// First sector of a data cluster. Clusters 0 and 1 have no data area
    /// and map onto the start of the data region; chains only carry them as
    /// the start cluster of an empty file.
    pub fn cluster_sector(&self, cluster: u16) -> u64 {
        let index = cluster.saturating_sub(2) as u64;
        self.first_data_sector + index * self.sectors_per_cluster() as u64
    }

    /// Read one whole cluster into `buffer`
    pub fn read_cluster(&self, link: &ClusterLink, buffer: &mut [u8]) -> FatResult<()> {
        self.device.read(link.sector, buffer, self.sectors_per_cluster() as usize)?;
        Ok(())
    }

    /// Resolve a backslash-separated path to its directory entry
    pub fn resolve(&self, path: &str) -> FatResult<DirectoryEntry> {
        Fat16PathResolver::new(self).resolve(path)
    }

    pub fn open_file<'v>(&'v self, path: &str) -> FatResult<FileHandle<'v>> {
        FileHandle::open(self, path)
    }

    pub fn open_dir<'v>(&'v self, path: &str) -> FatResult<DirectoryHandle<'v>> {
        DirectoryHandle::open(self, path)
    }

    pub fn info(&self) -> VolumeInfo {
        let br = &self.boot_record;
        VolumeInfo {
            fs_type: br.fs_type(),
            label: br.label(),
            oem_name: br.oem_name(),
            volume_id: br.volume_id,
            total_sectors: br.total_sectors(),
            sectors_per_cluster: br.sectors_per_cluster,
            bytes_per_cluster: self.bytes_per_cluster,
            reserved_sectors: br.reserved_sectors,
            fat_copies: br.fat_copies,
            sectors_per_fat: br.sectors_per_fat,
            hidden_sectors: br.hidden_sectors,
            root_entry_capacity: br.root_entries,
            root_entries_in_use: self.root_entries.len(),
            root_dir_start: self.root_dir_start,
            first_data_sector: self.first_data_sector,
        }
    }
}
