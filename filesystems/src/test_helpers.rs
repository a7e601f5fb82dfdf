// Test helpers for filesystem testing
// Builds small FAT16 images in memory so tests can exercise the driver
// without fixture files.

use crate::device_reader::{BlockDevice, SECTOR_SIZE};
use crate::fat_common::{FatAttributes, BOOT_SIGNATURE, DIR_ENTRY_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use fatlens_core::FatResult;
use std::io::Cursor;

/// Raw boot sector with the given geometry and extended boot signature
pub fn boot_sector(
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    fat_copies: u8,
    root_entries: u16,
    sectors_per_fat: u16,
    hidden_sectors: u32,
    extended_signature: u8,
) -> Vec<u8> {
    let mut s = vec![0u8; SECTOR_SIZE];
    s[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    s[3..11].copy_from_slice(b"FATLENS ");
    LittleEndian::write_u16(&mut s[0x0B..], SECTOR_SIZE as u16);
    s[0x0D] = sectors_per_cluster;
    LittleEndian::write_u16(&mut s[0x0E..], reserved_sectors);
    s[0x10] = fat_copies;
    LittleEndian::write_u16(&mut s[0x11..], root_entries);
    s[0x15] = 0xF8;
    LittleEndian::write_u16(&mut s[0x16..], sectors_per_fat);
    LittleEndian::write_u16(&mut s[0x18..], 63);
    LittleEndian::write_u16(&mut s[0x1A..], 255);
    LittleEndian::write_u32(&mut s[0x1C..], hidden_sectors);
    s[0x24] = 0x80;
    s[0x26] = extended_signature;
    LittleEndian::write_u32(&mut s[0x27..], 0x1234_ABCD);
    s[0x2B..0x36].copy_from_slice(b"FIXTURE    ");
    s[0x36..0x3E].copy_from_slice(b"FAT16   ");
    s[0x1FE..0x200].copy_from_slice(&BOOT_SIGNATURE);
    s
}

/// Raw 32-byte directory entry
pub fn raw_entry(name: &[u8; 8], ext: &[u8; 3], attributes: u8, first_cluster: u16, size: u32) -> [u8; 32] {
    let mut e = [0u8; DIR_ENTRY_SIZE];
    e[0..8].copy_from_slice(name);
    e[8..11].copy_from_slice(ext);
    e[11] = attributes;
    // 2024-01-15 14:30:10 for both creation and modification
    let date = ((2024 - 1980) << 9) | (1 << 5) | 15;
    let time = (14 << 11) | (30 << 5) | 5;
    LittleEndian::write_u16(&mut e[14..], time);
    LittleEndian::write_u16(&mut e[16..], date);
    LittleEndian::write_u16(&mut e[18..], date);
    LittleEndian::write_u16(&mut e[22..], time);
    LittleEndian::write_u16(&mut e[24..], date);
    LittleEndian::write_u16(&mut e[26..], first_cluster);
    LittleEndian::write_u32(&mut e[28..], size);
    e
}

/// Geometry of a fixture image
#[derive(Debug, Clone, Copy)]
pub struct FixtureGeometry {
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_copies: u8,
    pub root_entries: u16,
    pub sectors_per_fat: u16,
    pub hidden_sectors: u32,
    pub total_sectors: u32,
    pub extended_signature: u8,
}

impl Default for FixtureGeometry {
    fn default() -> Self {
        Self {
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            fat_copies: 2,
            root_entries: 16,
            sectors_per_fat: 1,
            hidden_sectors: 0,
            total_sectors: 128,
            extended_signature: 0x29,
        }
    }
}

/// Assembles a FAT16 image: boot sector, FAT copies, fixed root region and
/// a data region laid out with the driver's data-start formula.
///
/// Directories are addressed by their first cluster; `None` is the root.
pub struct ImageBuilder {
    geometry: FixtureGeometry,
    image: Vec<u8>,
    fat: Vec<u16>,
    next_cluster: u16,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::with_geometry(FixtureGeometry::default())
    }

    pub fn with_geometry(geometry: FixtureGeometry) -> Self {
        let fat_entries = geometry.sectors_per_fat as usize * SECTOR_SIZE / 2;
        let mut fat = vec![0u16; fat_entries];
        fat[0] = 0xFFF8;
        fat[1] = 0xFFFF;

        Self {
            geometry,
            image: vec![0u8; geometry.total_sectors as usize * SECTOR_SIZE],
            fat,
            next_cluster: 2,
        }
    }

    pub fn geometry(&self) -> FixtureGeometry {
        self.geometry
    }

    pub fn root_dir_start(&self) -> u64 {
        let g = &self.geometry;
        g.reserved_sectors as u64 + g.fat_copies as u64 * g.sectors_per_fat as u64
    }

    pub fn first_data_sector(&self) -> u64 {
        let g = &self.geometry;
        g.reserved_sectors as u64
            + g.hidden_sectors as u64
            + g.fat_copies as u64 * g.sectors_per_fat as u64
            + (g.root_entries / 16) as u64
    }

    pub fn bytes_per_cluster(&self) -> usize {
        self.geometry.sectors_per_cluster as usize * SECTOR_SIZE
    }

    pub fn cluster_sector(&self, cluster: u16) -> u64 {
        self.first_data_sector() + (cluster as u64 - 2) * self.geometry.sectors_per_cluster as u64
    }

    /// Link `clusters` in order and terminate the chain
    pub fn link_chain(&mut self, clusters: &[u16]) {
        for pair in clusters.windows(2) {
            self.fat[pair[0] as usize] = pair[1];
        }
        if let Some(&last) = clusters.last() {
            self.fat[last as usize] = 0xFFFF;
        }
    }

    /// Overwrite a single allocation-table entry
    pub fn set_fat_entry(&mut self, cluster: u16, value: u16) {
        self.fat[cluster as usize] = value;
    }

    /// Take the next `count` unused clusters in ascending order
    pub fn allocate(&mut self, count: usize) -> Vec<u16> {
        let mut clusters = Vec::with_capacity(count);
        while clusters.len() < count {
            let c = self.next_cluster;
            self.next_cluster += 1;
            if self.fat[c as usize] == 0 {
                clusters.push(c);
            }
        }
        self.link_chain(&clusters);
        clusters
    }

    /// Reserve specific clusters so `allocate` never hands them out
    pub fn reserve(&mut self, clusters: &[u16]) {
        self.link_chain(clusters);
    }

    /// Write `data` across an explicit cluster list (already linked or not)
    pub fn write_clusters(&mut self, clusters: &[u16], data: &[u8]) {
        let bpc = self.bytes_per_cluster();
        for (chunk, &cluster) in data.chunks(bpc).zip(clusters) {
            let start = self.cluster_sector(cluster) as usize * SECTOR_SIZE;
            self.image[start..start + chunk.len()].copy_from_slice(chunk);
        }
    }

    /// Add a file with contiguous freshly allocated clusters. Returns the
    /// first cluster, 0 for an empty file.
    pub fn add_file(&mut self, parent: Option<u16>, name: &[u8; 8], ext: &[u8; 3], data: &[u8]) -> u16 {
        let count = data.len().div_ceil(self.bytes_per_cluster());
        let clusters = self.allocate(count);
        self.add_file_at(parent, name, ext, data, &clusters)
    }

    /// Add a file stored in the given clusters, in chain order
    pub fn add_file_at(
        &mut self,
        parent: Option<u16>,
        name: &[u8; 8],
        ext: &[u8; 3],
        data: &[u8],
        clusters: &[u16],
    ) -> u16 {
        self.link_chain(clusters);
        self.write_clusters(clusters, data);
        let first = clusters.first().copied().unwrap_or(0);
        self.push_entry(parent, raw_entry(name, ext, FatAttributes::ARCHIVE, first, data.len() as u32));
        first
    }

    /// Add a subdirectory spanning `clusters` clusters, with `.` and `..`
    pub fn add_directory(&mut self, parent: Option<u16>, name: &[u8; 8], clusters: usize) -> u16 {
        let chain = self.allocate(clusters.max(1));
        let first = chain[0];

        self.push_entry(parent, raw_entry(name, b"   ", FatAttributes::DIRECTORY, first, 0));
        self.push_entry(Some(first), raw_entry(b".       ", b"   ", FatAttributes::DIRECTORY, first, 0));
        self.push_entry(
            Some(first),
            raw_entry(b"..      ", b"   ", FatAttributes::DIRECTORY, parent.unwrap_or(0), 0),
        );
        first
    }

    /// Byte offsets of every slot in a directory, in on-disk order
    pub fn slot_offsets(&self, dir: Option<u16>) -> Vec<usize> {
        match dir {
            None => {
                let start = self.root_dir_start() as usize * SECTOR_SIZE;
                (0..self.geometry.root_entries as usize)
                    .map(|i| start + i * DIR_ENTRY_SIZE)
                    .collect()
            }
            Some(first) => {
                let per_cluster = self.bytes_per_cluster() / DIR_ENTRY_SIZE;
                let mut offsets = Vec::new();
                let mut cluster = first;
                loop {
                    let start = self.cluster_sector(cluster) as usize * SECTOR_SIZE;
                    offsets.extend((0..per_cluster).map(|i| start + i * DIR_ENTRY_SIZE));
                    let next = self.fat[cluster as usize];
                    if next >= 0xFFF8 || next < 2 {
                        break;
                    }
                    cluster = next;
                }
                offsets
            }
        }
    }

    /// Store a raw entry in the first unused slot of a directory
    pub fn push_entry(&mut self, dir: Option<u16>, raw: [u8; 32]) {
        let slot = self
            .slot_offsets(dir)
            .into_iter()
            .find(|&off| self.image[off] == 0)
            .unwrap_or_else(|| panic!("directory {:?} is full", dir));
        self.image[slot..slot + DIR_ENTRY_SIZE].copy_from_slice(&raw);
    }

    /// Store a raw entry at a fixed slot index
    pub fn set_slot(&mut self, dir: Option<u16>, index: usize, raw: [u8; 32]) {
        let slot = self.slot_offsets(dir)[index];
        self.image[slot..slot + DIR_ENTRY_SIZE].copy_from_slice(&raw);
    }

    /// Final image bytes: boot sector and every FAT copy written over the
    /// content regions.
    pub fn build(&self) -> Vec<u8> {
        let g = &self.geometry;
        let mut image = self.image.clone();

        image[..SECTOR_SIZE].copy_from_slice(&boot_sector(
            g.sectors_per_cluster,
            g.reserved_sectors,
            g.fat_copies,
            g.root_entries,
            g.sectors_per_fat,
            g.hidden_sectors,
            g.extended_signature,
        ));
        if g.total_sectors <= u16::MAX as u32 {
            LittleEndian::write_u16(&mut image[0x13..], g.total_sectors as u16);
        } else {
            LittleEndian::write_u32(&mut image[0x20..], g.total_sectors);
        }

        let fat_bytes = g.sectors_per_fat as usize * SECTOR_SIZE;
        for copy in 0..g.fat_copies as usize {
            let start = (g.reserved_sectors as usize + copy * g.sectors_per_fat as usize) * SECTOR_SIZE;
            LittleEndian::write_u16_into(&self.fat, &mut image[start..start + fat_bytes]);
        }

        image
    }

    /// In-memory block device over the built image
    pub fn device(&self) -> FatResult<BlockDevice> {
        BlockDevice::from_source(Cursor::new(self.build()))
    }
}
