// FAT16 on-disk structures
// Boot record and 32-byte directory entries, decoded field by field from
// little-endian buffers into owned values.

use super::constants::*;
use super::directory::clean_short_name;
use super::timestamps::{fat_date, fat_datetime};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use chrono::{NaiveDate, NaiveDateTime};
use fatlens_core::{FatError, FatResult};
use std::fmt;
use std::io::{Cursor, Read};

// ============================================================================
// Boot record
// ============================================================================

/// BIOS parameter block plus the FAT16 extended boot record, parsed from
/// the first sector of a volume. Immutable once loaded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BootRecord {
    pub jump_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_copies: u8,
    pub root_entries: u16,
    pub total_sectors_16: u16,
    pub media_descriptor: u8,
    pub sectors_per_fat: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
    // Extended boot record
    pub drive_number: u8,
    pub extended_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
    pub boot_signature: [u8; 2],
}

impl BootRecord {
    /// Decode a boot sector. Only layout is checked here; see `validate`.
    pub fn parse(sector: &[u8]) -> FatResult<Self> {
        if sector.len() < BYTES_PER_SECTOR {
            return Err(FatError::InvalidArgument(format!(
                "boot sector needs {} bytes, got {}",
                BYTES_PER_SECTOR,
                sector.len()
            )));
        }

        let mut c = Cursor::new(sector);
        let mut record = BootRecord {
            jump_boot: [0; 3],
            oem_name: [0; 8],
            bytes_per_sector: 0,
            sectors_per_cluster: 0,
            reserved_sectors: 0,
            fat_copies: 0,
            root_entries: 0,
            total_sectors_16: 0,
            media_descriptor: 0,
            sectors_per_fat: 0,
            sectors_per_track: 0,
            num_heads: 0,
            hidden_sectors: 0,
            total_sectors_32: 0,
            drive_number: 0,
            extended_signature: 0,
            volume_id: 0,
            volume_label: [0; 11],
            fs_type: [0; 8],
            boot_signature: [0; 2],
        };

        c.set_position(BS_JMP_BOOT as u64);
        c.read_exact(&mut record.jump_boot)?;
        c.set_position(BS_OEM_NAME as u64);
        c.read_exact(&mut record.oem_name)?;
        c.set_position(BPB_BYTES_PER_SEC as u64);
        record.bytes_per_sector = c.read_u16::<LittleEndian>()?;
        c.set_position(BPB_SEC_PER_CLUS as u64);
        record.sectors_per_cluster = c.read_u8()?;
        c.set_position(BPB_RSVD_SEC_CNT as u64);
        record.reserved_sectors = c.read_u16::<LittleEndian>()?;
        c.set_position(BPB_NUM_FATS as u64);
        record.fat_copies = c.read_u8()?;
        c.set_position(BPB_ROOT_ENT_CNT as u64);
        record.root_entries = c.read_u16::<LittleEndian>()?;
        c.set_position(BPB_TOT_SEC16 as u64);
        record.total_sectors_16 = c.read_u16::<LittleEndian>()?;
        c.set_position(BPB_MEDIA as u64);
        record.media_descriptor = c.read_u8()?;
        c.set_position(BPB_FAT_SZ16 as u64);
        record.sectors_per_fat = c.read_u16::<LittleEndian>()?;
        c.set_position(BPB_SEC_PER_TRK as u64);
        record.sectors_per_track = c.read_u16::<LittleEndian>()?;
        c.set_position(BPB_NUM_HEADS as u64);
        record.num_heads = c.read_u16::<LittleEndian>()?;
        c.set_position(BPB_HIDD_SEC as u64);
        record.hidden_sectors = c.read_u32::<LittleEndian>()?;
        c.set_position(BPB_TOT_SEC32 as u64);
        record.total_sectors_32 = c.read_u32::<LittleEndian>()?;

        c.set_position(BS16_DRV_NUM as u64);
        record.drive_number = c.read_u8()?;
        c.set_position(BS16_BOOT_SIG as u64);
        record.extended_signature = c.read_u8()?;
        c.set_position(BS16_VOL_ID as u64);
        record.volume_id = c.read_u32::<LittleEndian>()?;
        c.set_position(BS16_VOL_LAB as u64);
        c.read_exact(&mut record.volume_label)?;
        c.set_position(BS16_FIL_SYS_TYPE as u64);
        c.read_exact(&mut record.fs_type)?;
        c.set_position(BOOT_SIGNATURE_OFFSET as u64);
        c.read_exact(&mut record.boot_signature)?;

        Ok(record)
    }

    /// Check both signatures and the geometry fields every later
    /// computation divides or multiplies by.
    pub fn validate(&self) -> FatResult<()> {
        if !EXTENDED_BOOT_SIGNATURES.contains(&self.extended_signature) {
            return Err(FatError::InvalidFormat(format!(
                "extended boot signature 0x{:02X}, expected 0x28 or 0x29",
                self.extended_signature
            )));
        }

        if self.boot_signature != BOOT_SIGNATURE {
            return Err(FatError::InvalidFormat(format!(
                "boot signature {:02X} {:02X}, expected 55 AA",
                self.boot_signature[0], self.boot_signature[1]
            )));
        }

        if self.sectors_per_cluster == 0 {
            return Err(FatError::InvalidFormat("sectors per cluster is 0".to_string()));
        }

        Ok(())
    }

    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u32
        } else {
            self.total_sectors_32
        }
    }

    /// Volume label with padding stripped, None when blank
    pub fn label(&self) -> Option<String> {
        let label = latin1(&self.volume_label);
        let label = label.trim_end();
        if label.is_empty() || label == "NO NAME" {
            None
        } else {
            Some(label.to_string())
        }
    }

    pub fn oem_name(&self) -> String {
        latin1(&self.oem_name).trim_end().to_string()
    }

    pub fn fs_type(&self) -> String {
        latin1(&self.fs_type).trim_end().to_string()
    }
}

// Implement Debug manually to show the text fields as text
impl fmt::Debug for BootRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootRecord")
            .field("oem_name", &self.oem_name())
            .field("sectors_per_cluster", &self.sectors_per_cluster)
            .field("reserved_sectors", &self.reserved_sectors)
            .field("fat_copies", &self.fat_copies)
            .field("root_entries", &self.root_entries)
            .field("sectors_per_fat", &self.sectors_per_fat)
            .field("hidden_sectors", &self.hidden_sectors)
            .field("total_sectors", &self.total_sectors())
            .field("volume_label", &self.label())
            .field("fs_type", &self.fs_type())
            .finish()
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

// ============================================================================
// Directory entries
// ============================================================================

/// FAT Directory Entry Attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FatAttributes(pub u8);

impl FatAttributes {
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    pub const LFN: u8 = 0x0F; // Long filename fragment

    pub fn is_read_only(&self) -> bool { self.0 & Self::READ_ONLY != 0 }
    pub fn is_hidden(&self) -> bool { self.0 & Self::HIDDEN != 0 }
    pub fn is_system(&self) -> bool { self.0 & Self::SYSTEM != 0 }
    pub fn is_volume_id(&self) -> bool { self.0 & Self::VOLUME_ID != 0 }
    pub fn is_directory(&self) -> bool { self.0 & Self::DIRECTORY != 0 }
    pub fn is_archive(&self) -> bool { self.0 & Self::ARCHIVE != 0 }
    pub fn is_lfn(&self) -> bool { self.0 == Self::LFN }
}

/// One 32-byte directory record, copied out of the on-disk buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: [u8; 8],
    pub ext: [u8; 3],
    pub attributes: FatAttributes,
    pub reserved: u8,
    pub creation_time_tenths: u8,
    pub creation_time: u16,
    pub creation_date: u16,
    pub last_access_date: u16,
    pub reserved_high: u16, // First cluster high word on FAT32, unused here
    pub modified_time: u16,
    pub modified_date: u16,
    pub first_cluster: u16,
    pub size: u32,
}

impl DirectoryEntry {
    /// Decode the first 32 bytes of `raw`
    pub fn parse(raw: &[u8]) -> FatResult<Self> {
        let slot = raw.first_chunk::<DIR_ENTRY_SIZE>().ok_or_else(|| {
            FatError::InvalidArgument(format!(
                "directory entry needs {} bytes, got {}",
                DIR_ENTRY_SIZE,
                raw.len()
            ))
        })?;
        Ok(Self::from_slot(slot))
    }

    /// Decode one on-disk slot. Every field has a fixed offset inside the
    /// 32 bytes, so this cannot fail.
    pub fn from_slot(slot: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0u8; 8];
        let mut ext = [0u8; 3];
        name.copy_from_slice(&slot[0..8]);
        ext.copy_from_slice(&slot[8..11]);

        Self {
            name,
            ext,
            attributes: FatAttributes(slot[11]),
            reserved: slot[12],
            creation_time_tenths: slot[13],
            creation_time: LittleEndian::read_u16(&slot[14..16]),
            creation_date: LittleEndian::read_u16(&slot[16..18]),
            last_access_date: LittleEndian::read_u16(&slot[18..20]),
            reserved_high: LittleEndian::read_u16(&slot[20..22]),
            modified_time: LittleEndian::read_u16(&slot[22..24]),
            modified_date: LittleEndian::read_u16(&slot[24..26]),
            first_cluster: LittleEndian::read_u16(&slot[26..28]),
            size: LittleEndian::read_u32(&slot[28..32]),
        }
    }

    /// Display name rebuilt from the 8.3 fields
    pub fn short_name(&self) -> String {
        clean_short_name(&self.name, &self.ext)
    }

    pub fn is_end(&self) -> bool {
        self.name[0] == ENTRY_END_OF_DIRECTORY
    }

    pub fn is_deleted(&self) -> bool {
        self.name[0] == ENTRY_DELETED
    }

    pub fn is_long_name(&self) -> bool {
        self.attributes.is_lfn()
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.is_directory()
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes.is_volume_id()
    }

    pub fn created(&self) -> Option<NaiveDateTime> {
        fat_datetime(self.creation_date, self.creation_time, self.creation_time_tenths)
    }

    pub fn modified(&self) -> Option<NaiveDateTime> {
        fat_datetime(self.modified_date, self.modified_time, 0)
    }

    pub fn accessed(&self) -> Option<NaiveDate> {
        fat_date(self.last_access_date)
    }
}
