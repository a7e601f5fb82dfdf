// FAT16 on-disk constants

use static_assertions::const_assert_eq;

pub const BYTES_PER_SECTOR: usize = 512;

// Boot sector offsets
pub const BS_JMP_BOOT: usize = 0x00;
pub const BS_OEM_NAME: usize = 0x03;
pub const BPB_BYTES_PER_SEC: usize = 0x0B;
pub const BPB_SEC_PER_CLUS: usize = 0x0D;
pub const BPB_RSVD_SEC_CNT: usize = 0x0E;
pub const BPB_NUM_FATS: usize = 0x10;
pub const BPB_ROOT_ENT_CNT: usize = 0x11;
pub const BPB_TOT_SEC16: usize = 0x13;
pub const BPB_MEDIA: usize = 0x15;
pub const BPB_FAT_SZ16: usize = 0x16;
pub const BPB_SEC_PER_TRK: usize = 0x18;
pub const BPB_NUM_HEADS: usize = 0x1A;
pub const BPB_HIDD_SEC: usize = 0x1C;
pub const BPB_TOT_SEC32: usize = 0x20;

// FAT16 extended BPB offsets (start at 36)
pub const BS16_DRV_NUM: usize = 0x24;
pub const BS16_BOOT_SIG: usize = 0x26;
pub const BS16_VOL_ID: usize = 0x27;
pub const BS16_VOL_LAB: usize = 0x2B;
pub const BS16_FIL_SYS_TYPE: usize = 0x36;

// Extended boot record signatures accepted at BS16_BOOT_SIG
pub const EXTENDED_BOOT_SIGNATURES: [u8; 2] = [0x28, 0x29];

// Boot sector signature
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

// Directory entries
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_ENTRIES_PER_SECTOR: usize = BYTES_PER_SECTOR / DIR_ENTRY_SIZE;
pub const ENTRY_END_OF_DIRECTORY: u8 = 0x00;
pub const ENTRY_DELETED: u8 = 0xE5;
pub const ENTRY_ESCAPED_E5: u8 = 0x05;

// FAT entry values
pub const FAT16_EOC: u16 = 0xFFF8; // End of chain marker (0xFFF8 - 0xFFFF)
pub const FAT16_RESERVED_START: u16 = 0xFFF0;
pub const FAT16_BAD: u16 = 0xFFF7;
pub const FIRST_DATA_CLUSTER: u16 = 2;

const_assert_eq!(BOOT_SIGNATURE_OFFSET + 2, BYTES_PER_SECTOR);
const_assert_eq!(DIR_ENTRIES_PER_SECTOR, 16);
