// MS-DOS date/time decoding for directory entries
// FAT date: bits 15-9: year (0=1980), bits 8-5: month, bits 4-0: day
// FAT time: bits 15-11: hours, bits 10-5: minutes, bits 4-0: seconds/2

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Decode a FAT date. Returns None for zero or out-of-range fields.
pub fn fat_date(date: u16) -> Option<NaiveDate> {
    let year = ((date >> 9) & 0x7F) as i32 + 1980;
    let month = ((date >> 5) & 0x0F) as u32;
    let day = (date & 0x1F) as u32;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Decode a FAT date/time pair, optionally refined by a tenths-of-second
/// field (0-199, creation timestamps only).
pub fn fat_datetime(date: u16, time: u16, tenths: u8) -> Option<NaiveDateTime> {
    let hour = ((time >> 11) & 0x1F) as u32;
    let minute = ((time >> 5) & 0x3F) as u32;
    let second = ((time & 0x1F) * 2) as u32; // FAT stores seconds/2

    let base = fat_date(date)?.and_hms_opt(hour, minute, second)?;
    if tenths > 199 {
        return Some(base);
    }
    Some(base + Duration::milliseconds(tenths as i64 * 10))
}
