// Directory entry scanning and 8.3 short-name handling

use super::constants::*;
use super::structures::DirectoryEntry;
use log::trace;

/// Rebuild the 8.3 display name: trailing spaces trimmed from both fields,
/// a dot only when the extension's first byte is not a space.
pub fn clean_short_name(name: &[u8; 8], ext: &[u8; 3]) -> String {
    let mut result: String = trim_padding(name)
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if i == 0 && b == ENTRY_ESCAPED_E5 {
                ENTRY_DELETED as char
            } else {
                b as char
            }
        })
        .collect();

    if ext[0] == b' ' {
        return result;
    }

    result.push('.');
    result.extend(trim_padding(ext).iter().map(|&b| b as char));
    result
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let end = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    &field[..end]
}

/// Short names are stored upper case; path components are folded the same
/// way (ASCII only) before comparison.
pub fn fold_component(component: &str) -> String {
    component.to_ascii_uppercase()
}

/// Walks the 32-byte slots of a directory block, yielding live entries.
///
/// Deleted slots (0xE5) and long-name fragments (attribute 0x0F) are
/// skipped. Iteration stops for good at the first slot whose name begins
/// with 0x00; `reached_end` then reports true so callers walking a cluster
/// chain know not to look at further clusters.
pub struct DirectorySlots<'a> {
    block: &'a [u8],
    offset: usize,
    reached_end: bool,
}

impl<'a> DirectorySlots<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self {
            block,
            offset: 0,
            reached_end: false,
        }
    }

    /// True once the end-of-directory marker has been seen
    pub fn reached_end(&self) -> bool {
        self.reached_end
    }
}

impl<'a> Iterator for DirectorySlots<'a> {
    type Item = DirectoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.reached_end {
            // A trailing partial slot is not a slot
            let slot = self.block.get(self.offset..)?.first_chunk::<DIR_ENTRY_SIZE>()?;
            self.offset += DIR_ENTRY_SIZE;

            let entry = DirectoryEntry::from_slot(slot);

            if entry.is_end() {
                self.reached_end = true;
                return None;
            }
            if entry.is_deleted() || entry.is_long_name() {
                trace!("Skipping slot at offset {:#x}", self.offset - DIR_ENTRY_SIZE);
                continue;
            }

            return Some(entry);
        }
        None
    }
}
