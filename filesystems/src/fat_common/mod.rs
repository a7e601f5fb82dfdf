// Common FAT components: on-disk layout, allocation table, directory slots

pub mod constants;
pub mod structures;
pub mod fat_table;
pub mod directory;
pub mod timestamps;

pub use constants::*;
pub use structures::*;
pub use fat_table::*;
pub use directory::*;
pub use timestamps::*;
