pub mod config;
pub mod error;

pub use config::VolumeOptions;
pub use error::{FatError, FatResult};
