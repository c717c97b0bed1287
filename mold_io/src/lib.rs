pub mod asset_io;

pub use asset_io::*;
