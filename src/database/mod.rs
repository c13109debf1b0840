//! Reading records and memos from an opened data file, and in-place decryption.

mod decrypt;
mod file;
mod memo;
mod value;

pub use decrypt::*;
pub use file::*;
pub use memo::*;
pub use value::*;
