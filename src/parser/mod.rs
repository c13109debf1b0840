//! Binary parser for the Clarion data file layout.

pub mod codec;
mod crypt;
mod error;
mod header;
mod resolver;
mod schema;

pub use crypt::*;
pub use error::*;
pub use header::*;
pub use resolver::*;
pub use schema::*;
