//! Configuration loader and schema types.
//!
//! Settings cover the audio device, the conversion tool, the library
//! database and imports, and the static station list. Stations are loaded
//! once here and stay immutable for the life of the process.

mod load;
mod schema;

pub use schema::*;

#[cfg(test)]
mod tests;
