//! Live radio streaming.
//!
//! Wraps a station's HTTP byte stream as a playback source. Network reads
//! happen on a dedicated reader thread that feeds a bounded in-memory
//! buffer; the decoder consumes that buffer through a blocking `Read`.
//! A live stream has no duration and cannot seek or loop.

mod stream;

pub use stream::{connect, RadioStream, StreamReader};

#[cfg(test)]
mod tests;
