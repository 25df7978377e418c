use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use tracing::{debug, warn};

use crate::config::Station;
use crate::error::ConnectionError;

/// Bytes buffered ahead of the decoder before the reader thread blocks.
const BUFFER_CAP: usize = 512 * 1024;
const CHUNK: usize = 8 * 1024;

#[derive(Debug)]
struct Buffer {
    data: VecDeque<u8>,
    /// The server closed the stream or the transport failed.
    ended: bool,
    /// The consumer went away; the reader thread should bail out.
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    buffer: Mutex<Buffer>,
    readable: Condvar,
    writable: Condvar,
}

/// Blocking reader over the buffered live stream.
///
/// The audio decoder consumes this through `Read`. `Seek` is rejected: a
/// live stream has no positions to return to.
#[derive(Debug)]
pub struct StreamReader {
    shared: Arc<Shared>,
}

impl Read for StreamReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        let mut buffer = self.shared.buffer.lock().unwrap();
        while buffer.data.is_empty() {
            if buffer.ended {
                return Ok(0);
            }
            buffer = self.shared.readable.wait(buffer).unwrap();
        }
        let n = out.len().min(buffer.data.len());
        for (slot, byte) in out.iter_mut().zip(buffer.data.drain(..n)) {
            *slot = byte;
        }
        self.shared.writable.notify_one();
        Ok(n)
    }
}

impl Seek for StreamReader {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "live radio streams do not support seeking",
        ))
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        let mut buffer = self.shared.buffer.lock().unwrap();
        buffer.closed = true;
        self.shared.writable.notify_all();
    }
}

/// A connected station stream, ready to hand to the playback engine.
///
/// Live streams have no duration, cannot seek and never loop.
#[derive(Debug)]
pub struct RadioStream {
    station: String,
    reader: StreamReader,
}

impl RadioStream {
    /// Pump bytes from an arbitrary transport into a buffered reader.
    ///
    /// [`connect`] feeds this with the HTTP response body; tests feed it
    /// loopback data directly.
    pub(crate) fn from_transport(station: &str, body: impl Read + Send + 'static) -> Self {
        let shared = Arc::new(Shared {
            buffer: Mutex::new(Buffer {
                data: VecDeque::new(),
                ended: false,
                closed: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
        });

        let pump = shared.clone();
        thread::spawn(move || pump_stream(body, pump));

        Self {
            station: station.to_string(),
            reader: StreamReader { shared },
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    /// Hand the byte stream to the audio device. Consumed once.
    pub fn into_reader(self) -> StreamReader {
        self.reader
    }
}

/// Open the station's live HTTP byte stream.
///
/// The request carries no timeout: the stream is read until the server
/// closes it, and transport failures surface through the reader.
pub fn connect(station: &Station) -> Result<RadioStream, ConnectionError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(None)
        .build()
        .map_err(|e| ConnectionError::Unreachable(e.to_string()))?;

    let response = client
        .get(&station.url)
        .send()
        .map_err(|e| ConnectionError::Unreachable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        warn!(station = %station.name, %status, "station refused the stream");
        return Err(ConnectionError::BadStatus(status.as_u16()));
    }

    debug!(station = %station.name, url = %station.url, "connected to station");
    Ok(RadioStream::from_transport(&station.name, response))
}

fn pump_stream(mut body: impl Read, shared: Arc<Shared>) {
    let mut chunk = [0u8; CHUNK];
    loop {
        let n = match body.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                debug!(%err, "radio transport read failed");
                break;
            }
        };

        let mut buffer = shared.buffer.lock().unwrap();
        while buffer.data.len() + n > BUFFER_CAP && !buffer.closed {
            buffer = shared.writable.wait(buffer).unwrap();
        }
        if buffer.closed {
            return;
        }
        buffer.data.extend(&chunk[..n]);
        shared.readable.notify_one();
    }

    let mut buffer = shared.buffer.lock().unwrap();
    buffer.ended = true;
    shared.readable.notify_all();
}
