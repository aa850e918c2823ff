//! Splits an MJPEG byte stream into JPEG payloads.
//!
//! Multipart boundaries and part headers are ignored; each JPEG is located
//! by its start-of-image (`FF D8`) and end-of-image (`FF D9`) markers.

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Bytes kept while waiting for an end marker before the partial frame is
/// discarded.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug)]
pub struct MjpegSplitter {
    buf: Vec<u8>,
    max_frame_bytes: usize,
    overflows: u64,
}

impl MjpegSplitter {
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_bytes,
            overflows: 0,
        }
    }

    /// Feed a chunk and return every JPEG completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find(&self.buf, &SOI, 0) else {
                // Keep a trailing 0xFF in case the marker straddles chunks.
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                self.buf.drain(..self.buf.len() - keep);
                break;
            };
            match find(&self.buf, &EOI, start + SOI.len()) {
                Some(end) => {
                    let stop = end + EOI.len();
                    frames.push(self.buf[start..stop].to_vec());
                    self.buf.drain(..stop);
                }
                None => {
                    self.buf.drain(..start);
                    if self.buf.len() > self.max_frame_bytes {
                        self.overflows += 1;
                        self.buf.clear();
                    }
                    break;
                }
            }
        }

        frames
    }

    /// Partial frames discarded for exceeding the size limit.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

impl Default for MjpegSplitter {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], needle: &[u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|w| w == needle)
        .map(|i| i + from)
}
