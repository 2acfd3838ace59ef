//! Wire protocol: request framing and response envelopes.
//!
//! Requests are raw specifier strings. Each one is answered with exactly one
//! newline-terminated JSON value, shaped by the configured [`Envelope`]:
//!
//! ```text
//! result:  {"Ok":{"Tag":"latest"}}        {"Err":"EINVALIDTAGNAME: ..."}
//! legacy:  {"Tag":"latest"}               {"Invalid":"EINVALIDTAGNAME: ..."}
//! ```

use crate::config::{Envelope, Framing};
use bytes::{Buf, BytesMut};
use serde::Serialize;
use specsrv_core::{ClassifyError, PackageSpecifier};

/// Error code answered for a request over the size limit.
pub const TOO_LARGE: &str = "ETOOLARGE";

#[derive(Serialize)]
enum LegacyError {
    Invalid(String),
}

/// Encodes one classification outcome as a response line.
///
/// # Examples
///
/// ```
/// use specsrv::config::Envelope;
/// use specsrv::protocol::encode_response;
/// use specsrv_core::PackageSpecifier;
///
/// let ok = Ok(PackageSpecifier::Tag("latest".into()));
/// assert_eq!(encode_response(&ok, Envelope::Result).unwrap(), "{\"Ok\":{\"Tag\":\"latest\"}}\n");
/// assert_eq!(encode_response(&ok, Envelope::Legacy).unwrap(), "{\"Tag\":\"latest\"}\n");
/// ```
pub fn encode_response(
    outcome: &Result<PackageSpecifier, ClassifyError>,
    envelope: Envelope,
) -> serde_json::Result<String> {
    let mut line = match (envelope, outcome) {
        (Envelope::Result, Ok(spec)) => serde_json::to_string(&Ok::<_, String>(spec))?,
        (Envelope::Result, Err(err)) => {
            serde_json::to_string(&Err::<&PackageSpecifier, _>(err.wire_message()))?
        }
        (Envelope::Legacy, Ok(spec)) => serde_json::to_string(spec)?,
        (Envelope::Legacy, Err(err)) => {
            serde_json::to_string(&LegacyError::Invalid(err.wire_message()))?
        }
    };
    line.push('\n');
    Ok(line)
}

/// Decodes a `result`-envelope response line.
pub fn decode_response(line: &str) -> serde_json::Result<Result<PackageSpecifier, String>> {
    serde_json::from_str(line.trim_end())
}

/// Error answered for an oversized request.
pub fn too_large(limit: usize) -> ClassifyError {
    ClassifyError::Invalid {
        code: TOO_LARGE.to_string(),
        message: format!("request exceeds {} bytes", limit),
    }
}

/// One unit of work cut from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Request(String),
    /// A request went over the size limit and was discarded
    TooLarge,
}

/// Cuts a connection's byte stream into requests.
///
/// With [`Framing::Newline`] bytes are buffered across reads until a `\n`;
/// a trailing `\r` is dropped and an unterminated tail is flushed by
/// [`finish`](Self::finish). With [`Framing::Chunk`] every read is one
/// request.
#[derive(Debug)]
pub struct RequestFramer {
    framing: Framing,
    max_bytes: usize,
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no `\n`
    scanned: usize,
    /// Skipping the rest of an oversized line
    discarding: bool,
}

impl RequestFramer {
    pub fn new(framing: Framing, max_bytes: usize) -> Self {
        Self {
            framing,
            max_bytes,
            buf: BytesMut::new(),
            scanned: 0,
            discarding: false,
        }
    }

    /// Feeds one read's worth of bytes, returning the frames it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        match self.framing {
            Framing::Chunk => {
                if chunk.len() > self.max_bytes {
                    vec![Frame::TooLarge]
                } else {
                    vec![Frame::Request(String::from_utf8_lossy(chunk).into_owned())]
                }
            }
            Framing::Newline => self.push_lines(chunk),
        }
    }

    fn push_lines(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let line = self.buf.split_to(pos + 1);
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if pos > self.max_bytes {
                frames.push(Frame::TooLarge);
                continue;
            }
            frames.push(Frame::Request(decode_line(&line[..pos])));
        }
        self.scanned = self.buf.len();

        if self.buf.len() > self.max_bytes {
            self.buf.clear();
            self.scanned = 0;
            if !self.discarding {
                self.discarding = true;
                frames.push(Frame::TooLarge);
            }
        }

        frames
    }

    /// Flushes an unterminated final request at end of stream.
    pub fn finish(&mut self) -> Option<Frame> {
        self.scanned = 0;
        if self.framing == Framing::Chunk || std::mem::take(&mut self.discarding) {
            self.buf.clear();
            return None;
        }
        if self.buf.is_empty() {
            return None;
        }
        let tail = decode_line(&self.buf);
        self.buf.advance(self.buf.len());
        Some(Frame::Request(tail))
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
