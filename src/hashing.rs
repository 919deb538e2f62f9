//! Streaming SHA-1 used for manifest hashes.

use std::io::Write;

use sha1::{Digest, Sha1};

/// SHA-1 of an in-memory buffer, lower-case hex.
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Pass-through writer that hashes everything flowing to the inner writer.
///
/// Used by the include manager to hash assets while they are copied, in a
/// single pass over the source bytes.
pub struct Sha1Writer<W: Write> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> Sha1Writer<W> {
    pub fn new(inner: W) -> Self {
        Sha1Writer {
            inner,
            hasher: Sha1::new(),
        }
    }

    pub fn digest(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl<W: Write> Write for Sha1Writer<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
