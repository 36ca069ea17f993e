use std::io::{self, Write};

use dedup_types::DigestAlgorithm;

use crate::hasher::Digester;

/// Write-through sink that digests every byte it accepts.
///
/// Each successful `write` forwards to the inner writer and folds exactly the
/// accepted prefix of the buffer into the digest, so the digest always
/// describes the bytes the inner writer received. A short write never
/// desynchronises the two.
pub struct DigestingWriter<W: Write> {
    inner: W,
    digester: Digester,
    written: u64,
}

impl<W: Write> DigestingWriter<W> {
    pub fn new(inner: W, algorithm: DigestAlgorithm) -> Self {
        Self {
            inner,
            digester: Digester::new(algorithm),
            written: 0,
        }
    }

    /// Bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.digester.algorithm()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Split into the inner writer and the digest accumulator.
    pub fn into_parts(self) -> (W, Digester) {
        (self.inner, self.digester)
    }
}

impl<W: Write> Write for DigestingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.digester.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
