use std::fmt;
use std::io::{self, Read, Write};

use dedup_types::DigestAlgorithm;
use sha2::Digest;

/// Running digest accumulator for one [`DigestAlgorithm`].
///
/// Bytes are fed incrementally with [`Digester::update`] (or through the
/// [`Write`] impl, which makes the digester a valid `io::copy` target) and the
/// result is produced once with [`Digester::finalize_hex`].
pub struct Digester {
    algorithm: DigestAlgorithm,
    state: State,
}

enum State {
    Sha1(sha1::Sha1),
    Md5(md5::Md5),
    Sha224(sha2::Sha224),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl Digester {
    /// Start a fresh accumulator.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Sha1 => State::Sha1(sha1::Sha1::new()),
            DigestAlgorithm::Md5 => State::Md5(md5::Md5::new()),
            DigestAlgorithm::Sha224 => State::Sha224(sha2::Sha224::new()),
            DigestAlgorithm::Sha256 => State::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Sha384 => State::Sha384(sha2::Sha384::new()),
            DigestAlgorithm::Sha512 => State::Sha512(sha2::Sha512::new()),
            DigestAlgorithm::Blake3 => State::Blake3(Box::new(blake3::Hasher::new())),
        };
        Self { algorithm, state }
    }

    /// The algorithm this accumulator computes.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Fold more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Sha1(h) => h.update(data),
            State::Md5(h) => h.update(data),
            State::Sha224(h) => h.update(data),
            State::Sha256(h) => h.update(data),
            State::Sha384(h) => h.update(data),
            State::Sha512(h) => h.update(data),
            State::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Consume the accumulator and return the raw digest bytes.
    pub fn finalize(self) -> Vec<u8> {
        match self.state {
            State::Sha1(h) => h.finalize().to_vec(),
            State::Md5(h) => h.finalize().to_vec(),
            State::Sha224(h) => h.finalize().to_vec(),
            State::Sha256(h) => h.finalize().to_vec(),
            State::Sha384(h) => h.finalize().to_vec(),
            State::Sha512(h) => h.finalize().to_vec(),
            State::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }

    /// Consume the accumulator and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.finalize())
    }
}

impl Write for Digester {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for Digester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Digester")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Hex digest of an in-memory byte slice.
pub fn digest_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    let mut digester = Digester::new(algorithm);
    digester.update(data);
    digester.finalize_hex()
}

/// Stream a reader to its end and return the hex digest of everything read.
///
/// Only the bytes actually returned by each `read` call are hashed.
pub fn digest_reader(algorithm: DigestAlgorithm, reader: &mut impl Read) -> io::Result<String> {
    let mut digester = Digester::new(algorithm);
    io::copy(reader, &mut digester)?;
    Ok(digester.finalize_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SHA1_HELLO: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
    const SHA256_HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn sha1_known_vectors() {
        assert_eq!(digest_bytes(DigestAlgorithm::Sha1, b"hello"), SHA1_HELLO);
        assert_eq!(
            digest_bytes(DigestAlgorithm::Sha1, b""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn sha256_known_vectors() {
        assert_eq!(digest_bytes(DigestAlgorithm::Sha256, b"hello"), SHA256_HELLO);
        assert_eq!(
            digest_bytes(DigestAlgorithm::Sha256, b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn md5_known_vectors() {
        assert_eq!(
            digest_bytes(DigestAlgorithm::Md5, b"hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
        assert_eq!(
            digest_bytes(DigestAlgorithm::Md5, b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn sha224_known_vectors() {
        assert_eq!(
            digest_bytes(DigestAlgorithm::Sha224, b"hello"),
            "ea09ae9cc6768c50fcee903ed054556e5bfc8347907f12598aa24193"
        );
        assert_eq!(
            digest_bytes(DigestAlgorithm::Sha224, b""),
            "d14a028c2a3a2bc9476102bb288234c415a2b01f828ea62ac5b3e42f"
        );
    }

    #[test]
    fn blake3_matches_library() {
        let expected = blake3::hash(b"hello").to_hex().to_string();
        assert_eq!(digest_bytes(DigestAlgorithm::Blake3, b"hello"), expected);
    }

    #[test]
    fn output_length_matches_algorithm() {
        for alg in DigestAlgorithm::ALL {
            let hex = digest_bytes(alg, b"length check");
            assert_eq!(hex.len(), alg.hex_len(), "{alg}");
        }
    }

    #[test]
    fn incremental_equals_one_shot() {
        let mut d = Digester::new(DigestAlgorithm::Sha1);
        d.update(b"he");
        d.update(b"");
        d.update(b"llo");
        assert_eq!(d.finalize_hex(), SHA1_HELLO);
    }

    #[test]
    fn digest_reader_streams_everything() {
        let data = vec![7u8; 100_000];
        let mut cursor = Cursor::new(&data);
        let streamed = digest_reader(DigestAlgorithm::Sha512, &mut cursor).unwrap();
        assert_eq!(streamed, digest_bytes(DigestAlgorithm::Sha512, &data));
    }

    #[test]
    fn write_impl_feeds_digest() {
        let mut d = Digester::new(DigestAlgorithm::Sha256);
        d.write_all(b"hello").unwrap();
        assert_eq!(d.algorithm(), DigestAlgorithm::Sha256);
        assert_eq!(d.finalize_hex(), SHA256_HELLO);
    }
}
