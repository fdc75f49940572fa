//! CRC32 wrapper (§4.3): downgrades a checksum mismatch to [`ErrorKind::Checksum`] rather than
//! letting it surface as a generic I/O failure.

use std::io::{self, Read};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bytesource::RandomAccessRead;
use crate::error::{ErrorKind, VfsError};

/// Wraps a sequential reader, accumulating a running CRC32 and comparing it against `expected`
/// once the stream is exhausted.
pub struct ChecksummedReader<R: Read> {
    inner: R,
    hasher: crc32fast::Hasher,
    expected: u32,
    path: String,
    finished: bool,
}

impl<R: Read> ChecksummedReader<R> {
    pub fn new(inner: R, expected: u32, path: impl Into<String>) -> Self {
        Self { inner, hasher: crc32fast::Hasher::new(), expected, path: path.into(), finished: false }
    }
}

impl<R: Read> Read for ChecksummedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            if !self.finished {
                self.finished = true;
                let actual = std::mem::replace(&mut self.hasher, crc32fast::Hasher::new()).finalize();
                if actual != self.expected {
                    tracing::warn!(path = %self.path, expected = self.expected, actual, "checksum mismatch");
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        VfsError::new("read", self.path.clone(), ErrorKind::Checksum),
                    ));
                }
            }
            return Ok(0);
        }
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Wraps a random-access source. Tracks a hashing cursor that only advances over bytes an
/// actual `read_at` call has covered; verification fires the moment the cursor reaches `len`,
/// not before (§4.3 — out-of-order reads that never fully cover the stream simply never verify).
pub struct ChecksummedRandomAccess {
    inner: Arc<dyn RandomAccessRead>,
    cursor: Mutex<Cursor>,
    expected: u32,
    len: u64,
    path: String,
}

struct Cursor {
    pos: u64,
    hasher: crc32fast::Hasher,
    /// Set once `pos` reaches `len`: `true` on a matching CRC, `false` on mismatch.
    verified: Option<bool>,
}

impl ChecksummedRandomAccess {
    pub fn new(inner: Arc<dyn RandomAccessRead>, expected: u32, len: u64, path: impl Into<String>) -> Self {
        let cursor = Cursor { pos: 0, hasher: crc32fast::Hasher::new(), verified: None };
        Self { inner, cursor: Mutex::new(cursor), expected, len, path: path.into() }
    }
}

impl RandomAccessRead for ChecksummedRandomAccess {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let n = self.inner.read_at(buf, offset)?;
        if n == 0 {
            return Ok(0);
        }
        let end = offset + n as u64;

        let mismatched_and_covers_final_byte = {
            let mut cursor = self.cursor.lock();
            if cursor.verified.is_none() && offset <= cursor.pos && end > cursor.pos {
                let advance_to = std::cmp::min(end, self.len);
                let start_in_buf = (cursor.pos - offset) as usize;
                let advance_len = (advance_to - cursor.pos) as usize;
                cursor.hasher.update(&buf[start_in_buf..start_in_buf + advance_len]);
                cursor.pos = advance_to;
                if cursor.pos == self.len {
                    let actual = std::mem::replace(&mut cursor.hasher, crc32fast::Hasher::new()).finalize();
                    let ok = actual == self.expected;
                    if !ok {
                        tracing::warn!(path = %self.path, expected = self.expected, actual, "checksum mismatch");
                    }
                    cursor.verified = Some(ok);
                }
            }
            cursor.verified == Some(false) && end >= self.len
        };

        if mismatched_and_covers_final_byte {
            let err = VfsError::new("read", self.path.clone(), ErrorKind::Checksum);
            return Err(io::Error::new(io::ErrorKind::InvalidData, err));
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn streaming_reader_passes_through_on_matching_crc() {
        let data = b"the quick brown fox".to_vec();
        let expected = crc32fast::hash(&data);
        let mut reader = ChecksummedReader::new(io::Cursor::new(data.clone()), expected, "f");
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn streaming_reader_fails_on_final_read_when_crc_mismatches() {
        let data = b"the quick brown fox".to_vec();
        let mut reader = ChecksummedReader::new(io::Cursor::new(data.clone()), 0xdead_beef, "f");
        let mut out = vec![0u8; data.len()];
        reader.read_exact(&mut out).unwrap();
        let err = reader.read(&mut [0u8; 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    struct Fixed(Vec<u8>);
    impl RandomAccessRead for Fixed {
        fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
            let offset = offset as usize;
            if offset >= self.0.len() {
                return Ok(0);
            }
            let n = std::cmp::min(buf.len(), self.0.len() - offset);
            buf[..n].copy_from_slice(&self.0[offset..offset + n]);
            Ok(n)
        }
    }

    #[test]
    fn random_access_verifies_once_fully_covered() {
        let data = b"0123456789".to_vec();
        let expected = crc32fast::hash(&data);
        let inner = Arc::new(Fixed(data.clone()));
        let checked = ChecksummedRandomAccess::new(inner, expected, data.len() as u64, "f");

        let mut buf = vec![0u8; data.len()];
        checked.read_at(&mut buf, 0).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn random_access_reports_checksum_mismatch() {
        let data = b"0123456789".to_vec();
        let inner = Arc::new(Fixed(data.clone()));
        let checked = ChecksummedRandomAccess::new(inner, 0x1234_5678, data.len() as u64, "f");

        let mut buf = vec![0u8; data.len()];
        let err = checked.read_at(&mut buf, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn random_access_covering_reads_in_order_verify_incrementally() {
        let data = b"0123456789".to_vec();
        let expected = crc32fast::hash(&data);
        let inner = Arc::new(Fixed(data.clone()));
        let checked = ChecksummedRandomAccess::new(inner, expected, data.len() as u64, "f");

        let mut head = vec![0u8; 5];
        checked.read_at(&mut head, 0).unwrap();
        let mut tail = vec![0u8; 5];
        checked.read_at(&mut tail, 5).unwrap();
        assert_eq!(head, &data[..5]);
        assert_eq!(tail, &data[5..]);
    }

    #[test]
    fn random_access_out_of_order_partial_reads_never_verify() {
        let data = b"0123456789".to_vec();
        // Wrong CRC: if this ever got fully covered and verified, the final byte's read would fail.
        let inner = Arc::new(Fixed(data.clone()));
        let checked = ChecksummedRandomAccess::new(inner, 0x1234_5678, data.len() as u64, "f");

        let mut buf = vec![0u8; 3];
        // Reads that skip ahead of the cursor never advance it, so the stream is never fully
        // covered and the mismatch is never observed.
        checked.read_at(&mut buf, 7).unwrap();
        checked.read_at(&mut buf, 3).unwrap();
        let last = checked.read_at(&mut buf, 9).unwrap();
        assert_eq!(last, 1);
    }
}
