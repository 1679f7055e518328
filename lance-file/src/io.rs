use std::fs::File;
use std::io::Write;

use arrow_buffer::{Buffer, MutableBuffer};
use bytes::Bytes;
use lance_error::{LanceResult, lance_bail};

/// Synchronous positional reads against an immutable byte source.
///
/// Reads carry no cursor state, so independent readers can share a source
/// without coordination.
pub trait ReadAt {
    /// The total size of the source in bytes.
    fn size(&self) -> LanceResult<u64>;

    /// Read exactly `len` bytes starting at `offset`.
    fn read_at(&self, offset: u64, len: u64) -> LanceResult<Bytes>;
}

impl ReadAt for Bytes {
    fn size(&self) -> LanceResult<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, offset: u64, len: u64) -> LanceResult<Bytes> {
        let end = offset.checked_add(len).ok_or_else(|| {
            lance_error::lance_err!(CorruptEncoding: "read range [{}, +{}) overflows", offset, len)
        })?;
        if end > self.len() as u64 {
            lance_bail!(
                CorruptEncoding: "read of [{}, {}) overruns buffer of {} bytes",
                offset,
                end,
                self.len()
            );
        }
        Ok(self.slice(offset as usize..end as usize))
    }
}

impl ReadAt for File {
    fn size(&self) -> LanceResult<u64> {
        Ok(self.metadata()?.len())
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, len: u64) -> LanceResult<Bytes> {
        use std::os::unix::fs::FileExt;

        let mut buf = vec![0u8; usize::try_from(len).map_err(|_| {
            lance_error::lance_err!("read of {} bytes does not fit in memory", len)
        })?];
        self.read_exact_at(&mut buf, offset)?;
        Ok(buf.into())
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, len: u64) -> LanceResult<Bytes> {
        use std::os::windows::fs::FileExt;

        let mut buf = vec![0u8; usize::try_from(len).map_err(|_| {
            lance_error::lance_err!("read of {} bytes does not fit in memory", len)
        })?];
        let mut read = 0usize;
        while read < buf.len() {
            let n = self.seek_read(&mut buf[read..], offset + read as u64)?;
            if n == 0 {
                lance_bail!(
                    CorruptEncoding: "unexpected end of file at offset {}",
                    offset + read as u64
                );
            }
            read += n;
        }
        Ok(buf.into())
    }
}

impl<R: ReadAt> ReadAt for &R {
    fn size(&self) -> LanceResult<u64> {
        (*self).size()
    }

    fn read_at(&self, offset: u64, len: u64) -> LanceResult<Bytes> {
        (*self).read_at(offset, len)
    }
}

/// Wrap raw bytes in an Arrow buffer suitably aligned for `align`-byte
/// element access, copying only when the source happens to be misaligned.
pub(crate) fn as_aligned(bytes: Bytes, align: usize) -> Buffer {
    if bytes.as_ptr().align_offset(align) == 0 {
        return Buffer::from(bytes);
    }
    log::trace!("realigning {} bytes to {}-byte alignment", bytes.len(), align);
    let mut buf = MutableBuffer::with_capacity(bytes.len());
    buf.extend_from_slice(&bytes);
    buf.into()
}

/// A `Write` adapter that tracks the absolute byte position, so the writer
/// can record chunk and footer offsets as it appends.
pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn write_all(&mut self, buf: &[u8]) -> LanceResult<()> {
        self.inner.write_all(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> LanceResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use lance_error::LanceError;

    use super::{CountingWriter, ReadAt};

    #[test]
    fn bytes_read_at() {
        let bytes = Bytes::from_static(b"hello world");
        assert_eq!(bytes.size().unwrap(), 11);
        assert_eq!(bytes.read_at(6, 5).unwrap().as_ref(), b"world");
        assert!(matches!(
            bytes.read_at(6, 6),
            Err(LanceError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn counting_writer_tracks_position() {
        let mut write = CountingWriter::new(Vec::new());
        write.write_all(b"abc").unwrap();
        write.write_all(b"de").unwrap();
        assert_eq!(write.position(), 5);
        assert_eq!(write.into_inner(), b"abcde");
    }
}
