use std::ops::Range;
use std::sync::Arc;

use lance_dtype::{DType, Nullability, PType, Schema};
use lance_error::{LanceError, LanceResult, lance_bail, lance_err};

use crate::{MAGIC_BYTES, TRAILER_SIZE, VERSION};

/// How a chunk's payload bytes are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncodingKind {
    /// Fixed-width values packed raw little-endian.
    Plain = 0,
    /// An i32 offsets array followed by concatenated value bytes.
    VarBin = 1,
}

impl TryFrom<u8> for EncodingKind {
    type Error = LanceError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Plain),
            1 => Ok(Self::VarBin),
            _ => Err(lance_err!(CorruptEncoding: "unknown encoding kind {}", value)),
        }
    }
}

/// The location and row coverage of one encoded chunk within a file.
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    /// Which column the chunk belongs to, by schema field index.
    pub column_index: u32,
    /// The first row covered by the chunk.
    pub row_start: u64,
    /// One past the last row covered by the chunk.
    pub row_end: u64,
    /// The chunk's absolute byte offset in the file.
    pub byte_offset: u64,
    /// The chunk's encoded length in bytes.
    pub byte_length: u64,
    /// The payload encoding.
    pub encoding: EncodingKind,
}

impl ChunkSpec {
    /// The number of rows the chunk covers.
    pub fn row_count(&self) -> u64 {
        self.row_end - self.row_start
    }

    /// The chunk's byte range within the file.
    pub fn byte_range(&self) -> Range<u64> {
        self.byte_offset..self.byte_offset + self.byte_length
    }
}

/// The trailing metadata block describing a file's schema and chunk layout.
///
/// Built incrementally in memory while writing, serialized once at commit,
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Footer {
    schema: Schema,
    row_count: u64,
    chunks: Arc<[ChunkSpec]>,
}

impl Footer {
    pub(crate) fn new(schema: Schema, row_count: u64, chunks: Arc<[ChunkSpec]>) -> Self {
        Self {
            schema,
            row_count,
            chunks,
        }
    }

    /// The file's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The total number of rows in the file.
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// All chunk descriptors, in the order they were written.
    pub fn chunks(&self) -> &Arc<[ChunkSpec]> {
        &self.chunks
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_schema(&mut buf, &self.schema);
        buf.extend_from_slice(&self.row_count.to_le_bytes());
        buf.extend_from_slice(&(self.chunks.len() as u32).to_le_bytes());
        for chunk in self.chunks.iter() {
            buf.extend_from_slice(&chunk.column_index.to_le_bytes());
            buf.extend_from_slice(&chunk.row_start.to_le_bytes());
            buf.extend_from_slice(&chunk.row_end.to_le_bytes());
            buf.extend_from_slice(&chunk.byte_offset.to_le_bytes());
            buf.extend_from_slice(&chunk.byte_length.to_le_bytes());
            buf.push(chunk.encoding as u8);
        }
        buf
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> LanceResult<Self> {
        let mut reader = FooterReader::new(bytes);
        let schema = read_schema(&mut reader)?;
        let row_count = reader.u64()?;
        let chunk_count = reader.u32()? as usize;
        let mut chunks = Vec::with_capacity(chunk_count);
        for _ in 0..chunk_count {
            let column_index = reader.u32()?;
            let row_start = reader.u64()?;
            let row_end = reader.u64()?;
            if row_end < row_start {
                lance_bail!(
                    CorruptEncoding: "chunk row range [{}, {}) for column {} is inverted",
                    row_start,
                    row_end,
                    column_index
                );
            }
            chunks.push(ChunkSpec {
                column_index,
                row_start,
                row_end,
                byte_offset: reader.u64()?,
                byte_length: reader.u64()?,
                encoding: EncodingKind::try_from(reader.u8()?)?,
            });
        }
        if !reader.is_exhausted() {
            lance_bail!(
                CorruptEncoding: "{} unexpected trailing bytes after the footer",
                reader.remaining()
            );
        }
        Ok(Self {
            schema,
            row_count,
            chunks: chunks.into(),
        })
    }
}

const DTYPE_TAG_PRIMITIVE: u8 = 0;
const DTYPE_TAG_UTF8: u8 = 1;
const DTYPE_TAG_BINARY: u8 = 2;

fn write_schema(buf: &mut Vec<u8>, schema: &Schema) {
    buf.extend_from_slice(&(schema.field_count() as u16).to_le_bytes());
    for (name, dtype) in schema.iter() {
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        let (tag, ptype) = match dtype {
            DType::Primitive(ptype, _) => (DTYPE_TAG_PRIMITIVE, ptype as u8),
            DType::Utf8(_) => (DTYPE_TAG_UTF8, 0),
            DType::Binary(_) => (DTYPE_TAG_BINARY, 0),
        };
        buf.push(tag);
        buf.push(ptype);
        buf.push(dtype.is_nullable() as u8);
    }
}

fn read_schema(reader: &mut FooterReader<'_>) -> LanceResult<Schema> {
    let field_count = reader.u16()? as usize;
    let mut fields = Vec::with_capacity(field_count);
    for idx in 0..field_count {
        let name_len = reader.u16()? as usize;
        let name = std::str::from_utf8(reader.take(name_len)?)
            .map_err(|_| lance_err!(CorruptEncoding: "field {} name is not UTF-8", idx))?
            .to_string();
        let tag = reader.u8()?;
        let ptype = reader.u8()?;
        let nullability = Nullability::from(reader.u8()? != 0);
        let dtype = match tag {
            DTYPE_TAG_PRIMITIVE => DType::Primitive(PType::try_from(ptype)?, nullability),
            DTYPE_TAG_UTF8 => DType::Utf8(nullability),
            DTYPE_TAG_BINARY => DType::Binary(nullability),
            _ => lance_bail!(CorruptEncoding: "field {} has unknown type tag {}", idx, tag),
        };
        fields.push((name.into(), dtype));
    }
    Ok(Schema::from_iter(fields))
}

/// A bounds-checked little-endian cursor over serialized footer bytes.
struct FooterReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FooterReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> LanceResult<&'a [u8]> {
        if self.pos + len > self.buf.len() {
            lance_bail!(
                CorruptEncoding: "footer truncated: needed {} bytes at offset {}, {} remain",
                len,
                self.pos,
                self.buf.len() - self.pos
            );
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self) -> LanceResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> LanceResult<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().map_err(
            |_| lance_err!(CorruptEncoding: "footer read of u16 failed"),
        )?))
    }

    fn u32(&mut self) -> LanceResult<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().map_err(
            |_| lance_err!(CorruptEncoding: "footer read of u32 failed"),
        )?))
    }

    fn u64(&mut self) -> LanceResult<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().map_err(
            |_| lance_err!(CorruptEncoding: "footer read of u64 failed"),
        )?))
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// The fixed-size block at the very end of every file, pointing at the
/// footer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Trailer {
    pub footer_offset: u64,
    pub footer_length: u64,
}

impl Trailer {
    pub fn to_bytes(self) -> [u8; TRAILER_SIZE as usize] {
        let mut buf = [0u8; TRAILER_SIZE as usize];
        buf[0..4].copy_from_slice(&MAGIC_BYTES);
        buf[4..8].copy_from_slice(&VERSION.to_le_bytes());
        buf[8..16].copy_from_slice(&self.footer_offset.to_le_bytes());
        buf[16..24].copy_from_slice(&self.footer_length.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> LanceResult<Self> {
        if bytes.len() != TRAILER_SIZE as usize {
            lance_bail!(
                NotALanceFile: "trailer must be {} bytes, got {}",
                TRAILER_SIZE,
                bytes.len()
            );
        }
        if bytes[0..4] != MAGIC_BYTES {
            lance_bail!(
                NotALanceFile: "bad magic marker {:02x?} in trailer",
                &bytes[0..4]
            );
        }
        let version = u32::from_le_bytes(
            bytes[4..8]
                .try_into()
                .map_err(|_| lance_err!(NotALanceFile: "trailer version read failed"))?,
        );
        if version != VERSION {
            lance_bail!(
                UnsupportedVersion: "file is version {}, this build reads version {}",
                version,
                VERSION
            );
        }
        Ok(Self {
            footer_offset: u64::from_le_bytes(
                bytes[8..16]
                    .try_into()
                    .map_err(|_| lance_err!(NotALanceFile: "trailer offset read failed"))?,
            ),
            footer_length: u64::from_le_bytes(
                bytes[16..24]
                    .try_into()
                    .map_err(|_| lance_err!(NotALanceFile: "trailer length read failed"))?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use lance_dtype::{DType, Nullability, PType, Schema};
    use lance_error::LanceError;

    use super::{ChunkSpec, EncodingKind, Footer, Trailer};

    fn test_footer() -> Footer {
        let schema = Schema::from_iter([
            (
                "id".into(),
                DType::Primitive(PType::I64, Nullability::NonNullable),
            ),
            ("name".into(), DType::Utf8(Nullability::Nullable)),
            ("blob".into(), DType::Binary(Nullability::NonNullable)),
        ]);
        Footer::new(
            schema,
            7,
            vec![
                ChunkSpec {
                    column_index: 0,
                    row_start: 0,
                    row_end: 7,
                    byte_offset: 4,
                    byte_length: 56,
                    encoding: EncodingKind::Plain,
                },
                ChunkSpec {
                    column_index: 1,
                    row_start: 0,
                    row_end: 7,
                    byte_offset: 60,
                    byte_length: 90,
                    encoding: EncodingKind::VarBin,
                },
            ]
            .into(),
        )
    }

    #[test]
    fn footer_round_trip() {
        let footer = test_footer();
        let decoded = Footer::from_bytes(&footer.to_bytes()).unwrap();
        assert_eq!(decoded.schema(), footer.schema());
        assert_eq!(decoded.row_count(), 7);
        assert_eq!(decoded.chunks().len(), 2);
        assert_eq!(decoded.chunks()[1].byte_range(), 60..150);
        assert_eq!(decoded.chunks()[1].encoding, EncodingKind::VarBin);
    }

    #[test]
    fn truncated_footer() {
        let bytes = test_footer().to_bytes();
        let err = Footer::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, LanceError::CorruptEncoding(_)));
    }

    #[test]
    fn trailer_round_trip() {
        let trailer = Trailer {
            footer_offset: 1234,
            footer_length: 99,
        };
        let decoded = Trailer::from_bytes(&trailer.to_bytes()).unwrap();
        assert_eq!(decoded.footer_offset, 1234);
        assert_eq!(decoded.footer_length, 99);
    }

    #[test]
    fn trailer_rejects_bad_magic_and_version() {
        let trailer = Trailer {
            footer_offset: 0,
            footer_length: 0,
        };
        let mut bytes = trailer.to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Trailer::from_bytes(&bytes),
            Err(LanceError::NotALanceFile(_))
        ));

        let mut bytes = trailer.to_bytes();
        bytes[4..8].copy_from_slice(&9u32.to_le_bytes());
        assert!(matches!(
            Trailer::from_bytes(&bytes),
            Err(LanceError::UnsupportedVersion(_))
        ));
    }
}
