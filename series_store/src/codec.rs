//! Binary layouts for records and version segments.
//!
//! ## Record layout
//! Every [`Record`] is exactly [`RECORD_LEN`] bytes, little-endian, fields in
//! declaration order:
//!
//! | offset | field | type |
//! |---|---|---|
//! | 0  | timestamp | i64 |
//! | 8  | open | f64 |
//! | 16 | high | f64 |
//! | 24 | low | f64 |
//! | 32 | close | f64 |
//! | 40 | volume | i64 |
//! | 48 | adjusted_close | f64 |
//!
//! Non-finite prices are refused on encode and treated as corruption on decode.
//!
//! ## Segment layout
//! A persisted [`Version`] is one segment:
//!
//! ```text
//! magic "OHLC" | format u8 | version_number u64 | created_at i64 (µs since epoch)
//! | metadata_len u32 | metadata (JSON) | record_count u32 | records | crc32 u32
//! ```
//!
//! The trailing CRC32 covers every preceding byte. Decoding also re-checks the
//! series invariant (strictly ascending timestamps), so a segment produced by a
//! buggy or foreign writer is rejected instead of silently reordered.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Metadata, Record};
use crate::series::Series;
use crate::version::Version;

/// Size in bytes of one encoded [`Record`].
pub const RECORD_LEN: usize = 56;

/// Leading bytes of every segment.
pub const SEGMENT_MAGIC: &[u8; 4] = b"OHLC";

/// Current segment format revision.
pub const SEGMENT_FORMAT: u8 = 1;

/// Errors raised while encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A price field holds NaN or an infinity.
    #[error("non-finite {field} at timestamp {timestamp}")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
        /// Timestamp of the offending record.
        timestamp: i64,
    },

    /// A length does not fit the fixed-width header field.
    #[error("{what} too large for segment header ({len})")]
    TooLarge {
        /// Which section overflowed.
        what: &'static str,
        /// Its length.
        len: usize,
    },

    /// Metadata could not be serialized.
    #[error("metadata serialization failed")]
    Metadata(#[source] serde_json::Error),
}

/// Errors raised while decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A record buffer is not exactly [`RECORD_LEN`] bytes.
    #[error("record length {actual}, expected {expected}")]
    Length {
        /// Required length.
        expected: usize,
        /// Length received.
        actual: usize,
    },

    /// The buffer ended before a section could be read.
    #[error("segment truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the next section requires.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Bytes left over after the checksum.
    #[error("{0} unexpected trailing bytes after segment body")]
    TrailingBytes(usize),

    /// The segment does not start with [`SEGMENT_MAGIC`].
    #[error("bad segment magic")]
    BadMagic,

    /// Segment written by an unknown format revision.
    #[error("unsupported segment format {0}")]
    UnsupportedFormat(u8),

    /// The trailing CRC32 does not match the content.
    #[error("segment checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    Checksum {
        /// Checksum found in the segment.
        stored: u32,
        /// Checksum recomputed over the content.
        computed: u32,
    },

    /// Records are not strictly ascending by timestamp.
    #[error("record {index} out of order: timestamp {timestamp} follows {previous}")]
    OutOfOrder {
        /// Position of the offending record.
        index: usize,
        /// Timestamp of the record before it.
        previous: i64,
        /// Its own timestamp.
        timestamp: i64,
    },

    /// A stored price is NaN or infinite.
    #[error("stored {field} at timestamp {timestamp} is not finite")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
        /// Timestamp of the offending record.
        timestamp: i64,
    },

    /// The creation time is outside the representable range.
    #[error("invalid created_at {0}")]
    Timestamp(i64),

    /// Metadata JSON could not be parsed.
    #[error("metadata deserialization failed")]
    Metadata(#[source] serde_json::Error),
}

/// Checks that every price field is finite.
pub fn validate_record(record: &Record) -> Result<(), EncodeError> {
    match record.price_fields().into_iter().find(|(_, v)| !v.is_finite()) {
        Some((field, _)) => Err(EncodeError::NonFinite {
            field,
            timestamp: record.timestamp,
        }),
        None => Ok(()),
    }
}

/// Encodes one record into its fixed-width layout.
pub fn encode_record(record: &Record) -> Result<[u8; RECORD_LEN], EncodeError> {
    validate_record(record)?;

    let mut out = [0u8; RECORD_LEN];
    out[0..8].copy_from_slice(&record.timestamp.to_le_bytes());
    out[8..16].copy_from_slice(&record.open.to_le_bytes());
    out[16..24].copy_from_slice(&record.high.to_le_bytes());
    out[24..32].copy_from_slice(&record.low.to_le_bytes());
    out[32..40].copy_from_slice(&record.close.to_le_bytes());
    out[40..48].copy_from_slice(&record.volume.to_le_bytes());
    out[48..56].copy_from_slice(&record.adjusted_close.to_le_bytes());
    Ok(out)
}

/// Decodes one record; `bytes` must be exactly [`RECORD_LEN`] long.
pub fn decode_record(bytes: &[u8]) -> Result<Record, DecodeError> {
    if bytes.len() != RECORD_LEN {
        return Err(DecodeError::Length {
            expected: RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let mut r = Reader::new(bytes);
    let record = Record {
        timestamp: r.i64()?,
        open: r.f64()?,
        high: r.f64()?,
        low: r.f64()?,
        close: r.f64()?,
        volume: r.i64()?,
        adjusted_close: r.f64()?,
    };

    if let Err(EncodeError::NonFinite { field, timestamp }) = validate_record(&record) {
        return Err(DecodeError::NonFinite { field, timestamp });
    }
    Ok(record)
}

/// Encodes a version into a self-checking segment.
pub fn encode_version(version: &Version) -> Result<Vec<u8>, EncodeError> {
    let metadata = serde_json::to_vec(&version.metadata).map_err(EncodeError::Metadata)?;
    let meta_len = u32::try_from(metadata.len()).map_err(|_| EncodeError::TooLarge {
        what: "metadata",
        len: metadata.len(),
    })?;
    let records = version.series.records();
    let count = u32::try_from(records.len()).map_err(|_| EncodeError::TooLarge {
        what: "record count",
        len: records.len(),
    })?;

    let mut buf =
        Vec::with_capacity(4 + 1 + 8 + 8 + 4 + metadata.len() + 4 + records.len() * RECORD_LEN + 4);
    buf.extend_from_slice(SEGMENT_MAGIC);
    buf.push(SEGMENT_FORMAT);
    buf.extend_from_slice(&version.version_number.to_le_bytes());
    buf.extend_from_slice(&version.created_at.timestamp_micros().to_le_bytes());
    buf.extend_from_slice(&meta_len.to_le_bytes());
    buf.extend_from_slice(&metadata);
    buf.extend_from_slice(&count.to_le_bytes());
    for record in records {
        buf.extend_from_slice(&encode_record(record)?);
    }

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// Decodes a segment produced by [`encode_version`].
pub fn decode_version(bytes: &[u8]) -> Result<Version, DecodeError> {
    if bytes.len() < 4 {
        return Err(DecodeError::Truncated {
            needed: 4,
            remaining: bytes.len(),
        });
    }
    let (body, crc_bytes) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes(Reader::new(crc_bytes).array::<4>()?);
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(DecodeError::Checksum { stored, computed });
    }

    let mut r = Reader::new(body);
    if r.take(SEGMENT_MAGIC.len())? != SEGMENT_MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let format = r.u8()?;
    if format != SEGMENT_FORMAT {
        return Err(DecodeError::UnsupportedFormat(format));
    }

    let version_number = r.u64()?;
    let created_micros = r.i64()?;
    let created_at: DateTime<Utc> =
        DateTime::from_timestamp_micros(created_micros).ok_or(DecodeError::Timestamp(created_micros))?;

    let meta_len = r.u32()? as usize;
    let metadata: Metadata =
        serde_json::from_slice(r.take(meta_len)?).map_err(DecodeError::Metadata)?;

    let count = r.u32()? as usize;
    let needed = count.saturating_mul(RECORD_LEN);
    if r.remaining() != needed {
        return if r.remaining() < needed {
            Err(DecodeError::Truncated {
                needed,
                remaining: r.remaining(),
            })
        } else {
            Err(DecodeError::TrailingBytes(r.remaining() - needed))
        };
    }

    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        let record = decode_record(r.take(RECORD_LEN)?)?;
        if let Some(prev) = records.last().map(|p: &Record| p.timestamp) {
            if record.timestamp <= prev {
                return Err(DecodeError::OutOfOrder {
                    index,
                    previous: prev,
                    timestamp: record.timestamp,
                });
            }
        }
        records.push(record);
    }

    Ok(Version {
        version_number,
        series: Series::from_sorted_unchecked(records),
        metadata,
        created_at,
    })
}

/// Bounds-checked little-endian cursor over a byte slice.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_le_bytes(self.array()?))
    }
}
