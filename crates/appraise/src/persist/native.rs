//! Native `.aprs` binary format.
//!
//! A fixed 32-byte [`FormatHeader`] is followed by `payload_size` bytes of
//! Postcard. The header CRC covers the payload only, so a reader can reject
//! a damaged file before decoding anything.

use std::io::{Read, Write};

use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying an appraise model file.
pub const MAGIC: &[u8; 4] = b"APRS";

/// Current format version (major).
pub const CURRENT_VERSION_MAJOR: u8 = 1;

/// Current format version (minor).
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

// ============================================================================
// Format Flags
// ============================================================================

/// Bitfield flags describing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// The model carries a fitted feature normalizer.
    pub const NORMALIZED: u16 = 1 << 0;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 32-byte header of the native format.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("APRS")
/// 4       1     Version major
/// 5       1     Version minor
/// 6       2     Flags (bitfield)
/// 8       4     Payload size (bytes)
/// 12      4     CRC32 checksum of payload
/// 16      4     Number of features
/// 20      4     Number of trees
/// 24      8     Reserved
/// ```
///
/// Multi-byte fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: FormatFlags,
    pub payload_size: u32,
    pub checksum: u32,
    pub num_features: u32,
    pub num_trees: u32,
}

impl FormatHeader {
    /// Create a header with the current version.
    pub fn new(num_features: u32, num_trees: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            flags: FormatFlags::empty(),
            payload_size: 0,
            checksum: 0,
            num_features,
            num_trees,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..20].copy_from_slice(&self.num_features.to_le_bytes());
        buf[20..24].copy_from_slice(&self.num_trees.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotAModel);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major != CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let u32_at = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        Ok(Self {
            version_major,
            version_minor,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[6], buf[7]])),
            payload_size: u32_at(8),
            checksum: u32_at(12),
            num_features: u32_at(16),
            num_trees: u32_at(20),
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload does not fit the 32-bit size field.
    #[error("payload of {0} bytes is too large")]
    TooLarge(usize),
}

/// Errors that can occur during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// Neither the native magic nor a JSON document.
    #[error("not an appraise model file")]
    NotAModel,

    #[error("unsupported format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// File was truncated or incomplete.
    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Payload decoded but is structurally invalid.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),

    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<DeserializeError> for crate::Error {
    fn from(e: DeserializeError) -> Self {
        match e {
            DeserializeError::Io(io) => crate::Error::Io(io),
            other => crate::Error::CorruptModel(other.to_string()),
        }
    }
}

impl From<SerializeError> for crate::Error {
    fn from(e: SerializeError) -> Self {
        match e {
            SerializeError::Io(io) => crate::Error::Io(io),
            other => crate::Error::CorruptModel(format!("cannot encode model: {other}")),
        }
    }
}

// ============================================================================
// CRC32 Helper
// ============================================================================

/// CRC32 checksum of `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ============================================================================
// Native Codec
// ============================================================================

/// Reads and writes the header-plus-payload framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl NativeCodec {
    pub fn new() -> Self {
        Self
    }

    /// Write header and payload. Fills in the payload size and checksum.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        header: &mut FormatHeader,
        payload: &[u8],
    ) -> Result<(), SerializeError> {
        header.payload_size =
            u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge(payload.len()))?;
        header.checksum = compute_checksum(payload);

        writer.write_all(&header.to_bytes())?;
        writer.write_all(payload)?;
        Ok(())
    }

    /// Read header and payload, verifying length and checksum.
    pub fn read_from<R: Read>(&self, reader: &mut R) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let got = read_fully(reader, &mut header_buf)?;
        if got < HEADER_SIZE {
            return Err(DeserializeError::Truncated {
                expected: HEADER_SIZE,
                actual: got,
            });
        }
        let header = FormatHeader::from_bytes(&header_buf)?;

        // The declared size is untrusted; let the buffer grow with the data.
        let expected = header.payload_size as usize;
        let mut payload = Vec::new();
        reader.by_ref().take(expected as u64).read_to_end(&mut payload)?;
        if payload.len() < expected {
            return Err(DeserializeError::Truncated {
                expected,
                actual: payload.len(),
            });
        }

        let mut extra = [0u8; 1];
        if read_fully(reader, &mut extra)? != 0 {
            return Err(DeserializeError::CorruptPayload("trailing bytes after payload".into()));
        }

        let actual = compute_checksum(&payload);
        if actual != header.checksum {
            return Err(DeserializeError::ChecksumMismatch {
                expected: header.checksum,
                actual,
            });
        }

        Ok((header, payload))
    }

    /// Encode `payload` with postcard and frame it.
    pub fn serialize<T: serde::Serialize>(
        &self,
        mut header: FormatHeader,
        payload: &T,
    ) -> Result<Vec<u8>, SerializeError> {
        let payload_bytes = postcard::to_allocvec(payload)?;
        let mut output = Vec::with_capacity(HEADER_SIZE + payload_bytes.len());
        self.write_to(&mut output, &mut header, &payload_bytes)?;
        Ok(output)
    }

    /// Unframe and decode a postcard payload.
    pub fn deserialize<T: for<'de> serde::Deserialize<'de>>(
        &self,
        bytes: &[u8],
    ) -> Result<(FormatHeader, T), DeserializeError> {
        if let Some(header_bytes) = bytes.first_chunk::<HEADER_SIZE>() {
            let header = FormatHeader::from_bytes(header_bytes)?;
            let available = bytes.len() - HEADER_SIZE;
            if header.payload_size as usize > available {
                return Err(DeserializeError::Truncated {
                    expected: header.payload_size as usize,
                    actual: available,
                });
            }
        }
        let mut cursor = std::io::Cursor::new(bytes);
        let (header, payload_bytes) = self.read_from(&mut cursor)?;
        let payload = postcard::from_bytes(&payload_bytes)?;
        Ok((header, payload))
    }
}

/// Fill `buf` as far as the reader allows; returns the number of bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FormatHeader {
            version_major: 1,
            version_minor: 2,
            flags: FormatFlags::from_bits(FormatFlags::NORMALIZED),
            payload_size: 12345,
            checksum: 0xDEADBEEF,
            num_features: 10,
            num_trees: 100,
        };

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"APRS");
        assert_eq!(&bytes[24..32], &[0u8; 8]);
        assert_eq!(FormatHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn header_wrong_magic() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BSTR");
        assert!(matches!(FormatHeader::from_bytes(&buf), Err(DeserializeError::NotAModel)));
    }

    #[test]
    fn header_unsupported_version() {
        let mut header = FormatHeader::new(10, 1);
        header.version_major = 99;
        assert!(matches!(
            FormatHeader::from_bytes(&header.to_bytes()),
            Err(DeserializeError::UnsupportedVersion { major: 99, .. })
        ));
    }

    #[test]
    fn codec_write_read_roundtrip() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(10, 3);
        let payload = b"test payload data";

        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, payload).unwrap();
        assert_eq!(buffer.len(), HEADER_SIZE + payload.len());

        let (read_header, read_payload) = codec.read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(read_header, header);
        assert_eq!(read_payload, payload);
    }

    #[test]
    fn codec_detects_corruption() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(5, 2);
        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, b"some model data").unwrap();

        buffer[HEADER_SIZE + 5] ^= 0xFF;
        assert!(matches!(
            codec.read_from(&mut buffer.as_slice()),
            Err(DeserializeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn codec_detects_truncation_and_trailing_bytes() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(5, 2);
        let mut buffer = Vec::new();
        codec.write_to(&mut buffer, &mut header, b"some model data").unwrap();

        let short = &buffer[..buffer.len() - 4];
        assert!(matches!(
            codec.read_from(&mut &short[..]),
            Err(DeserializeError::Truncated { expected: 15, actual: 11 })
        ));
        assert!(matches!(
            codec.read_from(&mut &buffer[..10]),
            Err(DeserializeError::Truncated { expected: HEADER_SIZE, actual: 10 })
        ));

        buffer.push(0);
        assert!(matches!(
            codec.read_from(&mut buffer.as_slice()),
            Err(DeserializeError::CorruptPayload(_))
        ));
    }

    #[test]
    fn oversized_payload_claim_is_truncated() {
        let codec = NativeCodec::new();
        let mut header = FormatHeader::new(10, 1);
        header.payload_size = u32::MAX;
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(b"tiny");

        assert!(matches!(
            codec.deserialize::<Vec<u8>>(&bytes),
            Err(DeserializeError::Truncated { expected, actual: 4 }) if expected == u32::MAX as usize
        ));
        assert!(matches!(
            codec.read_from(&mut bytes.as_slice()),
            Err(DeserializeError::Truncated { actual: 4, .. })
        ));
    }

    #[test]
    fn io_errors_stay_io() {
        let err: crate::Error = DeserializeError::Io(std::io::Error::other("disk")).into();
        assert!(matches!(err, crate::Error::Io(_)));
        let err: crate::Error = DeserializeError::NotAModel.into();
        assert!(matches!(err, crate::Error::CorruptModel(_)));
    }
}
