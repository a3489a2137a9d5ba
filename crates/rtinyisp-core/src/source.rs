//! Memory images supplied by the caller
//!
//! A write or verify takes either an already decoded buffer or a path to an
//! Intel HEX file. HEX decoding is delegated to the `ihex` crate; this
//! module only places records into a zero-based image.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use ihex::Record;

use crate::error::InputError;

/// Largest image a HEX file may describe
pub const MAX_IMAGE_SIZE: usize = 16 * 1024 * 1024;

/// Value of erased AVR memory, used to fill gaps between HEX records
pub const ERASED: u8 = 0xFF;

/// Where the bytes to write or verify come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySource<'a> {
    /// Raw bytes, zero-addressed
    Buffer(&'a [u8]),
    /// Intel HEX file to decode
    HexFile(&'a Path),
}

impl<'a> From<&'a [u8]> for MemorySource<'a> {
    fn from(data: &'a [u8]) -> Self {
        MemorySource::Buffer(data)
    }
}

impl<'a> From<&'a Path> for MemorySource<'a> {
    fn from(path: &'a Path) -> Self {
        MemorySource::HexFile(path)
    }
}

impl<'a> MemorySource<'a> {
    /// Produce the image bytes
    pub fn load(self) -> Result<Cow<'a, [u8]>, InputError> {
        match self {
            MemorySource::Buffer(data) => Ok(Cow::Borrowed(data)),
            MemorySource::HexFile(path) => decode_hex_file(path).map(Cow::Owned),
        }
    }
}

/// Load an optional source, failing if none was supplied
pub fn load_source(source: Option<MemorySource<'_>>) -> Result<Cow<'_, [u8]>, InputError> {
    source.ok_or(InputError::NoSource)?.load()
}

/// Read and decode an Intel HEX file
pub fn decode_hex_file(path: &Path) -> Result<Vec<u8>, InputError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => InputError::SourceNotFound(path.to_path_buf()),
        _ => InputError::Io(format!("{}: {}", path.display(), e)),
    })?;

    decode_hex(&text).map_err(|reason| InputError::MalformedSource {
        path: path.to_path_buf(),
        reason,
    })
}

/// Decode Intel HEX text into a zero-based image
///
/// Gaps between records are filled with [`ERASED`].
pub fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let mut image = Vec::new();
    let mut base_address = 0usize;

    for record in ihex::Reader::new(text) {
        let record = record.map_err(|e| e.to_string())?;
        match record {
            Record::Data { offset, value } => {
                let start = base_address + offset as usize;
                let end = start + value.len();
                if end > MAX_IMAGE_SIZE {
                    return Err(format!(
                        "data at 0x{:X} is beyond the {} byte image limit",
                        start, MAX_IMAGE_SIZE
                    ));
                }
                if image.len() < end {
                    image.resize(end, ERASED);
                }
                image[start..end].copy_from_slice(&value);
            }
            Record::ExtendedSegmentAddress(address) => {
                base_address = (address as usize) * 16;
            }
            Record::ExtendedLinearAddress(address) => {
                base_address = (address as usize) << 16;
            }
            Record::EndOfFile => break,
            Record::StartSegmentAddress { .. } | Record::StartLinearAddress(_) => (),
        }
    }

    log::trace!("Decoded HEX image of {} bytes", image.len());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // Two data records with a gap, then EOF
    const SPARSE_HEX: &str = ":0400000001020304F2\n:02000600AABB91\n:00000001FF\n";

    #[test]
    fn test_decode_places_records() {
        let image = decode_hex(SPARSE_HEX).unwrap();
        assert_eq!(image, vec![0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0xAA, 0xBB]);
    }

    #[test]
    fn test_decode_extended_segment() {
        // Segment 0x0001 -> base 0x10
        let text = ":020000020001FB\n:0100000055AA\n:00000001FF\n";
        let image = decode_hex(text).unwrap();
        assert_eq!(image.len(), 0x11);
        assert_eq!(image[0x10], 0x55);
        assert!(image[..0x10].iter().all(|&b| b == ERASED));
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        assert!(decode_hex(":0400000001020304F3\n").is_err());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let path = PathBuf::from("/nonexistent/rtinyisp/blink.hex");
        assert_eq!(
            decode_hex_file(&path),
            Err(InputError::SourceNotFound(path.clone()))
        );
    }

    #[test]
    fn test_malformed_file() {
        let path = std::env::temp_dir().join(format!("rtinyisp-bad-{}.hex", std::process::id()));
        fs::write(&path, "this is not intel hex\n").unwrap();
        let result = decode_hex_file(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(InputError::MalformedSource { .. })));
    }

    #[test]
    fn test_load_source() {
        let data = [1u8, 2, 3];
        let loaded = load_source(Some(MemorySource::from(&data[..]))).unwrap();
        assert_eq!(&*loaded, &data);
        assert_eq!(load_source(None), Err(InputError::NoSource));
    }
}
