//! Transparent decompression of metadata files
//!
//! The compression is chosen by magic bytes, never by file name:
//! `synthesis.hdlist.cz` is gzip on older media and xz on newer ones.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::debug;
use xz2::bufread::XzDecoder;

use crate::parser::traits::ParseError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const XZ_MAGIC: [u8; 6] = [0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Open a metadata file for line reading
pub fn open_metadata(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let file = File::open(path)?;
    wrap_reader(BufReader::new(file))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Gzip,
    Xz,
    Zstd,
    Text,
    Binary(u8),
}

fn detect(head: &[u8]) -> Format {
    if head.starts_with(&GZIP_MAGIC) {
        Format::Gzip
    } else if head.starts_with(&XZ_MAGIC) {
        Format::Xz
    } else if head.starts_with(&ZSTD_MAGIC) {
        Format::Zstd
    } else if let Some(&byte) = head.iter().find(|&&b| is_binary(b)) {
        Format::Binary(byte)
    } else {
        Format::Text
    }
}

fn is_binary(byte: u8) -> bool {
    byte.is_ascii_control() && !matches!(byte, b'\t' | b'\n' | b'\r')
}

/// Wrap an already opened stream, decompressing gzip, xz or zstd.
///
/// Uncompressed input must look like text; anything else is rejected so
/// an unknown format is never cached as an empty source.
pub fn wrap_reader<R: BufRead + 'static>(mut reader: R) -> Result<Box<dyn BufRead>, ParseError> {
    let format = detect(reader.fill_buf()?);
    debug!("Metadata format: {:?}", format);

    match format {
        Format::Gzip => Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader)))),
        Format::Xz => Ok(Box::new(BufReader::new(XzDecoder::new_multi_decoder(
            reader,
        )))),
        Format::Zstd => {
            let decoder = zstd::stream::read::Decoder::with_buffer(reader)?;
            Ok(Box::new(BufReader::new(decoder)))
        }
        Format::Text => Ok(Box::new(reader)),
        Format::Binary(byte) => Err(ParseError::UnsupportedFormat(format!(
            "unrecognized binary data (byte {byte:#04x} near the start)"
        ))),
    }
}
