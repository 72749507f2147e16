use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};

use crate::error::ErrorKind;

/// Text encodings accepted by `readAsText`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Ascii,
}

impl FromStr for TextEncoding {
    type Err = ErrorKind;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            "latin1" | "binary" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            _ => Err(ErrorKind::Encoding),
        }
    }
}

impl TextEncoding {
    /// Decode bytes. Invalid UTF-8 is replaced, never rejected.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => binary_string(bytes),
            TextEncoding::Ascii => bytes.iter().map(|&b| char::from(b & 0x7f)).collect(),
        }
    }
}

/// One char per byte, U+0000 to U+00FF
pub fn binary_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_labels() {
        assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("utf8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("binary".parse::<TextEncoding>(), Ok(TextEncoding::Latin1));
        assert_eq!("ebcdic".parse::<TextEncoding>(), Err(ErrorKind::Encoding));
    }

    #[test]
    fn test_decode_variants() {
        let bytes = [0x68, 0xC3, 0xA9, 0xFF];
        assert_eq!(TextEncoding::Utf8.decode(&bytes[..3]), "hé");
        assert_eq!(TextEncoding::Utf8.decode(&bytes), "hé\u{FFFD}");
        assert_eq!(TextEncoding::Latin1.decode(&bytes), "h\u{C3}\u{A9}\u{FF}");
        assert_eq!(TextEncoding::Ascii.decode(&[0x41, 0xC1]), "AA");
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url("text/plain", b"hi"), "data:text/plain;base64,aGk=");
        assert_eq!(data_url("application/octet-stream", b""), "data:application/octet-stream;base64,");
    }
}
