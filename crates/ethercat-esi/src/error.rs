// crates/ethercat-esi/src/error.rs

use hex::FromHexError;
use quick_xml::Error as XmlError;
use std::fmt;
use std::io;

/// Errors that can occur while loading, compiling or publishing a device description.
#[derive(Debug)]
pub enum EsiError {
    /// An error from the underlying `quick-xml` writer.
    Xml(XmlError),

    /// An I/O error (writer buffer, setup file or publish target).
    Io(io::Error),

    /// The persisted setup could not be (de)serialized.
    Json(serde_json::Error),

    /// The EEPROM ConfigData string contained invalid hex.
    HexParsing(FromHexError),

    /// A numeric field of the persisted setup could not be parsed.
    InvalidNumber { field: &'static str, value: String },

    /// An object could not be constructed from its sub-items.
    InvalidObject { index: u16, reason: &'static str },

    /// Two objects share one dictionary index.
    DuplicateIndex { index: u16 },

    /// `close_element` was called with no open element.
    UnbalancedElement,

    /// `attribute` was called after the element's content had started.
    AttributeOutsideElement { attribute: String },

    /// No device with the given name exists in the setup.
    DeviceNotFound(String),

    /// The SII image content does not fit the configured EEPROM size.
    EepromOverflow { needed: usize, size: usize },

    /// An SII image could not be decoded at the given byte offset.
    InvalidSii { offset: usize, reason: &'static str },
}

impl From<XmlError> for EsiError {
    fn from(e: XmlError) -> Self {
        EsiError::Xml(e)
    }
}

impl From<io::Error> for EsiError {
    fn from(e: io::Error) -> Self {
        EsiError::Io(e)
    }
}

impl From<serde_json::Error> for EsiError {
    fn from(e: serde_json::Error) -> Self {
        EsiError::Json(e)
    }
}

impl From<FromHexError> for EsiError {
    fn from(e: FromHexError) -> Self {
        EsiError::HexParsing(e)
    }
}

impl fmt::Display for EsiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EsiError::Xml(e) => write!(f, "XML writing error: {}", e),
            EsiError::Io(e) => write!(f, "I/O error: {}", e),
            EsiError::Json(e) => write!(f, "Setup (de)serialization error: {}", e),
            EsiError::HexParsing(e) => write!(f, "Hex parsing error: {}", e),
            EsiError::InvalidNumber { field, value } => {
                write!(f, "Invalid number for {}: '{}'", field, value)
            }
            EsiError::InvalidObject { index, reason } => {
                write!(f, "Invalid object 0x{:04X}: {}", index, reason)
            }
            EsiError::DuplicateIndex { index } => {
                write!(f, "Duplicate object index 0x{:04X} in dictionary", index)
            }
            EsiError::UnbalancedElement => write!(f, "Close requested with no open element"),
            EsiError::AttributeOutsideElement { attribute } => write!(
                f,
                "Attribute '{}' written after element content started",
                attribute
            ),
            EsiError::DeviceNotFound(name) => write!(f, "No device named '{}' in setup", name),
            EsiError::EepromOverflow { needed, size } => write!(
                f,
                "SII image needs {} bytes but the EEPROM holds {}",
                needed, size
            ),
            EsiError::InvalidSii { offset, reason } => {
                write!(f, "Invalid SII image at byte 0x{:04X}: {}", offset, reason)
            }
        }
    }
}

impl std::error::Error for EsiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EsiError::Xml(e) => Some(e),
            EsiError::Io(e) => Some(e),
            EsiError::Json(e) => Some(e),
            EsiError::HexParsing(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EsiError;
    use std::error::Error;

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let esi_err: EsiError = io_err.into();
        assert!(matches!(esi_err, EsiError::Io(_)));
        assert!(esi_err.source().is_some());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let esi_err: EsiError = json_err.into();
        assert!(matches!(esi_err, EsiError::Json(_)));
    }

    #[test]
    fn test_from_hex_error() {
        let hex_err = hex::decode("Z").unwrap_err();
        let esi_err: EsiError = hex_err.into();
        assert!(matches!(esi_err, EsiError::HexParsing(_)));
    }

    #[test]
    fn test_display_duplicate_index() {
        let err = EsiError::DuplicateIndex { index: 0x6010 };
        assert_eq!(
            err.to_string(),
            "Duplicate object index 0x6010 in dictionary"
        );
    }

    #[test]
    fn test_display_invalid_sii() {
        let err = EsiError::InvalidSii {
            offset: 0x80,
            reason: "category runs past the end of the image",
        };
        assert_eq!(
            err.to_string(),
            "Invalid SII image at byte 0x0080: category runs past the end of the image"
        );
        assert!(err.source().is_none());
    }
}
