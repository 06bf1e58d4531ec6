// crates/ethercat-esi/src/utils.rs

//! Formatting and parsing helpers shared by the deriver, synthesizer and builder.

/// Formats a value as an ESI hex literal (`#x1A00`), uppercase, without padding.
pub fn format_esi_hex(value: impl Into<u64>) -> String {
    format!("#x{:X}", value.into())
}

/// Parses a number literal: hexadecimal if it contains an `x` (digits after
/// the `x`), decimal otherwise.
pub fn parse_number(s: &str) -> Option<u64> {
    let trimmed = s.trim();
    match trimmed.rfind(['x', 'X']) {
        Some(pos) => u64::from_str_radix(&trimmed[pos + 1..], 16).ok(),
        None => trimmed.parse().ok(),
    }
}

/// Rounds a bit count up to the next multiple of 16.
pub fn align16(bits: u32) -> u32 {
    bits.div_ceil(16) * 16
}

/// Number of whole bytes needed for `bits`.
pub fn byte_width(bits: u32) -> usize {
    bits.div_ceil(8) as usize
}

/// Zero-filled hex default of the given byte width.
pub fn zero_fill(bytes: usize) -> String {
    "00".repeat(bytes)
}

/// Normalizes a hex byte string default: strips a `0x`/`#x` prefix, upper-cases
/// the digits and left-pads with zeros to `bytes` bytes.
///
/// Values longer than the width are kept as-is.
pub fn normalize_hex_data(value: &str, bytes: usize) -> String {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .or_else(|| trimmed.strip_prefix("#x"))
        .unwrap_or(trimmed)
        .to_ascii_uppercase();

    let mut width = bytes * 2;
    if digits.len() > width {
        log::warn!(
            "Default value '{}' is wider than its {}-byte type",
            value,
            bytes
        );
        width = digits.len() + digits.len() % 2;
    }
    format!("{:0>width$}", digits, width = width)
}

/// ASCII-hex encodes a string default (`"Acme"` -> `"41636D65"`).
pub fn ascii_hex(text: &str) -> String {
    hex::encode_upper(text.as_bytes())
}
