use std::fmt;

/// Parse a human-friendly byte size such as `"6000"`, `"64 KiB"`, `"1.5mb"`
/// or `"1_048_576"`.
///
/// # Grammar
///
/// ```text
/// size      = [ "+" ] number separators? [ unit ] ;
/// number    = digits [ "." digits ] ;
/// digits    = digit , { digit | "_" } ;
/// unit      = "b" | "k" | "kb" | "kib" | "m" | "mb" | "mib"
///           | "g" | "gb" | "gib" | "t" | "tb" | "tib" ;
/// separators = { whitespace } ;
/// ```
///
/// Units are case-insensitive. Decimal units are powers of 1000, binary
/// (`*ib`) units powers of 1024, and a bare number counts bytes. Fractions
/// must come out to a whole number of bytes.
pub fn parse_size(value: &str) -> Result<u64, SizeParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    if let Some((offset, ch)) = trimmed.char_indices().find(|(_, c)| !c.is_ascii()) {
        return Err(SizeParseError::UnexpectedChar {
            index: offset,
            found: ch,
        });
    }

    let bytes = trimmed.as_bytes();
    let mut index = 0usize;

    match bytes[index] {
        b'+' => index += 1,
        b'-' => return Err(SizeParseError::Negative),
        _ => {}
    }

    let (mantissa, scale, number_len) = parse_number(bytes, index)?;
    index += number_len;

    while index < bytes.len() && bytes[index].is_ascii_whitespace() {
        index += 1;
    }

    let unit = parse_unit(trimmed, index)?;

    let pow10 = POW10
        .get(scale as usize)
        .copied()
        .ok_or(SizeParseError::FractionalBytes)?;
    let product = mantissa
        .checked_mul(unit.bytes())
        .ok_or(SizeParseError::TooLarge)?;
    if product % pow10 != 0 {
        return Err(SizeParseError::FractionalBytes);
    }

    let total = product / pow10;
    if total == 0 {
        return Err(SizeParseError::Zero);
    }

    u64::try_from(total).map_err(|_| SizeParseError::TooLarge)
}

fn parse_number(bytes: &[u8], mut index: usize) -> Result<(u128, u32, usize), SizeParseError> {
    if index >= bytes.len() || !bytes[index].is_ascii_digit() {
        return Err(SizeParseError::ExpectedNumber {
            index,
            found: bytes.get(index).map(|&b| b as char),
        });
    }

    let mut mantissa: u128 = 0;
    let mut scale: u32 = 0;
    let mut seen_decimal = false;
    let mut decimal_index = None;
    let mut consumed = 0usize;

    while index < bytes.len() {
        let byte = bytes[index];
        match byte {
            b'0'..=b'9' => {
                mantissa = mantissa
                    .checked_mul(10)
                    .and_then(|m| m.checked_add(u128::from(byte - b'0')))
                    .ok_or(SizeParseError::TooLarge)?;
                if seen_decimal {
                    scale += 1;
                }
            }
            b'_' if !seen_decimal => {}
            b'.' if !seen_decimal => {
                seen_decimal = true;
                decimal_index = Some(index);
            }
            b'.' => {
                return Err(SizeParseError::UnexpectedChar { index, found: '.' });
            }
            _ => break,
        }
        index += 1;
        consumed += 1;
    }

    if seen_decimal && scale == 0 {
        let dot_index = decimal_index.unwrap_or(index);
        return Err(SizeParseError::MissingFractionDigits { index: dot_index });
    }

    Ok((mantissa, scale, consumed))
}

fn parse_unit(original: &str, index: usize) -> Result<Unit, SizeParseError> {
    let remaining = &original[index..];
    if remaining.is_empty() {
        return Ok(Unit::Byte);
    }

    if let Some((offset, ch)) = remaining
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
    {
        return Err(SizeParseError::UnexpectedChar {
            index: index + offset,
            found: ch,
        });
    }

    let unit = match remaining.to_ascii_lowercase().as_str() {
        "b" => Unit::Byte,
        "k" | "kb" => Unit::Kilo,
        "kib" => Unit::Kibi,
        "m" | "mb" => Unit::Mega,
        "mib" => Unit::Mebi,
        "g" | "gb" => Unit::Giga,
        "gib" => Unit::Gibi,
        "t" | "tb" => Unit::Tera,
        "tib" => Unit::Tebi,
        _ => {
            return Err(SizeParseError::UnknownUnit {
                index,
                found: remaining.to_string(),
            })
        }
    };
    Ok(unit)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeParseError {
    Empty,
    ExpectedNumber { index: usize, found: Option<char> },
    UnknownUnit { index: usize, found: String },
    MissingFractionDigits { index: usize },
    FractionalBytes,
    UnexpectedChar { index: usize, found: char },
    Negative,
    Zero,
    TooLarge,
}

impl std::error::Error for SizeParseError {}

impl fmt::Display for SizeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeParseError::Empty => write!(f, "size cannot be empty"),
            SizeParseError::ExpectedNumber { index, found } => match found {
                Some(ch) => write!(
                    f,
                    "expected a number at position {} but found '{}'",
                    index + 1,
                    ch
                ),
                None => write!(f, "expected a number at position {}", index + 1),
            },
            SizeParseError::UnknownUnit { index, found } => {
                write!(f, "unknown unit '{}' at position {}", found, index + 1)
            }
            SizeParseError::MissingFractionDigits { index } => write!(
                f,
                "expected digits after decimal point at position {}",
                index + 1
            ),
            SizeParseError::FractionalBytes => {
                write!(f, "size must be a whole number of bytes")
            }
            SizeParseError::UnexpectedChar { index, found } => write!(
                f,
                "unexpected character '{}' at position {}",
                found,
                index + 1
            ),
            SizeParseError::Negative => write!(f, "size cannot be negative"),
            SizeParseError::Zero => write!(f, "size must be greater than zero"),
            SizeParseError::TooLarge => {
                write!(f, "size exceeds the maximum of {} bytes", u64::MAX)
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Unit {
    Byte,
    Kilo,
    Kibi,
    Mega,
    Mebi,
    Giga,
    Gibi,
    Tera,
    Tebi,
}

impl Unit {
    fn bytes(self) -> u128 {
        match self {
            Unit::Byte => 1,
            Unit::Kilo => 1_000,
            Unit::Kibi => 1 << 10,
            Unit::Mega => 1_000_000,
            Unit::Mebi => 1 << 20,
            Unit::Giga => 1_000_000_000,
            Unit::Gibi => 1 << 30,
            Unit::Tera => 1_000_000_000_000,
            Unit::Tebi => 1 << 40,
        }
    }
}

const POW10: [u128; 13] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
];
