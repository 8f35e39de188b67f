//! IEEE 488.2 definite-length arbitrary block framing.
//!
//! Binary replies (waveform data, screenshots) arrive as
//! `#<n><n length digits><payload><terminator>`, e.g. `#9000001200....\n`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("Block does not start with '#'")]
    MissingHash,

    #[error("Invalid header digit count {0:?}")]
    BadDigitCount(Option<u8>),

    #[error("Invalid block length field {0:?}")]
    BadLength(String),

    #[error("Block truncated: header declares {expected} payload bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("{0} unexpected bytes after the block payload")]
    TrailingBytes(usize),
}

/// Largest possible header plus terminator, `#9nnnnnnnnn` and `\r\n`.
pub const MAX_FRAMING_BYTES: usize = 2 + 9 + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Bytes taken by `#`, the digit count and the length digits.
    pub header_len: usize,
    pub payload_len: usize,
}

/// Number of length digits announced by the first two bytes of a block.
pub fn header_digit_count(raw: &[u8]) -> Result<usize, BlockError> {
    match raw.first() {
        Some(b'#') => {}
        _ => return Err(BlockError::MissingHash),
    }
    match raw.get(1) {
        Some(d @ b'1'..=b'9') => Ok(usize::from(d - b'0')),
        other => Err(BlockError::BadDigitCount(other.copied())),
    }
}

pub fn parse_header(raw: &[u8]) -> Result<BlockHeader, BlockError> {
    let digits = header_digit_count(raw)?;
    let header_len = 2 + digits;
    let field = raw
        .get(2..header_len)
        .ok_or_else(|| BlockError::BadLength(String::from_utf8_lossy(&raw[2..]).into_owned()))?;

    if !field.iter().all(u8::is_ascii_digit) {
        return Err(BlockError::BadLength(
            String::from_utf8_lossy(field).into_owned(),
        ));
    }
    let payload_len = field
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'));

    Ok(BlockHeader {
        header_len,
        payload_len,
    })
}

/// Validate a complete block reply and return its payload.
///
/// A trailing `\n` or `\r\n` terminator is accepted, anything else after the
/// declared payload is an error.
pub fn parse_block(raw: &[u8]) -> Result<&[u8], BlockError> {
    let header = parse_header(raw)?;
    let body = &raw[header.header_len..];
    if body.len() < header.payload_len {
        return Err(BlockError::Truncated {
            expected: header.payload_len,
            actual: body.len(),
        });
    }

    let (payload, rest) = body.split_at(header.payload_len);
    match rest {
        [] | [b'\n'] | [b'\r', b'\n'] => Ok(payload),
        _ => Err(BlockError::TrailingBytes(rest.len())),
    }
}

/// Frame `payload` as a terminated definite-length block.
pub fn encode_block(payload: &[u8]) -> Vec<u8> {
    let length = payload.len().to_string();
    let mut block = Vec::with_capacity(payload.len() + length.len() + 3);
    block.push(b'#');
    block.extend_from_slice(length.len().to_string().as_bytes());
    block.extend_from_slice(length.as_bytes());
    block.extend_from_slice(payload);
    block.push(b'\n');
    block
}
