//! Recursive Length Prefix (RLP) codec.
//!
//! Encodes byte strings and nested lists canonically, and decodes strictly:
//! truncated input, trailing bytes and non-minimal length prefixes are errors.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors while decoding RLP or the hex that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Empty RLP input")]
    Empty,

    #[error("Truncated RLP: item needs {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("RLP item consumed {consumed} of {total} bytes")]
    TrailingBytes { consumed: usize, total: usize },

    #[error("Non-canonical RLP: {reason}")]
    NonCanonical { reason: &'static str },

    #[error("Expected an RLP byte string, got a list")]
    UnexpectedList,

    #[error("Expected an RLP list, got a byte string")]
    UnexpectedString,

    #[error("Invalid hex: {reason}")]
    InvalidHex { reason: String },

    #[error("Invalid length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("RLP lists nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Deepest list nesting [`decode`] accepts. Trie nodes and headers stay far below it.
pub const MAX_DEPTH: usize = 32;

/// A decoded RLP value: either a byte string or a list of values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RlpItem {
    Bytes(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// An integer as its minimal big-endian byte string (zero is empty).
    pub fn uint(value: u64) -> Self {
        RlpItem::Bytes(trim_leading_zeros(&value.to_be_bytes()).to_vec())
    }

    pub fn u256(value: U256) -> Self {
        RlpItem::Bytes(trim_leading_zeros(&value.to_be_bytes::<32>()).to_vec())
    }

    pub fn as_bytes(&self) -> Result<&[u8], DecodeError> {
        match self {
            RlpItem::Bytes(bytes) => Ok(bytes),
            RlpItem::List(_) => Err(DecodeError::UnexpectedList),
        }
    }

    pub fn as_list(&self) -> Result<&[RlpItem], DecodeError> {
        match self {
            RlpItem::List(items) => Ok(items),
            RlpItem::Bytes(_) => Err(DecodeError::UnexpectedString),
        }
    }
}

// --- Encoding ---

const STRING_OFFSET: u8 = 0x80;
const LIST_OFFSET: u8 = 0xc0;

/// Encode an item tree.
pub fn encode(item: &RlpItem) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(item, &mut out);
    out
}

fn encode_into(item: &RlpItem, out: &mut Vec<u8>) {
    match item {
        RlpItem::Bytes(bytes) => write_bytes(bytes, out),
        RlpItem::List(items) => {
            let mut payload = Vec::new();
            for item in items {
                encode_into(item, &mut payload);
            }
            write_header(LIST_OFFSET, payload.len(), out);
            out.extend_from_slice(&payload);
        }
    }
}

/// Encode a single byte string.
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 9);
    write_bytes(bytes, &mut out);
    out
}

/// Encode an integer as a minimal big-endian byte string.
pub fn encode_uint(value: u64) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(&value.to_be_bytes()))
}

pub fn encode_u256(value: U256) -> Vec<u8> {
    encode_bytes(trim_leading_zeros(&value.to_be_bytes::<32>()))
}

/// Wrap already-encoded items in a list header.
pub fn encode_list(encoded_items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = encoded_items.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(payload_len + 9);
    write_header(LIST_OFFSET, payload_len, &mut out);
    for item in encoded_items {
        out.extend_from_slice(item);
    }
    out
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    if bytes.len() == 1 && bytes[0] < STRING_OFFSET {
        out.push(bytes[0]);
        return;
    }
    write_header(STRING_OFFSET, bytes.len(), out);
    out.extend_from_slice(bytes);
}

fn write_header(offset: u8, payload_len: usize, out: &mut Vec<u8>) {
    if payload_len <= 55 {
        out.push(offset + payload_len as u8);
    } else {
        let len_bytes = (payload_len as u64).to_be_bytes();
        let len_bytes = trim_leading_zeros(&len_bytes);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(len_bytes);
    }
}

pub(crate) fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

// --- Decoding ---

/// Location of one item's payload within its encoding.
#[derive(Clone, Copy, Debug)]
struct ItemHeader {
    list: bool,
    payload_offset: usize,
    payload_len: usize,
}

impl ItemHeader {
    fn total_len(&self) -> usize {
        self.payload_offset + self.payload_len
    }
}

fn decode_header(data: &[u8]) -> Result<ItemHeader, DecodeError> {
    let prefix = *data.first().ok_or(DecodeError::Empty)?;

    let header = match prefix {
        0x00..=0x7f => ItemHeader {
            list: false,
            payload_offset: 0,
            payload_len: 1,
        },
        0x80..=0xb7 => {
            let payload_len = (prefix - STRING_OFFSET) as usize;
            if payload_len == 1 && data.len() > 1 && data[1] < STRING_OFFSET {
                return Err(DecodeError::NonCanonical {
                    reason: "single byte below 0x80 must encode as itself",
                });
            }
            ItemHeader {
                list: false,
                payload_offset: 1,
                payload_len,
            }
        }
        0xb8..=0xbf => {
            let len_of_len = (prefix - 0xb7) as usize;
            ItemHeader {
                list: false,
                payload_offset: 1 + len_of_len,
                payload_len: read_long_length(data, len_of_len)?,
            }
        }
        0xc0..=0xf7 => ItemHeader {
            list: true,
            payload_offset: 1,
            payload_len: (prefix - LIST_OFFSET) as usize,
        },
        0xf8..=0xff => {
            let len_of_len = (prefix - 0xf7) as usize;
            ItemHeader {
                list: true,
                payload_offset: 1 + len_of_len,
                payload_len: read_long_length(data, len_of_len)?,
            }
        }
    };

    let needed = header
        .payload_offset
        .checked_add(header.payload_len)
        .ok_or(DecodeError::NonCanonical {
            reason: "length prefix overflows",
        })?;
    if data.len() < needed {
        return Err(DecodeError::Truncated {
            needed,
            available: data.len(),
        });
    }
    Ok(header)
}

fn read_long_length(data: &[u8], len_of_len: usize) -> Result<usize, DecodeError> {
    if data.len() < 1 + len_of_len {
        return Err(DecodeError::Truncated {
            needed: 1 + len_of_len,
            available: data.len(),
        });
    }
    let len_bytes = &data[1..1 + len_of_len];
    if len_bytes[0] == 0 {
        return Err(DecodeError::NonCanonical {
            reason: "length prefix has a leading zero",
        });
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(DecodeError::NonCanonical {
            reason: "length prefix overflows",
        });
    }
    let length = len_bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);
    if length <= 55 {
        return Err(DecodeError::NonCanonical {
            reason: "long form used for a payload of 55 bytes or less",
        });
    }
    Ok(length)
}

/// Decode a complete RLP encoding into an item tree.
/// The encoding must be consumed exactly.
pub fn decode(data: &[u8]) -> Result<RlpItem, DecodeError> {
    let (item, consumed) = decode_item(data, 0)?;
    if consumed != data.len() {
        return Err(DecodeError::TrailingBytes {
            consumed,
            total: data.len(),
        });
    }
    Ok(item)
}

fn decode_item(data: &[u8], depth: usize) -> Result<(RlpItem, usize), DecodeError> {
    let header = decode_header(data)?;
    let payload = &data[header.payload_offset..header.total_len()];

    if !header.list {
        return Ok((RlpItem::Bytes(payload.to_vec()), header.total_len()));
    }
    if depth >= MAX_DEPTH {
        return Err(DecodeError::TooDeep { limit: MAX_DEPTH });
    }

    let mut items = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let (item, consumed) = decode_item(&payload[offset..], depth + 1)?;
        items.push(item);
        offset += consumed;
    }
    Ok((RlpItem::List(items), header.total_len()))
}

/// Split an RLP list into the raw encodings of its items, without decoding them.
pub fn split_list(data: &[u8]) -> Result<Vec<&[u8]>, DecodeError> {
    let header = decode_header(data)?;
    if !header.list {
        return Err(DecodeError::UnexpectedString);
    }
    if header.total_len() != data.len() {
        return Err(DecodeError::TrailingBytes {
            consumed: header.total_len(),
            total: data.len(),
        });
    }

    let payload = &data[header.payload_offset..];
    let mut items = Vec::new();
    let mut offset = 0;
    while offset < payload.len() {
        let item = decode_header(&payload[offset..])?;
        items.push(&payload[offset..offset + item.total_len()]);
        offset += item.total_len();
    }
    Ok(items)
}

/// Return the payload of a complete byte-string encoding.
pub fn decode_bytes(data: &[u8]) -> Result<&[u8], DecodeError> {
    let header = decode_header(data)?;
    if header.list {
        return Err(DecodeError::UnexpectedList);
    }
    if header.total_len() != data.len() {
        return Err(DecodeError::TrailingBytes {
            consumed: header.total_len(),
            total: data.len(),
        });
    }
    Ok(&data[header.payload_offset..])
}

/// Decode a canonical big-endian integer payload (no leading zero, at most 32 bytes).
pub fn decode_u256(payload: &[u8]) -> Result<U256, DecodeError> {
    if payload.len() > 32 {
        return Err(DecodeError::InvalidLength {
            expected: 32,
            got: payload.len(),
        });
    }
    if payload.first() == Some(&0) {
        return Err(DecodeError::NonCanonical {
            reason: "integer has a leading zero byte",
        });
    }
    Ok(U256::from_be_slice(payload))
}

/// Whether the first byte of an encoding announces a list.
pub fn is_list(data: &[u8]) -> bool {
    matches!(data.first(), Some(&prefix) if prefix >= LIST_OFFSET)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hex_literal::hex;

    fn bytes(data: &[u8]) -> RlpItem {
        RlpItem::Bytes(data.to_vec())
    }

    /// An empty list wrapped in `depth` further lists, built without recursion.
    pub(crate) fn nested_lists(depth: usize) -> Vec<u8> {
        let mut headers = Vec::with_capacity(depth);
        let mut len = 1;
        for _ in 0..depth {
            let mut header = Vec::new();
            write_header(LIST_OFFSET, len, &mut header);
            len += header.len();
            headers.push(header);
        }
        let mut out = Vec::with_capacity(len);
        for header in headers.iter().rev() {
            out.extend_from_slice(header);
        }
        out.push(LIST_OFFSET);
        out
    }

    #[test]
    fn test_nesting_depth_is_capped() {
        // MAX_DEPTH levels in total decode
        let deepest = nested_lists(MAX_DEPTH - 1);
        assert_eq!(encode(&decode(&deepest).unwrap()), deepest);

        assert_eq!(
            decode(&nested_lists(MAX_DEPTH)),
            Err(DecodeError::TooDeep { limit: MAX_DEPTH })
        );
        // Far too deep to recurse through: still an error, not an abort.
        let hostile = nested_lists(200_000);
        assert!(hostile.len() > 700_000);
        assert_eq!(
            decode(&hostile),
            Err(DecodeError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn test_encode_short_strings() {
        assert_eq!(encode_bytes(b"dog"), hex!("83646f67"));
        assert_eq!(encode_bytes(&[]), hex!("80"));
        assert_eq!(encode_bytes(&[0x0f]), hex!("0f"));
        assert_eq!(encode_bytes(&[0x80]), hex!("8180"));
        assert_eq!(encode_bytes(&[0x04, 0x00]), hex!("820400"));
    }

    #[test]
    fn test_encode_long_string() {
        let lorem = b"Lorem ipsum dolor sit amet, consectetur adipisicing elit";
        let encoded = encode_bytes(lorem);
        assert_eq!(&encoded[..2], &hex!("b838"));
        assert_eq!(&encoded[2..], lorem);
    }

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode_uint(0), hex!("80"));
        assert_eq!(encode_uint(15), hex!("0f"));
        assert_eq!(encode_uint(1024), hex!("820400"));
        assert_eq!(encode_u256(U256::ZERO), hex!("80"));
        assert_eq!(encode_u256(U256::from(1024u64)), hex!("820400"));
    }

    #[test]
    fn test_encode_lists() {
        let cat_dog = RlpItem::List(vec![bytes(b"cat"), bytes(b"dog")]);
        assert_eq!(encode(&cat_dog), hex!("c88363617483646f67"));
        assert_eq!(encode(&RlpItem::List(vec![])), hex!("c0"));

        // The set-theoretic representation of three.
        let empty = || RlpItem::List(vec![]);
        let three = RlpItem::List(vec![
            empty(),
            RlpItem::List(vec![empty()]),
            RlpItem::List(vec![empty(), RlpItem::List(vec![empty()])]),
        ]);
        assert_eq!(encode(&three), hex!("c7c0c1c0c3c0c1c0"));
    }

    #[test]
    fn test_encode_list_of_preencoded_items_matches_tree_encoding() {
        let items = vec![bytes(b"cat"), RlpItem::uint(1024), bytes(&[0x42; 60])];
        let preencoded: Vec<Vec<u8>> = items.iter().map(encode).collect();
        assert_eq!(encode_list(&preencoded), encode(&RlpItem::List(items)));
    }

    #[test]
    fn test_encoder_agrees_with_alloy_rlp() {
        for value in [0u64, 1, 0x7f, 0x80, 0xff, 0x0100, 0xdead_beef, u64::MAX] {
            assert_eq!(encode_uint(value), alloy_rlp::encode(value), "uint {value}");
        }
        for len in [0usize, 1, 55, 56, 255, 256, 1024] {
            let data = vec![0xab; len];
            assert_eq!(encode_bytes(&data), alloy_rlp::encode(&data[..]), "len {len}");
        }
    }

    #[test]
    fn test_decode_round_trips_nested_lists() {
        let tree = RlpItem::List(vec![
            bytes(b"cat"),
            RlpItem::List(vec![bytes(&[]), bytes(&[0x01]), bytes(&[0x99; 70])]),
            RlpItem::uint(0),
        ]);
        assert_eq!(decode(&encode(&tree)).unwrap(), tree);
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        assert!(matches!(
            decode(&hex!("83646f")),
            Err(DecodeError::Truncated { needed: 4, available: 3 })
        ));
        assert!(matches!(decode(&[]), Err(DecodeError::Empty)));
        assert!(matches!(
            decode(&hex!("b9")),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        assert!(matches!(
            decode(&hex!("8000")),
            Err(DecodeError::TrailingBytes { consumed: 1, total: 2 })
        ));
    }

    #[test]
    fn test_decode_rejects_non_canonical_lengths() {
        // 0x05 wrapped in a length prefix
        assert!(matches!(
            decode(&hex!("8105")),
            Err(DecodeError::NonCanonical { .. })
        ));
        // long form for a 3-byte string
        assert!(matches!(
            decode(&hex!("b803646f67")),
            Err(DecodeError::NonCanonical { .. })
        ));
        // length-of-length with a leading zero
        let mut padded = hex!("b90038").to_vec();
        padded.extend_from_slice(&[0u8; 0x38]);
        assert!(matches!(
            decode(&padded),
            Err(DecodeError::NonCanonical { .. })
        ));
    }

    #[test]
    fn test_split_list_returns_raw_items() {
        let encoded = hex!("c88363617483646f67");
        let items = split_list(&encoded).unwrap();
        assert_eq!(items, vec![&hex!("83636174")[..], &hex!("83646f67")[..]]);
        assert!(matches!(
            split_list(&hex!("83646f67")),
            Err(DecodeError::UnexpectedString)
        ));
    }

    #[test]
    fn test_decode_bytes_and_u256() {
        assert_eq!(decode_bytes(&hex!("820400")).unwrap(), &hex!("0400"));
        assert_eq!(decode_bytes(&hex!("42")).unwrap(), &[0x42]);
        assert!(matches!(
            decode_bytes(&hex!("c0")),
            Err(DecodeError::UnexpectedList)
        ));
        assert_eq!(decode_u256(&hex!("0400")).unwrap(), U256::from(1024u64));
        assert_eq!(decode_u256(&[]).unwrap(), U256::ZERO);
        assert!(decode_u256(&hex!("0004")).is_err());
    }
}
