//! Just enough ABI encoding for the calls Haven makes.

use haven_core::{HavenError, Result};

/// `bytes4(keccak256("approvedShelters(address)"))`
pub const APPROVED_SHELTERS_SELECTOR: [u8; 4] = [0x48, 0xc9, 0x3f, 0x21];

const WORD: usize = 32;

/// Parse a `0x`-prefixed 20-byte address.
pub fn parse_address(s: &str) -> Result<[u8; 20]> {
    let bytes = decode_hex(s)?;
    bytes
        .try_into()
        .map_err(|_| HavenError::Chain(format!("'{s}' is not a 20-byte address")))
}

/// Calldata for `approvedShelters(address)`.
pub fn encode_approved_shelters(shelter: &str) -> Result<String> {
    let address = parse_address(shelter)?;
    let mut data = Vec::with_capacity(4 + WORD);
    data.extend_from_slice(&APPROVED_SHELTERS_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(&address);
    Ok(encode_hex(&data))
}

/// Split return data into 32-byte words.
pub fn words(data: &[u8]) -> Result<Vec<&[u8]>> {
    if data.len() % WORD != 0 {
        return Err(HavenError::Chain(format!(
            "return data length {} is not a multiple of 32",
            data.len()
        )));
    }
    Ok(data.chunks(WORD).collect())
}

pub fn word_to_bool(word: &[u8]) -> bool {
    word.iter().any(|b| *b != 0)
}

/// Decode a uint256 word, rejecting values that do not fit in 128 bits.
pub fn word_to_u128(word: &[u8]) -> Result<u128> {
    let (high, low) = word.split_at(WORD - 16);
    if high.iter().any(|b| *b != 0) {
        return Err(HavenError::Chain("uint256 value exceeds 128 bits".into()));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(low);
    Ok(u128::from_be_bytes(buf))
}

/// Parse a JSON-RPC quantity such as `"0x1bc16d674ec80000"`.
pub fn parse_quantity(s: &str) -> Result<u128> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| HavenError::Chain(format!("quantity '{s}' lacks 0x prefix")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| HavenError::Chain(format!("bad quantity '{s}': {e}")))
}

/// Decode `0x`-prefixed (or bare) hex into bytes.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| HavenError::Chain(format!("invalid hex '{s}': {e}")))
}

pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
