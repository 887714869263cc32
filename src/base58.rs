//! Base58Check: Base58 text with a trailing 4-byte double-SHA-256 checksum.

use crate::crypto::sha256d;

const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base58Error {
    #[error("invalid base58 string: {0}")]
    InvalidEncoding(String),
    #[error("decoded data too short for a checksum ({0} bytes)")]
    TooShort(usize),
    #[error("base58 checksum mismatch")]
    ChecksumMismatch,
}

/// Appends the checksum to `payload` and encodes the result.
pub fn encode_check(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&sha256d(payload)[..CHECKSUM_LEN]);
    bs58::encode(data).into_string()
}

/// Decodes `encoded`, verifies and strips the checksum.
pub fn decode_check(encoded: &str) -> Result<Vec<u8>, Base58Error> {
    let mut data = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| Base58Error::InvalidEncoding(e.to_string()))?;

    if data.len() < CHECKSUM_LEN {
        return Err(Base58Error::TooShort(data.len()));
    }

    let checksum = data.split_off(data.len() - CHECKSUM_LEN);
    if sha256d(&data)[..CHECKSUM_LEN] != checksum[..] {
        return Err(Base58Error::ChecksumMismatch);
    }

    Ok(data)
}
