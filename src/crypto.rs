//! Hash primitives used by derivation and the mnemonic codec.

use bitcoin_hashes::hmac::{Hmac, HmacEngine};
use bitcoin_hashes::{hash160, sha256, sha256d, sha512, Hash, HashEngine};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

/// SHA-256 applied twice, as used by Base58Check.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// RIPEMD-160 of SHA-256.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// HMAC-SHA512; keys of any length are accepted.
pub fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    let mut engine: HmacEngine<sha512::Hash> = HmacEngine::new(key);
    engine.input(data);
    Hmac::<sha512::Hash>::from_engine(engine).to_byte_array()
}

/// PBKDF2 with HMAC-SHA512 producing a 64-byte key.
pub fn pbkdf2_hmac_sha512(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 64] {
    let mut output = [0u8; 64];
    pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut output);
    output
}
