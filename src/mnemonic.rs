use rand::rngs::OsRng;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::bits::{bits_in_range, left_pad, BitWriter};
use crate::crypto::{pbkdf2_hmac_sha512, sha256};

const BITS_PER_WORD: usize = 11;
const MIN_WORDS: usize = 12;
// One checksum bit per 3 words; a checksum must fit a single 64-bit read
const MAX_WORDS: usize = 192;
const SEED_ITERATIONS: u32 = 2048;

/// Word list a phrase is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Japanese,
    Korean,
    Spanish,
    SimplifiedChinese,
    TraditionalChinese,
    French,
    Italian,
}

impl Language {
    /// The 2048 words of this language, in index order.
    pub fn word_list(self) -> &'static [&'static str; 2048] {
        let language = match self {
            Language::English => bip39::Language::English,
            Language::Japanese => bip39::Language::Japanese,
            Language::Korean => bip39::Language::Korean,
            Language::Spanish => bip39::Language::Spanish,
            Language::SimplifiedChinese => bip39::Language::SimplifiedChinese,
            Language::TraditionalChinese => bip39::Language::TraditionalChinese,
            Language::French => bip39::Language::French,
            Language::Italian => bip39::Language::Italian,
        };
        language.word_list()
    }

    /// Index of `word`, matched exactly.
    pub fn word_index(self, word: &str) -> Option<usize> {
        self.word_list().iter().position(|candidate| *candidate == word)
    }
}

/// Entropy size of a generated phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Strength {
    #[default]
    Bits128,
    Bits160,
    Bits192,
    Bits224,
    Bits256,
}

impl Strength {
    pub fn entropy_bits(self) -> usize {
        match self {
            Strength::Bits128 => 128,
            Strength::Bits160 => 160,
            Strength::Bits192 => 192,
            Strength::Bits224 => 224,
            Strength::Bits256 => 256,
        }
    }

    pub fn entropy_bytes(self) -> usize {
        self.entropy_bits() / 8
    }

    pub fn word_count(self) -> usize {
        // 32 entropy bits plus one checksum bit per 3 words
        self.entropy_bits() * 33 / 32 / BITS_PER_WORD
    }

    pub fn from_word_count(count: usize) -> Option<Self> {
        match count {
            12 => Some(Strength::Bits128),
            15 => Some(Strength::Bits160),
            18 => Some(Strength::Bits192),
            21 => Some(Strength::Bits224),
            24 => Some(Strength::Bits256),
            _ => None,
        }
    }

    fn from_entropy_bytes(len: usize) -> Option<Self> {
        match len {
            16 => Some(Strength::Bits128),
            20 => Some(Strength::Bits160),
            24 => Some(Strength::Bits192),
            28 => Some(Strength::Bits224),
            32 => Some(Strength::Bits256),
            _ => None,
        }
    }
}

impl From<Strength> for u16 {
    fn from(strength: Strength) -> u16 {
        strength.entropy_bits() as u16
    }
}

impl TryFrom<u16> for Strength {
    type Error = MnemonicError;

    fn try_from(bits: u16) -> Result<Self, Self::Error> {
        Strength::from_entropy_bytes(usize::from(bits) / 8)
            .filter(|_| bits % 8 == 0)
            .ok_or(MnemonicError::InvalidStrength(bits))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MnemonicError {
    #[error("Random source failed: {0}")]
    RandomSource(String),
    #[error("Invalid entropy length: {0} bytes")]
    InvalidEntropyLength(usize),
    #[error("Invalid strength: {0} bits")]
    InvalidStrength(u16),
    #[error("Not enough words: {0}, at least 12 required")]
    NotEnoughWords(usize),
    #[error("Invalid number of words: {0}")]
    InvalidWordCount(usize),
    #[error("Word not found in word list: {0}")]
    WordNotFound(String),
    #[error("Invalid word order: {0} bits is not a multiple of 33")]
    InvalidWordOrder(usize),
    #[error("Checksum mismatch: computed {computed}, expected {expected}")]
    ChecksumMismatch { computed: String, expected: String },
}

impl MnemonicError {
    // Names the failure without any phrase content
    fn kind(&self) -> &'static str {
        match self {
            MnemonicError::RandomSource(_) => "random_source",
            MnemonicError::InvalidEntropyLength(_) => "invalid_entropy_length",
            MnemonicError::InvalidStrength(_) => "invalid_strength",
            MnemonicError::NotEnoughWords(_) => "not_enough_words",
            MnemonicError::InvalidWordCount(_) => "invalid_word_count",
            MnemonicError::WordNotFound(_) => "word_not_found",
            MnemonicError::InvalidWordOrder(_) => "invalid_word_order",
            MnemonicError::ChecksumMismatch { .. } => "checksum_mismatch",
        }
    }
}

/// 64-byte seed derived from a phrase; wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Generates a phrase of the given strength from the operating system's
/// random source.
pub fn generate(
    strength: Strength,
    language: Language,
) -> Result<Vec<&'static str>, MnemonicError> {
    generate_with(&mut OsRng, strength, language)
}

/// Generates a phrase drawing entropy from `rng`.
pub fn generate_with<R>(
    rng: &mut R,
    strength: Strength,
    language: Language,
) -> Result<Vec<&'static str>, MnemonicError>
where
    R: RngCore + CryptoRng,
{
    let mut entropy = vec![0u8; strength.entropy_bytes()];
    rng.try_fill_bytes(&mut entropy)
        .map_err(|e| MnemonicError::RandomSource(e.to_string()))?;

    let words = encode(&entropy, language);
    entropy.zeroize();
    words
}

/// Encodes entropy as words: the entropy bits followed by the first
/// `bits / 32` bits of its SHA-256, read 11 bits per word.
pub fn encode(entropy: &[u8], language: Language) -> Result<Vec<&'static str>, MnemonicError> {
    let strength = Strength::from_entropy_bytes(entropy.len())
        .ok_or(MnemonicError::InvalidEntropyLength(entropy.len()))?;

    // At most 8 checksum bits, all within the first hash byte
    let checksum_len = strength.entropy_bits() / 32;
    let mut buffer = Vec::with_capacity(entropy.len() + 1);
    buffer.extend_from_slice(entropy);
    buffer.push(sha256(entropy)[0]);

    let list = language.word_list();
    let total_bits = strength.entropy_bits() + checksum_len;
    let words = (0..total_bits / BITS_PER_WORD)
        .map(|i| list[bits_in_range(&buffer, i * BITS_PER_WORD, BITS_PER_WORD) as usize])
        .collect();

    buffer.zeroize();
    Ok(words)
}

/// Stretches a phrase into a 64-byte seed with PBKDF2-HMAC-SHA512.
///
/// Both the phrase and `"mnemonic" + passphrase` are NFKD-normalized first.
/// The words are not validated.
pub fn seed<S: AsRef<str>>(words: &[S], passphrase: &str) -> Seed {
    let mut phrase = words
        .iter()
        .map(|word| word.as_ref())
        .collect::<Vec<_>>()
        .join(" ");

    let mut password: String = phrase.nfkd().collect();
    let mut salt: String = format!("mnemonic{}", passphrase).nfkd().collect();

    let seed = Seed(pbkdf2_hmac_sha512(
        password.as_bytes(),
        salt.as_bytes(),
        SEED_ITERATIONS,
    ));

    phrase.zeroize();
    password.zeroize();
    salt.zeroize();
    seed
}

/// Checks a space-separated phrase against the word list and its checksum.
///
/// Returns `Ok(true)` or the reason the phrase is invalid, never `Ok(false)`.
pub fn is_valid(phrase: &str, language: Language) -> Result<bool, MnemonicError> {
    let result = check(phrase, language);
    if let Err(e) = &result {
        tracing::debug!(?language, reason = e.kind(), "mnemonic validation failed");
    }
    result.map(|_| true)
}

// Returns the word indices of a valid phrase
fn check(phrase: &str, language: Language) -> Result<Vec<usize>, MnemonicError> {
    let words: Vec<&str> = phrase.split(' ').collect();

    if words.len() < MIN_WORDS {
        return Err(MnemonicError::NotEnoughWords(words.len()));
    }
    if words.len() % 3 != 0 || words.len() > MAX_WORDS {
        return Err(MnemonicError::InvalidWordCount(words.len()));
    }

    let indices = words
        .iter()
        .map(|word| {
            language
                .word_index(word)
                .ok_or_else(|| MnemonicError::WordNotFound(word.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut writer = BitWriter::with_capacity(indices.len() * BITS_PER_WORD);
    for index in &indices {
        writer.push(*index as u64, BITS_PER_WORD);
    }

    let total_bits = writer.bit_len();
    if total_bits % 33 != 0 {
        return Err(MnemonicError::InvalidWordOrder(total_bits));
    }

    let checksum_len = total_bits / 33;
    let entropy_len = total_bits - checksum_len;
    let mut bytes = writer.into_bytes();

    let expected = bits_in_range(&bytes, entropy_len, checksum_len);
    let computed = bits_in_range(&sha256(&bytes[..entropy_len / 8]), 0, checksum_len);
    bytes.zeroize();

    if computed != expected {
        return Err(MnemonicError::ChecksumMismatch {
            computed: left_pad(&format!("{:b}", computed), checksum_len),
            expected: left_pad(&format!("{:b}", expected), checksum_len),
        });
    }

    Ok(indices)
}

/// A validated phrase together with its language.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    words: Vec<&'static str>,
    language: Language,
}

impl Mnemonic {
    pub fn generate(strength: Strength, language: Language) -> Result<Self, MnemonicError> {
        let words = generate(strength, language)?;
        Ok(Mnemonic { words, language })
    }

    pub fn from_entropy(entropy: &[u8], language: Language) -> Result<Self, MnemonicError> {
        let words = encode(entropy, language)?;
        Ok(Mnemonic { words, language })
    }

    pub fn from_phrase(phrase: &str, language: Language) -> Result<Self, MnemonicError> {
        let list = language.word_list();
        let words = check(phrase, language)?
            .into_iter()
            .map(|index| list[index])
            .collect();
        Ok(Mnemonic { words, language })
    }

    pub fn words(&self) -> &[&'static str] {
        &self.words
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn phrase(&self) -> String {
        self.words.join(" ")
    }

    pub fn to_seed(&self, passphrase: &str) -> Seed {
        seed(&self.words, passphrase)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.phrase())
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mnemonic")
            .field("language", &self.language)
            .field("words", &self.words.len())
            .finish()
    }
}
