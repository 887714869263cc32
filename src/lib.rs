//! Hierarchical deterministic keys (BIP32) and mnemonic seed phrases (BIP39).

pub mod base58;
pub mod bits;
pub mod config;
pub mod crypto;
pub mod derivation;
pub mod keychain;
pub mod keys;
pub mod mnemonic;
pub mod network;

pub use config::{Config, ConfigError};
pub use derivation::{ChildNumber, DerivationError, DerivationPath, HARDENED_BIT};
pub use keychain::{Keychain, KeychainError};
pub use keys::{HDPrivateKey, HDPublicKey, KeyError};
pub use mnemonic::{Language, Mnemonic, MnemonicError, Seed, Strength};
pub use network::{KeyKind, Network};
