use crate::config::Config;
use crate::derivation::DerivationPath;
use crate::keys::{HDPrivateKey, HDPublicKey, KeyError};
use crate::mnemonic::{Mnemonic, MnemonicError};
use crate::network::Network;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeychainError {
    #[error("Mnemonic error: {0}")]
    Mnemonic(#[from] MnemonicError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

impl From<crate::derivation::DerivationError> for KeychainError {
    fn from(err: crate::derivation::DerivationError) -> Self {
        KeychainError::Key(KeyError::Derivation(err))
    }
}

/// A master key and the private derivations below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keychain {
    master: HDPrivateKey,
}

impl Keychain {
    // Create a keychain from a seed
    pub fn new(seed: &[u8], network: Network) -> Result<Self, KeychainError> {
        let master = HDPrivateKey::new(seed, network)?;
        Ok(Keychain { master })
    }

    pub fn from_mnemonic(
        mnemonic: &Mnemonic,
        passphrase: &str,
        network: Network,
    ) -> Result<Self, KeychainError> {
        Keychain::new(mnemonic.to_seed(passphrase).as_bytes(), network)
    }

    /// Restores a keychain from a phrase in the configured language.
    pub fn restore(phrase: &str, passphrase: &str, config: &Config) -> Result<Self, KeychainError> {
        let mnemonic = Mnemonic::from_phrase(phrase, config.language)?;
        Keychain::from_mnemonic(&mnemonic, passphrase, config.network)
    }

    /// Creates a fresh phrase per `config` and the keychain it seeds.
    pub fn generate(config: &Config, passphrase: &str) -> Result<(Mnemonic, Self), KeychainError> {
        let mnemonic = Mnemonic::generate(config.strength, config.language)?;
        let keychain = Keychain::from_mnemonic(&mnemonic, passphrase, config.network)?;
        Ok((mnemonic, keychain))
    }

    pub fn master(&self) -> &HDPrivateKey {
        &self.master
    }

    pub fn master_public(&self) -> HDPublicKey {
        self.master.public_key()
    }

    // Derive a private key using a string path such as m/44'/0'/0
    pub fn derived_key(&self, path: &str) -> Result<HDPrivateKey, KeychainError> {
        let path: DerivationPath = path.parse()?;
        Ok(self.master.derive_path(&path)?)
    }

    /// Fingerprint of the master key
    pub fn fingerprint(&self) -> [u8; 4] {
        self.master.fingerprint()
    }
}
