use secp256k1::{PublicKey, Scalar, SecretKey, SECP256K1};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

use crate::crypto::{hash160, hmac_sha512};

/// Bit marking a hardened child index.
pub const HARDENED_BIT: u32 = 0x80000000;

const MASTER_KEY_SALT: &[u8] = b"Bitcoin seed";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DerivationError {
    #[error("Invalid derivation path")]
    InvalidPath,
    #[error("Invalid child number: {0}")]
    InvalidChildNumber(String),
    #[error("Hardened derivation requires a private key")]
    HardenedFromPublic,
    #[error("Key derivation failed for child {index} (hardened: {hardened})")]
    DerivationFailed { index: u32, hardened: bool },
    #[error("Derivation depth exceeds 255")]
    DepthOverflow,
    #[error("Seed does not produce a valid master key")]
    InvalidMasterKey,
}

/// Key material of a node: a private node always carries the public key of
/// its secret, a public-only node carries just the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyMaterial {
    Private { secret: SecretKey, public: PublicKey },
    Public(PublicKey),
}

impl KeyMaterial {
    pub fn from_secret(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        KeyMaterial::Private { secret, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        match self {
            KeyMaterial::Private { public, .. } => public,
            KeyMaterial::Public(public) => public,
        }
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        match self {
            KeyMaterial::Private { secret, .. } => Some(secret),
            KeyMaterial::Public(_) => None,
        }
    }
}

/// A node of the BIP32 key tree.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub key: KeyMaterial,
    pub chain_code: [u8; 32],
    pub depth: u8,
    pub parent_fingerprint: [u8; 4],
    pub child_number: u32,
}

impl Node {
    /// Creates a master node from a seed
    pub fn master(seed: &[u8]) -> Result<Self, DerivationError> {
        let result = hmac_sha512(MASTER_KEY_SALT, seed);

        let (left, right) = result.split_at(32);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(right);

        let secret =
            SecretKey::from_slice(left).map_err(|_| DerivationError::InvalidMasterKey)?;

        Ok(Node {
            key: KeyMaterial::from_secret(secret),
            chain_code,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
        })
    }

    /// Derives the child at `index`.
    ///
    /// A private node yields a private child, a public-only node a public
    /// child. A degenerate result is returned as an error; the next index is
    /// never tried in its place.
    ///
    /// # Panics
    ///
    /// Panics if `index` has [`HARDENED_BIT`] set; hardening is requested
    /// through `hardened` only.
    pub fn derive_child(&self, index: u32, hardened: bool) -> Result<Self, DerivationError> {
        assert!(
            index & HARDENED_BIT == 0,
            "invalid child index {index:#010x}: the hardened bit is reserved"
        );

        let depth = self
            .depth
            .checked_add(1)
            .ok_or(DerivationError::DepthOverflow)?;

        let child_number = if hardened { index | HARDENED_BIT } else { index };

        // 0x00 || secret || index for hardened, compressed point || index otherwise
        let mut data = Vec::with_capacity(37);
        if hardened {
            let secret = self
                .key
                .secret_key()
                .ok_or(DerivationError::HardenedFromPublic)?;
            data.push(0);
            data.extend_from_slice(&secret.secret_bytes());
        } else {
            data.extend_from_slice(&self.key.public_key().serialize());
        }
        data.extend_from_slice(&child_number.to_be_bytes());

        let result = hmac_sha512(&self.chain_code, &data);
        data.zeroize();

        let mut left = [0u8; 32];
        let mut chain_code = [0u8; 32];
        left.copy_from_slice(&result[0..32]);
        chain_code.copy_from_slice(&result[32..64]);

        // Fails when IL >= n, the child scalar is zero or the child point is infinity
        let key = Scalar::from_be_bytes(left).ok().and_then(|tweak| match self.key {
            KeyMaterial::Private { secret, .. } => {
                secret.add_tweak(&tweak).ok().map(KeyMaterial::from_secret)
            }
            KeyMaterial::Public(public) => public
                .add_exp_tweak(SECP256K1, &tweak)
                .ok()
                .map(KeyMaterial::Public),
        });

        let Some(key) = key else {
            tracing::debug!(index, hardened, depth, "child key derivation produced an invalid key");
            return Err(DerivationError::DerivationFailed { index, hardened });
        };

        tracing::trace!(depth, child_number, hardened, "derived child key");

        Ok(Node {
            key,
            chain_code,
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number,
        })
    }

    /// Drops the private key, keeping the tree position.
    pub fn neuter(&self) -> Self {
        Node {
            key: KeyMaterial::Public(*self.key.public_key()),
            ..self.clone()
        }
    }

    /// First 4 bytes of hash160 of this node's compressed public key
    pub fn fingerprint(&self) -> [u8; 4] {
        let hash = hash160(&self.key.public_key().serialize());
        let mut result = [0u8; 4];
        result.copy_from_slice(&hash[0..4]);
        result
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("private", &self.key.secret_key().is_some())
            .field("public_key", &hex::encode(self.key.public_key().serialize()))
            .field("depth", &self.depth)
            .field("parent_fingerprint", &hex::encode(self.parent_fingerprint))
            .field("child_number", &self.child_number)
            .finish()
    }
}

/// One step of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildNumber {
    pub index: u32,
    pub hardened: bool,
}

impl ChildNumber {
    pub fn normal(index: u32) -> Self {
        ChildNumber { index, hardened: false }
    }

    pub fn hardened(index: u32) -> Self {
        ChildNumber { index, hardened: true }
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl FromStr for ChildNumber {
    type Err = DerivationError;

    fn from_str(component: &str) -> Result<Self, Self::Err> {
        let hardened = component.ends_with('\'') || component.ends_with('h');
        let index_str = if hardened {
            &component[..component.len() - 1]
        } else {
            component
        };

        if index_str.is_empty() || !index_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DerivationError::InvalidChildNumber(component.to_string()));
        }

        match index_str.parse::<u32>() {
            Ok(index) if index & HARDENED_BIT == 0 => Ok(ChildNumber { index, hardened }),
            _ => Err(DerivationError::InvalidChildNumber(component.to_string())),
        }
    }
}

/// Represents a BIP32 derivation path such as `m/1'/0`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    children: Vec<ChildNumber>,
}

impl DerivationPath {
    /// The empty path, `m`
    pub fn master() -> Self {
        DerivationPath::default()
    }

    /// Returns this path extended by one step
    pub fn child(&self, child: ChildNumber) -> Self {
        let mut children = self.children.clone();
        children.push(child);
        DerivationPath { children }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChildNumber> {
        self.children.iter()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(children: Vec<ChildNumber>) -> Self {
        DerivationPath { children }
    }
}

impl FromStr for DerivationPath {
    type Err = DerivationError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let mut components = path.split('/');
        if components.next() != Some("m") {
            return Err(DerivationError::InvalidPath);
        }

        let children = components
            .map(|component| {
                if component.is_empty() {
                    Err(DerivationError::InvalidPath)
                } else {
                    component.parse::<ChildNumber>()
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DerivationPath { children })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.children {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}
