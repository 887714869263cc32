use secp256k1::{PublicKey, SecretKey};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::base58::{self, Base58Error};
use crate::derivation::{DerivationError, DerivationPath, KeyMaterial, Node};
use crate::network::{KeyKind, Network};

// version(4) | depth(1) | fingerprint(4) | child index(4) | chain code(32) | key(33)
const EXTENDED_KEY_LEN: usize = 78;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),
    #[error("Base58 error: {0}")]
    Base58(#[from] Base58Error),
    #[error("Invalid extended key length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("Unknown extended key version: {0}")]
    UnknownVersion(String),
    #[error("Expected an extended {expected:?} key")]
    WrongKeyKind { expected: KeyKind },
    #[error("Invalid private key prefix: {0:#04x}")]
    InvalidKeyPrefix(u8),
    #[error("Invalid key data")]
    InvalidKey,
}

/// Extended private key: a private node of the key tree plus its network.
#[derive(Clone, PartialEq, Eq)]
pub struct HDPrivateKey {
    network: Network,
    node: Node,
}

/// Extended public key: a public-only node of the key tree plus its network.
#[derive(Clone, PartialEq, Eq)]
pub struct HDPublicKey {
    network: Network,
    node: Node,
}

impl HDPrivateKey {
    /// Creates the master key from a seed
    pub fn new(seed: &[u8], network: Network) -> Result<Self, KeyError> {
        let node = Node::master(seed)?;
        tracing::debug!(?network, "created master key");
        Ok(HDPrivateKey { network, node })
    }

    /// Derives the child at `index`, hardened if requested.
    ///
    /// # Panics
    ///
    /// Panics if `index` already has the hardened bit set.
    pub fn derived(&self, index: u32, hardened: bool) -> Result<Self, KeyError> {
        let node = self.node.derive_child(index, hardened)?;
        Ok(HDPrivateKey {
            network: self.network,
            node,
        })
    }

    /// Walks `path` from this key, one child per step.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, KeyError> {
        path.iter()
            .try_fold(self.clone(), |key, child| key.derived(child.index, child.hardened))
    }

    /// The extended public key at the same position in the tree
    pub fn public_key(&self) -> HDPublicKey {
        HDPublicKey {
            network: self.network,
            node: self.node.neuter(),
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        match &self.node.key {
            KeyMaterial::Private { secret, .. } => secret,
            KeyMaterial::Public(_) => unreachable!("private key node without a secret"),
        }
    }

    /// Hex encoding of the 32-byte secret
    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key().secret_bytes())
    }

    /// Base58Check encoding of this key (`xprv...` on mainnet)
    pub fn extended(&self) -> String {
        encode_extended(self.network.private_version(), &self.node)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn depth(&self) -> u8 {
        self.node.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.node.parent_fingerprint
    }

    pub fn child_index(&self) -> u32 {
        self.node.child_number
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.node.chain_code
    }

    /// Fingerprint of this key, as its children record it
    pub fn fingerprint(&self) -> [u8; 4] {
        self.node.fingerprint()
    }
}

impl HDPublicKey {
    /// Derives the non-hardened child at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` has the hardened bit set: hardened children cannot
    /// be derived from a public key.
    pub fn derived(&self, index: u32) -> Result<Self, KeyError> {
        let node = self.node.derive_child(index, false)?;
        Ok(HDPublicKey {
            network: self.network,
            node,
        })
    }

    /// Walks a path such as `m/1/0`. `"m"`, `"/"` and `""` return this key.
    ///
    /// # Panics
    ///
    /// Panics if the path has a hardened segment or a segment that is not a
    /// non-hardened index.
    pub fn derived_key(&self, path: &str) -> Result<Self, KeyError> {
        if path == "m" || path == "/" || path.is_empty() {
            return Ok(self.clone());
        }
        assert!(
            !path.contains('\''),
            "invalid path {path:?}: hardened derivation requires a private key"
        );

        let path = path.strip_prefix("m/").unwrap_or(path);
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.clone(), |key, segment| {
                let Ok(index) = segment.parse::<u32>() else {
                    panic!("invalid path segment {segment:?}");
                };
                key.derived(index)
            })
    }

    /// The compressed public key
    pub fn public_key(&self) -> &PublicKey {
        self.node.key.public_key()
    }

    /// Base58Check encoding of this key (`xpub...` on mainnet)
    pub fn extended(&self) -> String {
        encode_extended(self.network.public_version(), &self.node)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn depth(&self) -> u8 {
        self.node.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.node.parent_fingerprint
    }

    pub fn child_index(&self) -> u32 {
        self.node.child_number
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.node.chain_code
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        self.node.fingerprint()
    }
}

// The child index is written little-endian; the fingerprint keeps hash160 byte order
fn encode_extended(version: [u8; 4], node: &Node) -> String {
    let mut data = Vec::with_capacity(EXTENDED_KEY_LEN);

    data.extend_from_slice(&version);
    data.push(node.depth);
    data.extend_from_slice(&node.parent_fingerprint);
    data.extend_from_slice(&node.child_number.to_le_bytes());
    data.extend_from_slice(&node.chain_code);

    match &node.key {
        KeyMaterial::Private { secret, .. } => {
            data.push(0x00);
            data.extend_from_slice(&secret.secret_bytes());
        }
        KeyMaterial::Public(public) => data.extend_from_slice(&public.serialize()),
    }

    base58::encode_check(&data)
}

fn decode_extended(encoded: &str) -> Result<(Network, Node), KeyError> {
    let data = base58::decode_check(encoded)?;
    if data.len() != EXTENDED_KEY_LEN {
        return Err(KeyError::InvalidLength {
            expected: EXTENDED_KEY_LEN,
            got: data.len(),
        });
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&data[0..4]);
    let (network, kind) = Network::from_version(version)
        .ok_or_else(|| KeyError::UnknownVersion(hex::encode(version)))?;

    let depth = data[4];
    let mut parent_fingerprint = [0u8; 4];
    parent_fingerprint.copy_from_slice(&data[5..9]);
    let mut child_number = [0u8; 4];
    child_number.copy_from_slice(&data[9..13]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&data[13..45]);

    let key_data = &data[45..78];
    let key = match kind {
        KeyKind::Private => {
            if key_data[0] != 0x00 {
                return Err(KeyError::InvalidKeyPrefix(key_data[0]));
            }
            let secret = SecretKey::from_slice(&key_data[1..]).map_err(|_| KeyError::InvalidKey)?;
            KeyMaterial::from_secret(secret)
        }
        KeyKind::Public => {
            let public = PublicKey::from_slice(key_data).map_err(|_| KeyError::InvalidKey)?;
            KeyMaterial::Public(public)
        }
    };

    let node = Node {
        key,
        chain_code,
        depth,
        parent_fingerprint,
        child_number: u32::from_le_bytes(child_number),
    };
    Ok((network, node))
}

impl FromStr for HDPrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, node) = decode_extended(s)?;
        if node.key.secret_key().is_none() {
            return Err(KeyError::WrongKeyKind {
                expected: KeyKind::Private,
            });
        }
        Ok(HDPrivateKey { network, node })
    }
}

impl FromStr for HDPublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (network, node) = decode_extended(s)?;
        if node.key.secret_key().is_some() {
            return Err(KeyError::WrongKeyKind {
                expected: KeyKind::Public,
            });
        }
        Ok(HDPublicKey { network, node })
    }
}

impl fmt::Display for HDPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extended())
    }
}

impl fmt::Display for HDPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extended())
    }
}

impl fmt::Debug for HDPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HDPrivateKey")
            .field("network", &self.network)
            .field("node", &self.node)
            .finish()
    }
}

impl fmt::Debug for HDPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HDPublicKey")
            .field("network", &self.network)
            .field("node", &self.node)
            .finish()
    }
}

impl Serialize for HDPrivateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.extended())
    }
}

impl<'de> Deserialize<'de> for HDPrivateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(de::Error::custom)
    }
}

impl Serialize for HDPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.extended())
    }
}

impl<'de> Deserialize<'de> for HDPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::HARDENED_BIT;

    fn master() -> HDPrivateKey {
        HDPrivateKey::new(&[0x11; 64], Network::Mainnet).unwrap()
    }

    #[test]
    fn test_extended_layout() {
        let key = master().derived(3, true).unwrap().derived(2, false).unwrap();
        let data = base58::decode_check(&key.extended()).unwrap();

        assert_eq!(data.len(), EXTENDED_KEY_LEN);
        assert_eq!(&data[0..4], &Network::Mainnet.private_version());
        assert_eq!(data[4], 2);
        assert_eq!(&data[5..9], &key.parent_fingerprint());
        assert_eq!(&data[9..13], &[2, 0, 0, 0]);
        assert_eq!(&data[13..45], key.chain_code());
        assert_eq!(data[45], 0x00);
        assert_eq!(&data[46..78], &key.secret_key().secret_bytes());

        let public = key.public_key();
        let data = base58::decode_check(&public.extended()).unwrap();
        assert_eq!(&data[0..4], &Network::Mainnet.public_version());
        assert_eq!(&data[45..78], &public.public_key().serialize());
    }

    #[test]
    fn test_hardened_index_written_little_endian() {
        let key = master().derived(1, true).unwrap();
        let data = base58::decode_check(&key.extended()).unwrap();
        assert_eq!(key.child_index(), 1 | HARDENED_BIT);
        assert_eq!(&data[9..13], &[0x01, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn test_extended_round_trip() {
        let key = master().derived(44, true).unwrap().derived(7, false).unwrap();
        let parsed: HDPrivateKey = key.extended().parse().unwrap();
        assert_eq!(parsed, key);

        let public = key.public_key();
        let parsed: HDPublicKey = public.extended().parse().unwrap();
        assert_eq!(parsed, public);
        assert_eq!(parsed.depth(), 2);
        assert_eq!(parsed.child_index(), 7);
    }

    #[test]
    fn test_testnet_prefixes() {
        let key = HDPrivateKey::new(&[0x11; 64], Network::Testnet).unwrap();
        assert!(key.extended().starts_with("tprv"));
        assert!(key.public_key().extended().starts_with("tpub"));

        let parsed: HDPrivateKey = key.extended().parse().unwrap();
        assert_eq!(parsed.network(), Network::Testnet);
    }

    #[test]
    fn test_parse_wrong_kind() {
        let key = master();
        assert_eq!(
            key.extended().parse::<HDPublicKey>(),
            Err(KeyError::WrongKeyKind {
                expected: KeyKind::Public
            })
        );
        assert_eq!(
            key.public_key().extended().parse::<HDPrivateKey>(),
            Err(KeyError::WrongKeyKind {
                expected: KeyKind::Private
            })
        );
    }

    #[test]
    fn test_parse_malformed() {
        let short = base58::encode_check(&[0u8; 40]);
        assert_eq!(
            short.parse::<HDPrivateKey>(),
            Err(KeyError::InvalidLength {
                expected: EXTENDED_KEY_LEN,
                got: 40
            })
        );

        let unknown = base58::encode_check(&[0u8; EXTENDED_KEY_LEN]);
        assert_eq!(
            unknown.parse::<HDPrivateKey>(),
            Err(KeyError::UnknownVersion("00000000".to_string()))
        );

        let mut data = base58::decode_check(&master().extended()).unwrap();
        data[45] = 0x01;
        assert_eq!(
            base58::encode_check(&data).parse::<HDPrivateKey>(),
            Err(KeyError::InvalidKeyPrefix(0x01))
        );

        let mut data = base58::decode_check(&master().public_key().extended()).unwrap();
        data[45] = 0x05;
        assert_eq!(
            base58::encode_check(&data).parse::<HDPublicKey>(),
            Err(KeyError::InvalidKey)
        );

        assert!(matches!(
            "xprv-not-base58".parse::<HDPrivateKey>(),
            Err(KeyError::Base58(_))
        ));
    }

    #[test]
    fn test_public_key_keeps_tree_position() {
        let key = master().derived(9, true).unwrap();
        let public = key.public_key();

        assert_eq!(public.depth(), key.depth());
        assert_eq!(public.parent_fingerprint(), key.parent_fingerprint());
        assert_eq!(public.child_index(), key.child_index());
        assert_eq!(public.chain_code(), key.chain_code());
        assert_eq!(public.fingerprint(), key.fingerprint());
    }

    #[test]
    fn test_public_derivation_matches_private() {
        let key = master().derived(0, true).unwrap();
        let via_private = key.derived(5, false).unwrap().derived(8, false).unwrap();
        let via_public = key.public_key().derived_key("m/5/8").unwrap();

        assert_eq!(via_public, via_private.public_key());
    }

    #[test]
    fn test_derived_key_trivial_paths() {
        let public = master().public_key();
        for path in ["m", "/", ""] {
            assert_eq!(public.derived_key(path).unwrap(), public);
        }
        assert_eq!(public.derived_key("3/4").unwrap(), public.derived_key("m/3/4").unwrap());
    }

    #[test]
    #[should_panic(expected = "hardened derivation requires a private key")]
    fn test_derived_key_rejects_hardened_segments() {
        let _ = master().public_key().derived_key("m/1'/0");
    }

    #[test]
    #[should_panic(expected = "invalid path segment")]
    fn test_derived_key_rejects_non_numeric_segments() {
        let _ = master().public_key().derived_key("m/one");
    }

    #[test]
    #[should_panic(expected = "hardened bit is reserved")]
    fn test_public_derived_rejects_reserved_bit() {
        let _ = master().public_key().derived(HARDENED_BIT);
    }

    #[test]
    fn test_serde_as_extended_string() {
        let key = master().derived(1, false).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key.extended()));

        let parsed: HDPrivateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);

        let public: HDPublicKey =
            serde_json::from_value(serde_json::json!(key.public_key().extended())).unwrap();
        assert_eq!(public, key.public_key());
    }

    #[test]
    fn test_keys_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HDPrivateKey>();
        assert_send_sync::<HDPublicKey>();
    }

    #[test]
    fn test_siblings_derive_in_parallel() {
        let parent = master().derived(0, true).unwrap();

        let children: Vec<HDPrivateKey> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8u32)
                .map(|index| {
                    let parent = &parent;
                    scope.spawn(move || parent.derived(index, false).unwrap())
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        for (index, child) in (0u32..).zip(&children) {
            assert_eq!(*child, parent.derived(index, false).unwrap());
            assert_eq!(child.public_key(), parent.public_key().derived(index).unwrap());
        }
    }
}
