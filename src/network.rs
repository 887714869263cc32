use serde::{Deserialize, Serialize};

const MAINNET_PRIVATE: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];
const MAINNET_PUBLIC: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];
const TESTNET_PRIVATE: [u8; 4] = [0x04, 0x35, 0x83, 0x94];
const TESTNET_PUBLIC: [u8; 4] = [0x04, 0x35, 0x87, 0xCF];

/// Chain whose version prefixes are used for extended key serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

/// Whether an extended key carries a private or only a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Private,
    Public,
}

impl Network {
    /// Version prefix of an extended private key (`xprv`/`tprv`)
    pub const fn private_version(self) -> [u8; 4] {
        match self {
            Network::Mainnet => MAINNET_PRIVATE,
            Network::Testnet => TESTNET_PRIVATE,
        }
    }

    /// Version prefix of an extended public key (`xpub`/`tpub`)
    pub const fn public_version(self) -> [u8; 4] {
        match self {
            Network::Mainnet => MAINNET_PUBLIC,
            Network::Testnet => TESTNET_PUBLIC,
        }
    }

    pub const fn version(self, kind: KeyKind) -> [u8; 4] {
        match kind {
            KeyKind::Private => self.private_version(),
            KeyKind::Public => self.public_version(),
        }
    }

    /// Looks up which network and key kind a version prefix belongs to.
    pub fn from_version(version: [u8; 4]) -> Option<(Network, KeyKind)> {
        match version {
            MAINNET_PRIVATE => Some((Network::Mainnet, KeyKind::Private)),
            MAINNET_PUBLIC => Some((Network::Mainnet, KeyKind::Public)),
            TESTNET_PRIVATE => Some((Network::Testnet, KeyKind::Private)),
            TESTNET_PUBLIC => Some((Network::Testnet, KeyKind::Public)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_lookup_covers_every_prefix() {
        for network in [Network::Mainnet, Network::Testnet] {
            for kind in [KeyKind::Private, KeyKind::Public] {
                assert_eq!(Network::from_version(network.version(kind)), Some((network, kind)));
            }
        }
        assert_eq!(Network::from_version([0, 0, 0, 0]), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Network::Testnet).unwrap(), "\"testnet\"");
        let network: Network = serde_json::from_str("\"mainnet\"").unwrap();
        assert_eq!(network, Network::Mainnet);
    }
}
