// Digest: SHA-256 over canonical bytes. Output is 32 raw bytes.
// Ledger hashes are structurally equivalent to, not bit-compatible with, older ELTT chains.

use sha2::{Digest, Sha256};

pub type Hash = [u8; 32];

/// Genesis marker: prev_hash = all-zeroes means no parent.
pub const ZERO_HASH: Hash = [0u8; 32];

pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

pub fn to_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Serde adapter so persisted hashes read as lowercase hex instead of byte arrays.
pub mod hex_hash {
    use super::Hash;
    use hex::FromHex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        <[u8; 32]>::from_hex(s.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            to_hex(&sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn single_bit_flip_changes_digest() {
        let a = sha256(b"eltt");
        let b = sha256(b"eltu");
        assert_ne!(a, b);
        assert_ne!(a, ZERO_HASH);
    }

    #[test]
    fn hex_hash_roundtrips_through_json() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrap {
            #[serde(with = "hex_hash")]
            h: Hash,
        }
        let w = Wrap { h: sha256(b"x") };
        let s = serde_json::to_string(&w).unwrap();
        assert!(s.contains(&to_hex(&w.h)));
        let back: Wrap = serde_json::from_str(&s).unwrap();
        assert_eq!(back.h, w.h);
    }
}
