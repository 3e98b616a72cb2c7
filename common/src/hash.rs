use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, ops::Deref, str::FromStr};

/// Fixed-size identifier of `BYTES` bytes, rendered as lowercase hex.
///
/// Used for everything the ledger names by bytes:
/// - **20 bytes**: agent, avatar and stake addresses
/// - **32 bytes**: block hashes and transaction ids
/// - **16 bytes**: action, item and order ids
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const BYTES: usize>([u8; BYTES]);

/// Account address on the ledger
pub type Address = Hash<20>;

/// Block hash
pub type BlockHash = Hash<32>;

/// Transaction id
pub type TxId = Hash<32>;

/// Identifier of one action instance
pub type ActionId = Hash<16>;

/// Identifier of a tradable or non-fungible item instance
pub type ItemId = Hash<16>;

/// Identifier of a shop order
pub type OrderId = Hash<16>;

impl<const BYTES: usize> Default for Hash<BYTES> {
    fn default() -> Self {
        Self::new([0u8; BYTES])
    }
}

// Serialised as a hex string so it can also be used as a JSON map key
impl<const BYTES: usize> Serialize for Hash<BYTES> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de, const BYTES: usize> Deserialize<'de> for Hash<BYTES> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<const BYTES: usize> Hash<BYTES> {
    #[inline]
    pub const fn new(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }
}

impl<const BYTES: usize> From<[u8; BYTES]> for Hash<BYTES> {
    #[inline]
    fn from(bytes: [u8; BYTES]) -> Self {
        Self::new(bytes)
    }
}

impl<const BYTES: usize> TryFrom<&[u8]> for Hash<BYTES> {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let hash: [u8; BYTES] = value.try_into()?;
        Ok(Self::new(hash))
    }
}

impl<const BYTES: usize> AsRef<[u8]> for Hash<BYTES> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const BYTES: usize> Deref for Hash<BYTES> {
    type Target = [u8; BYTES];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const BYTES: usize> fmt::Debug for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Hash<{BYTES}>")).field(&hex::encode(self)).finish()
    }
}

impl<const BYTES: usize> fmt::Display for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self))
    }
}

impl<const BYTES: usize> FromStr for Hash<BYTES> {
    type Err = hex::FromHexError;

    /// Parses a hash from a hexadecimal string, optionally `0x` prefixed.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not hex or does not decode to
    /// exactly `BYTES` bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0; BYTES];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn parses_prefixed_and_bare_hex() {
        let bare: Address = "0102030405060708090a0b0c0d0e0f1011121314".parse().unwrap();
        let prefixed: Address = "0x0102030405060708090a0b0c0d0e0f1011121314".parse().unwrap();
        assert_eq!(bare, prefixed);
        assert_eq!(bare.to_string(), "0102030405060708090a0b0c0d0e0f1011121314");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("0102".parse::<Address>().is_err());
    }

    #[test]
    fn usable_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(Address::new([7; 20]), 5u32);
        let json = serde_json::to_string(&map).unwrap();
        let back: BTreeMap<Address, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
