//! Document identifier.

use crate::error::{StoreError, StoreResult};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a stored document.
///
/// Object ids are 12 bytes:
/// - 4 bytes: seconds since the Unix epoch (big-endian)
/// - 5 bytes: random value chosen once per process
/// - 3 bytes: counter (big-endian), starting at a random value
///
/// Ids created by one process sort in creation order, which tailing
/// reads rely on. The text form is 24 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

impl ObjectId {
    /// Creates an object id from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Generates a new object id.
    #[must_use]
    pub fn new() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        let unique = PROCESS_UNIQUE.get_or_init(|| rand::thread_rng().gen());
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::thread_rng().gen_range(0..0x00ff_ffff)))
            .fetch_add(1, Ordering::SeqCst)
            & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        Self(bytes)
    }

    /// Parses the 24-character hex form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] if the string is not exactly
    /// 24 hex characters.
    pub fn parse(text: &str) -> StoreResult<Self> {
        let raw = text.as_bytes();
        if raw.len() != 24 {
            return Err(StoreError::InvalidId(text.to_string()));
        }
        let mut bytes = [0u8; 12];
        for (i, pair) in raw.chunks(2).enumerate() {
            let high = hex_value(pair[0]).ok_or_else(|| StoreError::InvalidId(text.into()))?;
            let low = hex_value(pair[1]).ok_or_else(|| StoreError::InvalidId(text.into()))?;
            bytes[i] = (high << 4) | low;
        }
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Returns the creation time in seconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Returns the 24-character hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_is_unique_and_increasing() {
        let id1 = ObjectId::new();
        let id2 = ObjectId::new();
        assert_ne!(id1, id2);
        assert!(id1 < id2);
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 24);
        assert_eq!(ObjectId::parse(&text).unwrap(), id);
    }

    #[test]
    fn parse_accepts_uppercase() {
        let id = ObjectId::parse("5F0C8B9A1E2D3C4B5A697887").unwrap();
        assert_eq!(id.to_hex(), "5f0c8b9a1e2d3c4b5a697887");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(ObjectId::parse("").is_err());
        assert!(ObjectId::parse("not-an-id").is_err());
        assert!(ObjectId::parse("5f0c8b9a1e2d3c4b5a69788").is_err());
        assert!(ObjectId::parse("5f0c8b9a1e2d3c4b5a69788g").is_err());
        assert!(ObjectId::parse("5f0c8b9a1e2d3c4b5a6978870").is_err());
    }

    #[test]
    fn timestamp_is_recent() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;
        let id = ObjectId::new();
        assert!(id.timestamp() <= now && now - id.timestamp() < 5);
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = ObjectId::from_bytes([0xab; 12]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abababababababababababab\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ObjectId>("\"zz\"").is_err());
    }

    proptest! {
        #[test]
        fn any_bytes_roundtrip_through_text(bytes in proptest::array::uniform12(any::<u8>())) {
            let id = ObjectId::from_bytes(bytes);
            prop_assert_eq!(ObjectId::parse(&id.to_hex()).unwrap(), id);
        }
    }
}
