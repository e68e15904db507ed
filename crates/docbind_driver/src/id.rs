//! Document identifier.

use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DriverError;

/// Unique identifier for a stored document.
///
/// Object IDs are opaque 12-byte values that are:
/// - Process-unique
/// - Roughly ordered by creation time (4-byte big-endian timestamp prefix)
/// - Never reused
///
/// The layout is `timestamp(4) | process(5) | counter(3)`: the Unix
/// timestamp in seconds, five random bytes fixed per process, and a
/// wrapping big-endian counter seeded randomly at startup.
///
/// The all-zero value is reserved as the *zero identifier*: a document
/// carrying it has not been persisted yet.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId([u8; 12]);

/// Five random bytes identifying this process, fixed at first use.
fn process_bytes() -> &'static [u8; 5] {
    static PROCESS: OnceLock<[u8; 5]> = OnceLock::new();
    PROCESS.get_or_init(|| {
        let mut bytes = [0u8; 5];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes
    })
}

/// Monotonic counter, randomly seeded at first use.
fn next_count() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU32::new(rand::thread_rng().next_u32()));
    counter.fetch_add(1, Ordering::Relaxed)
}

impl ObjectId {
    /// Creates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let count = next_count();

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process_bytes());
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        Self(bytes)
    }

    /// Returns the zero identifier.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 12])
    }

    /// Returns true if this is the zero identifier.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 12]
    }

    /// Creates an identifier from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Creates an identifier from a slice.
    ///
    /// Returns `None` if the slice is not exactly 12 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 12 {
            let mut bytes = [0u8; 12];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Returns the timestamp prefix in seconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Renders the identifier as 24 lowercase hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(24);
        for byte in &self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
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
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 24 {
            return Err(DriverError::backend("object id must be 24 hex characters"));
        }
        let mut bytes = [0u8; 12];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| DriverError::backend("object id must be hex"))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| DriverError::backend("object id must be hex"))?;
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<ObjectId> for [u8; 12] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_unique() {
        let id1 = ObjectId::new();
        let id2 = ObjectId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn new_is_not_zero() {
        assert!(!ObjectId::new().is_zero());
        assert!(ObjectId::zero().is_zero());
        assert!(ObjectId::default().is_zero());
    }

    #[test]
    fn timestamp_prefix_is_monotonic() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;
        let id = ObjectId::new();
        assert!(id.timestamp() >= before);
    }

    #[test]
    fn counter_suffix_advances() {
        // Tests share the process counter, so only monotonicity modulo
        // 2^24 can be asserted, not an exact step.
        let a = ObjectId::new();
        let b = ObjectId::new();
        let count = |id: &ObjectId| {
            let bytes = id.as_bytes();
            u32::from_be_bytes([0, bytes[9], bytes[10], bytes[11]])
        };
        assert_ne!(count(&a), count(&b));
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!("short".parse::<ObjectId>().is_err());
        assert!("zz".repeat(12).parse::<ObjectId>().is_err());
    }

    #[test]
    fn from_slice() {
        assert!(ObjectId::from_slice(&[0u8; 12]).is_some());
        assert!(ObjectId::from_slice(&[0u8; 11]).is_none());
        assert!(ObjectId::from_slice(&[0u8; 13]).is_none());
    }

    #[test]
    fn ordering_follows_bytes() {
        let id1 = ObjectId::from_bytes([0; 12]);
        let id2 = ObjectId::from_bytes([1; 12]);
        assert!(id1 < id2);
    }
}
