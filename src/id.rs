//! Identifier space and XOR distance metric.
//!
//! Node identifiers are derived by hashing an application-level name; key
//! identifiers by hashing the key bytes. Both live in the same `ID_BITS`-wide
//! space, which is the single width parameter the rest of the crate derives
//! its bucket count from, so the hash width and the bucket array can never
//! drift out of sync with each other.

use std::fmt;
use std::ops::BitXor;

use itertools::izip;
use rand::RngCore;
use sha1::{Digest, Sha1};

/// Width of the identifier space, in bits. Kademlia's canonical choice.
pub const ID_BITS: usize = 160;
/// Width of the identifier space, in bytes.
pub const ID_BYTES: usize = ID_BITS / 8;

/// A fixed-width identifier, stored big-endian so that lexicographic byte
/// ordering on the array coincides with unsigned integer ordering — which
/// is what lets `Id` double as its own XOR-distance value and derive `Ord`
/// directly instead of converting to a bignum type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id([u8; ID_BYTES]);

impl Id {
    /// The all-zero identifier. Only useful as a sentinel in tests.
    pub const ZERO: Id = Id([0u8; ID_BYTES]);

    /// Wraps a raw big-endian byte array as an identifier.
    pub fn from_bytes(raw: [u8; ID_BYTES]) -> Id {
        Id(raw)
    }

    /// Derives an identifier by hashing arbitrary bytes (a key, or an
    /// application-chosen node name).
    pub fn hash(bytes: &[u8]) -> Id {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut raw = [0u8; ID_BYTES];
        raw.copy_from_slice(&digest);
        Id(raw)
    }

    /// Generates a random identifier, uniformly distributed over the space.
    /// Used to mint node identities and in randomized test scenarios.
    pub fn random() -> Id {
        let mut raw = [0u8; ID_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        Id(raw)
    }

    /// The XOR distance between two identifiers: an unsigned big-endian
    /// integer, so the usual `Ord` on `Id` sorts by distance once this
    /// method has produced the distance value.
    pub fn distance(a: &Id, b: &Id) -> Id {
        a ^ b
    }

    /// `floor(log2(distance))`, i.e. the position of the highest set bit in
    /// `self XOR other`, counting from the least significant bit. `None`
    /// iff the two identifiers are equal (distance zero has no bit set).
    pub fn bucket_index(&self, other: &Id) -> Option<usize> {
        let distance = Id::distance(self, other);
        distance.highest_set_bit()
    }

    fn highest_set_bit(&self) -> Option<usize> {
        for (i, byte) in self.0.iter().enumerate() {
            if *byte != 0 {
                let bit_in_byte = 7 - byte.leading_zeros() as usize;
                let byte_from_lsb = ID_BYTES - 1 - i;
                return Some(byte_from_lsb * 8 + bit_in_byte);
            }
        }
        None
    }

    /// Raw big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }
}

impl BitXor for &Id {
    type Output = Id;

    fn bitxor(self, other: &Id) -> Id {
        let mut raw = [0u8; ID_BYTES];
        for (out, a, b) in izip!(raw.iter_mut(), self.0.iter(), other.0.iter()) {
            *out = a ^ b;
        }
        Id(raw)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
