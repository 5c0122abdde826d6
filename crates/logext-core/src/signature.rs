//! Signature hashing for log statements
//!
//! A signature identifies one logical log statement by its caller file, caller
//! line and message. Events with equal signatures are folded into the same
//! aggregated record.
//!
//! The signature is a 64-bit xxh3 digest. Two different statements that
//! collide are treated as the same record; at 64 bits the chance of that is
//! negligible for the number of distinct statements a process emits.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// Deterministic identity of a log statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogSignature(u64);

impl LogSignature {
    /// Hash (file, line, message) into a signature
    ///
    /// Field boundaries are delimited so `("ab", 1, "c")` and `("a", 1, "bc")`
    /// hash differently.
    pub fn compute(file: &str, line: u32, message: &str) -> Self {
        let mut hasher = Xxh3::new();
        hasher.update(file.as_bytes());
        hasher.update(&[0xff]);
        hasher.update(&line.to_le_bytes());
        hasher.update(&[0xff]);
        hasher.update(message.as_bytes());
        Self(hasher.digest())
    }

    #[inline]
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LogSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_input_same_signature() {
        let a = LogSignature::compute("a.go", 10, "hello");
        let b = LogSignature::compute("a.go", 10, "hello");
        assert_eq!(a, b);
    }

    #[test]
    fn test_each_component_matters() {
        let base = LogSignature::compute("a.go", 10, "hello");
        assert_ne!(base, LogSignature::compute("b.go", 10, "hello"));
        assert_ne!(base, LogSignature::compute("a.go", 11, "hello"));
        assert_ne!(base, LogSignature::compute("a.go", 10, "world"));
    }

    #[test]
    fn test_field_boundaries() {
        assert_ne!(
            LogSignature::compute("ab", 1, "c"),
            LogSignature::compute("a", 1, "bc")
        );
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(LogSignature::from_raw(0xab).to_string(), "00000000000000ab");
    }
}
