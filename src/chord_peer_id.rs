//! Peer Identifier Generation
//!
//! Ring ids are derived by hashing a random seed and keeping the last
//! `bits / 4` hex digits of the digest, which places them in `[0, 2^bits)`
//! by construction. Query keys are drawn the same way.

use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::chord_error::{Error, Result};
use crate::chord_interface::Identifier;
use crate::chord_ring::IdentifierSpace;

/// Hash collaborator: maps a seed string to a hexadecimal digest.
///
/// Implementations must be deterministic per input and produce at least
/// `bits / 4` hex characters.
pub trait DigestProvider {
    fn hex_digest(&mut self, seed: &str) -> Result<String>;
}

/// Blake3 digest, 64 hex characters
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Digest;

impl DigestProvider for Blake3Digest {
    fn hex_digest(&mut self, seed: &str) -> Result<String> {
        Ok(blake3::hash(seed.as_bytes()).to_hex().to_string())
    }
}

/// Produces ring identifiers from random seeds
pub struct PeerIdGenerator<D: DigestProvider> {
    digest: D,
    rng: StdRng,
    hex_digits: usize,
}

impl<D: DigestProvider> PeerIdGenerator<D> {
    pub fn new(space: &IdentifierSpace, digest: D, seed: [u8; 32]) -> Self {
        Self {
            digest,
            rng: StdRng::from_seed(seed),
            hex_digits: space.hex_digits(),
        }
    }

    /// Draw a fresh identifier. Uniqueness is the caller's concern.
    pub fn generate(&mut self) -> Result<Identifier> {
        let seed = self.rng.gen::<i64>().to_string();
        let digest = self.digest.hex_digest(&seed)?;

        if digest.len() < self.hex_digits || !digest.is_ascii() {
            return Err(Error::DigestUnavailable(format!(
                "digest '{}' is shorter than {} hex digits",
                digest, self.hex_digits
            )));
        }

        let tail = &digest[digest.len() - self.hex_digits..];
        BigUint::parse_bytes(tail.as_bytes(), 16).ok_or_else(|| {
            Error::DigestUnavailable(format!("digest '{}' is not hexadecimal", digest))
        })
    }
}
