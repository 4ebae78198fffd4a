//! Entropy source.
//!
//! All randomness (seeds, nonces) is drawn through [`EntropySource`] so an
//! environment without a working CSPRNG is detected up front and reported
//! as [`Error::CryptoUnavailable`] instead of failing halfway through.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// A cryptographically secure source of random bytes.
pub trait EntropySource: Send + Sync {
    /// Fill `dest` entirely or fail.
    fn try_fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Shared entropy source handle.
pub type SharedEntropy = Arc<dyn EntropySource>;

/// The operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn try_fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| Error::CryptoUnavailable(format!("OS random source failed: {}", e)))
    }
}

/// The default entropy source.
pub fn os_entropy() -> SharedEntropy {
    Arc::new(OsEntropy)
}

/// Check that `source` can produce bytes.
pub fn probe(source: &dyn EntropySource) -> Result<()> {
    let mut buf = [0u8; 16];
    let result = source.try_fill(&mut buf);
    buf.zeroize();
    result.map_err(|e| match e {
        Error::CryptoUnavailable(_) => e,
        other => Error::CryptoUnavailable(other.to_string()),
    })
}

/// `N` random bytes from `source`.
pub fn random_bytes<const N: usize>(source: &dyn EntropySource) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    source.try_fill(&mut bytes)?;
    Ok(bytes)
}

/// Entropy source that always fails.
#[cfg(test)]
pub(crate) struct FailingEntropy;

#[cfg(test)]
impl EntropySource for FailingEntropy {
    fn try_fill(&self, _dest: &mut [u8]) -> Result<()> {
        Err(Error::CryptoUnavailable("no secure random source".into()))
    }
}
