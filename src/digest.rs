//! Digest function behind every fingerprint in the lab
//!
//! SHA-256 over the UTF-8 bytes of a text preimage, rendered as 64 lowercase
//! hex characters. Batches of digests are computed on a rayon pool inside
//! `spawn_blocking` so an async caller never blocks its scheduler.

use crate::errors::DigestError;
use rayon::prelude::*;
use sha2::{Digest as _, Sha256};
use std::sync::Arc;

/// Length of a hex fingerprint
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Text-to-hex digest primitive
pub trait Digester: Send + Sync + 'static {
    fn digest(&self, text: &str) -> Result<String, DigestError>;
}

/// Default SHA-256 digester
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digester;

impl Digester for Sha256Digester {
    fn digest(&self, text: &str) -> Result<String, DigestError> {
        Ok(sha256_hex(text))
    }
}

/// SHA-256 of `text`, lowercase hex
pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Resolve digest worker threads: explicit override wins, otherwise all
/// logical cores.
pub fn resolve_digest_threads(explicit: Option<usize>) -> usize {
    let cores = num_cpus::get().max(1);
    match explicit {
        Some(n) if n > 0 => n.min(cores * 2),
        _ => cores,
    }
}

/// Worker pool computing nonce batches for one digester
#[derive(Clone)]
pub struct DigestPool {
    digester: Arc<dyn Digester>,
    pool: Arc<rayon::ThreadPool>,
}

impl DigestPool {
    pub fn new(digester: Arc<dyn Digester>, threads: Option<usize>) -> Result<Self, DigestError> {
        let threads = resolve_digest_threads(threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("digest-{i}"))
            .build()
            .map_err(|e| DigestError::Unavailable(e.to_string()))?;
        tracing::debug!(threads, "digest pool ready");
        Ok(Self {
            digester,
            pool: Arc::new(pool),
        })
    }

    /// SHA-256 pool sized from the machine
    pub fn sha256() -> Result<Self, DigestError> {
        Self::new(Arc::new(Sha256Digester), None)
    }

    pub fn digester(&self) -> &Arc<dyn Digester> {
        &self.digester
    }

    /// Digest a single text on the caller's thread
    pub fn digest(&self, text: &str) -> Result<String, DigestError> {
        self.digester.digest(text)
    }

    /// Digest `prefix + nonce` for `len` consecutive nonces starting at
    /// `start`. Results come back indexed by nonce order regardless of which
    /// worker finished first.
    pub async fn digest_batch(
        &self,
        prefix: Arc<str>,
        start: u64,
        len: usize,
    ) -> Result<Vec<Result<String, DigestError>>, DigestError> {
        let digester = self.digester.clone();
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            pool.install(|| {
                (0..len)
                    .into_par_iter()
                    .map(|i| {
                        let nonce = start + i as u64;
                        digester.digest(&format!("{prefix}{nonce}"))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await
        .map_err(|e| DigestError::Worker(e.to_string()))
    }
}

impl std::fmt::Debug for DigestPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestPool")
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vectors() {
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_is_deterministic() {
        for text in ["", "hello", "Genesis Block: 100 coins", "üñî©ødé"] {
            let a = sha256_hex(text);
            let b = sha256_hex(text);
            assert_eq!(a, b);
            assert_eq!(a.len(), FINGERPRINT_HEX_LEN);
        }
    }

    #[test]
    fn explicit_thread_override_is_clamped() {
        let cores = num_cpus::get().max(1);
        assert_eq!(resolve_digest_threads(Some(1)), 1);
        assert_eq!(resolve_digest_threads(Some(0)), cores);
        assert_eq!(resolve_digest_threads(None), cores);
        assert_eq!(resolve_digest_threads(Some(usize::MAX / 4)), cores * 2);
    }

    #[tokio::test]
    async fn batch_results_follow_nonce_order() {
        let pool = DigestPool::new(Arc::new(Sha256Digester), Some(4)).unwrap();
        let results = pool.digest_batch(Arc::from("abc"), 10, 8).await.unwrap();
        assert_eq!(results.len(), 8);
        for (i, r) in results.into_iter().enumerate() {
            assert_eq!(r.unwrap(), sha256_hex(&format!("abc{}", 10 + i)));
        }
    }
}
