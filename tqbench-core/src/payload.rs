//! Fixed-size pseudorandom payload served to every connection.

use bytes::Bytes;
use rand::RngCore;
use std::time::Instant;
use tqbench_common::{BenchError, Result};
use tracing::info;

/// Immutable payload block, generated once per server process.
///
/// Cloning is a reference-count bump; every connection handler writes from the
/// same allocation.
#[derive(Debug, Clone)]
pub struct Payload {
    bytes: Bytes,
}

impl Payload {
    /// Fill `size` bytes from the thread-local CSPRNG so the content is uniform
    /// and does not compress.
    pub fn generate(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(BenchError::Config("payload size must be non-zero".into()));
        }

        let start = Instant::now();
        let mut buf = vec![0u8; size];
        rand::rng().fill_bytes(&mut buf);
        info!(
            "Generated {} bytes of random payload in {:.2?}",
            size,
            start.elapsed()
        );

        Ok(Self {
            bytes: Bytes::from(buf),
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Cheap handle to the shared bytes.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
