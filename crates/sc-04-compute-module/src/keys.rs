//! Entropy-seeded random number generator.
//!
//! Keys generated inside the module never come straight from the OS. The
//! UI side collects entropy from user input, and the generator seed is a hash
//! of that pool together with an equal amount of OS randomness, so a weak
//! source on either side does not weaken the keys.

use crate::error::ModuleError;
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};
use shared_crypto::kdf::hash_many;
use zeroize::Zeroize;

/// Minimum number of collected entropy bytes accepted as a seed source.
pub const MIN_ENTROPY: usize = 1024;

/// Bytes of OS randomness mixed into the seed.
const OS_ENTROPY: usize = 1024;

/// Output discarded before the generator is handed out.
const BURN_IN: usize = 1024;

/// CSPRNG seeded from collected entropy and the OS.
pub struct EntropyRng {
    inner: StdRng,
}

impl EntropyRng {
    /// Seed a generator from an exported entropy pool.
    pub fn from_entropy(entropy: &[u8]) -> Result<Self, ModuleError> {
        if entropy.len() < MIN_ENTROPY {
            return Err(ModuleError::NotEnoughEntropy {
                required: MIN_ENTROPY,
                actual: entropy.len(),
            });
        }

        let mut os = [0u8; OS_ENTROPY];
        OsRng.fill_bytes(&mut os);
        let mut seed = hash_many(&[entropy, &os]);
        os.zeroize();

        let mut inner = StdRng::from_seed(seed);
        seed.zeroize();

        let mut burn = [0u8; BURN_IN];
        inner.fill_bytes(&mut burn);
        burn.zeroize();

        Ok(Self { inner })
    }
}

impl RngCore for EntropyRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

impl CryptoRng for EntropyRng {}
