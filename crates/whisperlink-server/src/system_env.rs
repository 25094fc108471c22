//! Production `Environment` implementation using system time and RNG.
//!
//! `SystemEnv` backs the engine with real wall-clock time and OS
//! cryptographic randomness. Production behavior is therefore
//! non-deterministic; deterministic runs use the simulation environment
//! from the harness crate instead.

use whisperlink_core::env::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// Uses `std::time::SystemTime` for timestamps and getrandom for
/// randomness (e.g., /dev/urandom on Linux, `BCryptGenRandom` on
/// Windows). Participant and message ids derive from this RNG, so
/// security-grade randomness matters: ids must be unguessable.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional - a server without
/// functioning cryptographic randomness would hand out predictable
/// participant ids, and RNG failure indicates OS-level problems anyway.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn now_ms(&self) -> u64 {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("invariant: system clock is after Unix epoch (1970-01-01)");
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - ids would be predictable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_time_is_past_2023() {
        let env = SystemEnv::new();

        // 2023-01-01 in ms; catches seconds-vs-millis mixups
        assert!(env.now_ms() > 1_672_531_200_000);
    }

    #[test]
    fn system_env_random_bytes_are_random() {
        let env = SystemEnv::new();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];

        env.random_bytes(&mut bytes1);
        env.random_bytes(&mut bytes2);

        // Extremely unlikely to be equal if random
        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }

    #[test]
    fn system_env_uuids_are_unique() {
        let env = SystemEnv::new();

        assert_ne!(env.random_uuid(), env.random_uuid());
    }
}
