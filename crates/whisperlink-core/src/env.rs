//! Environment abstraction for deterministic testing.
//!
//! Decouples the pairing engine from system resources (wall-clock time,
//! randomness). Production uses `SystemEnv` from the server crate;
//! tests use the seeded `SimEnv` from the harness crate, making every id
//! and timestamp the engine produces reproducible.

/// Abstract environment providing time and randomness.
///
/// Implementations MUST guarantee:
///
/// - `now_ms()` never decreases within a single execution context
/// - `random_bytes()` uses cryptographically secure entropy in production
///   (ids double as unguessable session tokens)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time as Unix milliseconds.
    ///
    /// Used for message timestamps and room creation times. Monotonicity
    /// across calls is required; sub-millisecond precision is not.
    fn now_ms(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a fresh v4 UUID from this environment's randomness.
    ///
    /// Deterministic under a seeded environment, which keeps engine tests
    /// reproducible down to the generated ids.
    fn random_uuid(&self) -> uuid::Uuid {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}
