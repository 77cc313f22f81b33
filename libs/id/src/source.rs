//! Entropy sources for ID generation.

use rand::rngs::OsRng;
use rand::TryRngCore;
use uuid::{Builder, Uuid};

use crate::IdError;

/// A source of random bytes for new identifiers.
///
/// Implementations must be uniformly random; collision resistance of the
/// generated IDs rests entirely on that.
pub trait IdSource: Send + Sync {
    /// Fill 16 bytes of randomness.
    fn random_bytes(&self) -> Result<[u8; 16], IdError>;

    /// Produce a random (version 4) UUID from this source.
    fn next_uuid(&self) -> Result<Uuid, IdError> {
        let bytes = self.random_bytes()?;
        Ok(Builder::from_random_bytes(bytes).into_uuid())
    }
}

/// Operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl IdSource for OsRandomSource {
    fn random_bytes(&self) -> Result<[u8; 16], IdError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| IdError::Generation(e.to_string()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl IdSource for Broken {
        fn random_bytes(&self) -> Result<[u8; 16], IdError> {
            Err(IdError::Generation("entropy pool unavailable".to_string()))
        }
    }

    #[test]
    fn test_os_source_produces_v4() {
        let uuid = OsRandomSource.next_uuid().unwrap();
        assert_eq!(uuid.get_version_num(), 4);
    }

    #[test]
    fn test_os_source_is_not_constant() {
        let a = OsRandomSource.next_uuid().unwrap();
        let b = OsRandomSource.next_uuid().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_broken_source_propagates() {
        let err = Broken.next_uuid().unwrap_err();
        assert!(err.is_generation_error());
    }
}
