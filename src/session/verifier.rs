use crate::pkce::CodeVerifier;
use crate::session::clock::Clock;
use crate::session::error::AuthError;
use crate::storage::{KeyValueStore, StorageError};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage key of the pending verifier slot
pub const VERIFIER_KEY: &str = "spotify_verifier";

/// How long a saved verifier may be redeemed, in milliseconds
pub const VERIFIER_MAX_AGE_MS: i64 = 300_000;

#[derive(Debug, Serialize, Deserialize)]
struct VerifierRecord {
    verifier: CodeVerifier,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

/// Single persisted slot for the code verifier of the login in flight
///
/// Writes go straight through to the store so the verifier survives the
/// round trip to the provider's consent page.
pub struct VerifierStore<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S: KeyValueStore, C: Clock> VerifierStore<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Overwrite the slot with `verifier`, stamped with the current time
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the slot cannot be written.
    pub fn save(&self, verifier: &CodeVerifier) -> Result<(), AuthError> {
        let record = VerifierRecord {
            verifier: verifier.clone(),
            timestamp: self.clock.now(),
        };
        let json = serde_json::to_string(&record).map_err(|source| StorageError::Serialize {
            key: VERIFIER_KEY.to_string(),
            source,
        })?;
        self.store.set(VERIFIER_KEY, &json)?;
        debug!("Saved code verifier ({} chars)", verifier.len());
        Ok(())
    }

    /// Return the saved verifier if it is at most five minutes old
    ///
    /// The verifier stays in the slot; callers clear it once it has been
    /// spent. A stale or unreadable record is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::VerifierMissing`] when the slot is empty or
    /// corrupt, [`AuthError::VerifierExpired`] when the record is too old and
    /// [`AuthError::Storage`] if the store fails.
    pub fn take_if_fresh(&self) -> Result<CodeVerifier, AuthError> {
        let Some(raw) = self.store.get(VERIFIER_KEY)? else {
            return Err(AuthError::VerifierMissing);
        };

        let record = match serde_json::from_str::<VerifierRecord>(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!("Discarding unreadable code verifier record: {err}");
                self.store.remove(VERIFIER_KEY)?;
                return Err(AuthError::VerifierMissing);
            }
        };

        let age_ms = self.age_ms(&record);
        if age_ms > VERIFIER_MAX_AGE_MS {
            debug!("Code verifier is {age_ms} ms old, discarding");
            self.store.remove(VERIFIER_KEY)?;
            return Err(AuthError::VerifierExpired);
        }

        Ok(record.verifier)
    }

    /// Empty the slot; clearing an empty slot is a no-op
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the slot cannot be removed.
    pub fn clear(&self) -> Result<(), AuthError> {
        self.store.remove(VERIFIER_KEY)?;
        Ok(())
    }

    /// Whether a readable verifier young enough to redeem is waiting
    ///
    /// Unlike [`VerifierStore::take_if_fresh`] this never deletes anything.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the store cannot be read.
    pub fn is_pending(&self) -> Result<bool, AuthError> {
        let Some(raw) = self.store.get(VERIFIER_KEY)? else {
            return Ok(false);
        };
        Ok(serde_json::from_str::<VerifierRecord>(&raw)
            .is_ok_and(|record| self.age_ms(&record) <= VERIFIER_MAX_AGE_MS))
    }

    fn age_ms(&self, record: &VerifierRecord) -> i64 {
        (self.clock.now() - record.timestamp).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkce::generate_verifier;
    use crate::storage::MemoryStore;
    use crate::testing::ManualClock;
    use chrono::TimeDelta;

    fn verifier_store() -> (VerifierStore<MemoryStore, ManualClock>, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        (
            VerifierStore::new(Arc::clone(&store), Arc::clone(&clock)),
            store,
            clock,
        )
    }

    #[test]
    fn test_round_trip_within_window() {
        let (verifiers, _store, clock) = verifier_store();
        let verifier = generate_verifier();

        verifiers.save(&verifier).unwrap();
        clock.advance(TimeDelta::seconds(300));

        assert_eq!(verifiers.take_if_fresh().unwrap(), verifier);
        // Still there until explicitly cleared
        assert!(verifiers.is_pending().unwrap());
    }

    #[test]
    fn test_expired_verifier_is_removed() {
        let (verifiers, store, clock) = verifier_store();
        verifiers.save(&generate_verifier()).unwrap();

        clock.advance(TimeDelta::seconds(301));

        assert_eq!(verifiers.take_if_fresh(), Err(AuthError::VerifierExpired));
        assert!(store.get(VERIFIER_KEY).unwrap().is_none());
        assert_eq!(verifiers.take_if_fresh(), Err(AuthError::VerifierMissing));
    }

    #[test]
    fn test_stale_record_is_not_pending() {
        let (verifiers, store, clock) = verifier_store();
        let saved_at = clock.now();
        verifiers.save(&generate_verifier()).unwrap();

        clock.set(saved_at + TimeDelta::seconds(300));
        assert!(verifiers.is_pending().unwrap());

        clock.set(saved_at + TimeDelta::seconds(301));
        assert!(!verifiers.is_pending().unwrap());
        // Only a redemption attempt discards the record
        assert!(store.get(VERIFIER_KEY).unwrap().is_some());
    }

    #[test]
    fn test_missing_verifier() {
        let (verifiers, _store, _clock) = verifier_store();
        assert_eq!(verifiers.take_if_fresh(), Err(AuthError::VerifierMissing));
    }

    #[test]
    fn test_second_save_overwrites_first() {
        let (verifiers, _store, _clock) = verifier_store();
        let first = generate_verifier();
        let second = generate_verifier();

        verifiers.save(&first).unwrap();
        verifiers.save(&second).unwrap();

        assert_eq!(verifiers.take_if_fresh().unwrap(), second);
    }

    #[test]
    fn test_corrupt_record_treated_as_absent() {
        let (verifiers, store, _clock) = verifier_store();
        store
            .set(VERIFIER_KEY, r#"{"verifier":"short","timestamp":0}"#)
            .unwrap();

        assert_eq!(verifiers.take_if_fresh(), Err(AuthError::VerifierMissing));
        assert!(!verifiers.is_pending().unwrap());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (verifiers, _store, _clock) = verifier_store();
        verifiers.save(&generate_verifier()).unwrap();

        verifiers.clear().unwrap();
        verifiers.clear().unwrap();

        assert!(!verifiers.is_pending().unwrap());
    }

    #[test]
    fn test_persisted_record_shape() {
        let (verifiers, store, clock) = verifier_store();
        verifiers.save(&generate_verifier()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&store.get(VERIFIER_KEY).unwrap().unwrap()).unwrap();
        assert!(json["verifier"].is_string());
        assert_eq!(
            json["timestamp"].as_i64(),
            Some(clock.now().timestamp_millis())
        );
    }
}
