//! Public key cache with request coalescing.
//!
//! Every entry traces to a successful resolver fetch; failures are never
//! cached. Concurrent misses for the same key id share one upstream fetch
//! through an in-flight map of `OnceCell`s: the first caller drives the
//! fetch, later callers await the same cell and observe the same outcome.
//! If the driving caller is cancelled the cell stays empty, nothing is
//! committed, and a remaining waiter takes over the fetch. The last caller
//! to leave a cell removes it from the in-flight map, whether it finished or
//! was dropped.

use crate::errors::KeySetError;
use crate::observability::metrics::record_key_cache_lookup;
use crate::resolver::KeySetResolver;
use chrono::{DateTime, Utc};
use common::clock::Clock;
use common::jwks::PublicKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::instrument;

type FetchCell = OnceCell<Result<Arc<PublicKey>, KeySetError>>;
type InFlight = Mutex<HashMap<String, Flight>>;

struct Flight {
    cell: Arc<FetchCell>,
    /// Callers currently holding a [`FlightGuard`] on `cell`.
    waiters: usize,
}

/// One caller's claim on an in-flight cell.
///
/// Dropping it removes the flight from the map once the cell is settled or
/// the last waiter has left. Runs on cancellation too.
struct FlightGuard<'a> {
    in_flight: &'a InFlight,
    kid: &'a str,
    cell: Arc<FetchCell>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(flight) = in_flight.get_mut(self.kid) else {
            return;
        };
        if !Arc::ptr_eq(&flight.cell, &self.cell) {
            return;
        }

        flight.waiters = flight.waiters.saturating_sub(1);
        if flight.waiters == 0 || self.cell.initialized() {
            in_flight.remove(self.kid);
        }
    }
}

#[derive(Debug)]
struct CachedKey {
    key: Arc<PublicKey>,
    fetched_at: DateTime<Utc>,
}

/// Caches resolved public keys by key id.
pub struct PublicKeyCache {
    resolver: Arc<dyn KeySetResolver>,
    clock: Arc<dyn Clock>,
    /// `None` keeps entries for the process lifetime.
    ttl: Option<Duration>,
    entries: RwLock<HashMap<String, CachedKey>>,
    in_flight: InFlight,
}

impl PublicKeyCache {
    pub fn new(
        resolver: Arc<dyn KeySetResolver>,
        clock: Arc<dyn Clock>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            resolver,
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn namespace(&self) -> &str {
        self.resolver.namespace()
    }

    /// Public key for `kid`, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// The resolver's error for this fetch. Shared by every caller that
    /// coalesced onto it and not cached.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_public_key(&self, kid: &str) -> Result<Arc<PublicKey>, KeySetError> {
        if let Some(key) = self.lookup(kid).await {
            record_key_cache_lookup("hit");
            return Ok(key);
        }

        let (guard, leader) = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let (cell, leader) = match in_flight.get_mut(kid) {
                Some(flight) => {
                    flight.waiters += 1;
                    (Arc::clone(&flight.cell), false)
                }
                None => {
                    let cell = Arc::new(FetchCell::new());
                    in_flight.insert(
                        kid.to_string(),
                        Flight {
                            cell: Arc::clone(&cell),
                            waiters: 1,
                        },
                    );
                    (cell, true)
                }
            };
            let guard = FlightGuard {
                in_flight: &self.in_flight,
                kid,
                cell,
            };
            (guard, leader)
        };

        if leader {
            record_key_cache_lookup("miss");
        } else {
            record_key_cache_lookup("coalesced");
            tracing::debug!(target: "sts.verifier.cache", kid = %kid, "Joining in-flight key fetch");
        }

        let result = guard
            .cell
            .get_or_init(|| self.fetch_and_commit(kid))
            .await
            .clone();
        drop(guard);

        result
    }

    /// Number of key ids with a fetch currently in flight.
    pub fn pending_fetches(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether a fresh entry exists for `kid`.
    pub async fn contains(&self, kid: &str) -> bool {
        self.lookup(kid).await.is_some()
    }

    /// Number of committed entries, fresh or stale.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn lookup(&self, kid: &str) -> Option<Arc<PublicKey>> {
        let entries = self.entries.read().await;
        let entry = entries.get(kid)?;

        if let Some(ttl) = self.ttl {
            let age = (self.clock.now() - entry.fetched_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if age >= ttl {
                tracing::debug!(target: "sts.verifier.cache", kid = %kid, "Cached key is stale");
                return None;
            }
        }

        Some(Arc::clone(&entry.key))
    }

    async fn fetch_and_commit(&self, kid: &str) -> Result<Arc<PublicKey>, KeySetError> {
        // A flight that finished just before ours may have committed already
        if let Some(key) = self.lookup(kid).await {
            return Ok(key);
        }

        let key = match self.resolver.fetch_key(kid).await {
            Ok(key) => key,
            Err(e) => {
                match &e {
                    KeySetError::Unavailable(_) => {
                        tracing::warn!(target: "sts.verifier.cache", kid = %kid, error = %e, "Key fetch failed")
                    }
                    KeySetError::KeyNotFound(_) => {
                        // Rotated out upstream: drop any stale entry
                        if self.entries.write().await.remove(kid).is_some() {
                            tracing::debug!(target: "sts.verifier.cache", kid = %kid, "Evicted key no longer in key set");
                        } else {
                            tracing::debug!(target: "sts.verifier.cache", kid = %kid, "Key not in key set");
                        }
                    }
                }
                return Err(e);
            }
        };

        if key.kid() != kid {
            tracing::warn!(
                target: "sts.verifier.cache",
                kid = %kid,
                returned_kid = %key.kid(),
                "Resolver returned a different key id"
            );
            return Err(KeySetError::Unavailable(format!(
                "resolver returned key {} for {kid}",
                key.kid()
            )));
        }

        let key = Arc::new(key);
        self.entries.write().await.insert(
            kid.to_string(),
            CachedKey {
                key: Arc::clone(&key),
                fetched_at: self.clock.now(),
            },
        );

        tracing::debug!(target: "sts.verifier.cache", kid = %kid, namespace = %self.namespace(), "Cached public key");
        Ok(key)
    }
}
