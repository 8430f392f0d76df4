//! Session persistence.
//!
//! The [`SessionStore`] trait is the single side-effecting dependency of the
//! [`SessionManager`](crate::SessionManager). [`MemorySessionStore`] keeps
//! everything in process memory with a TTL and is suitable for a single
//! gateway instance; deployments with several instances plug in a shared
//! store.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::address::Address;
use crate::session::{CheckoutId, PaymentSession};

/// Key-value store of payment sessions, scoped per checkout session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the most recently stored session for `checkout`, if any.
    async fn get(&self, checkout: &CheckoutId) -> Option<PaymentSession>;

    /// Stores `session` for `checkout`, replacing any previous one.
    async fn put(&self, checkout: &CheckoutId, session: PaymentSession);

    /// Records that `reference` was issued to `checkout`.
    ///
    /// Returns `false` if the reference was already issued to a different
    /// checkout. Claiming the same reference again for the same checkout
    /// succeeds.
    async fn claim_reference(&self, reference: &Address, checkout: &CheckoutId) -> bool;
}

/// A stored value and the instant it stops being valid.
#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory [`SessionStore`] backed by concurrent maps.
///
/// Sessions and reference claims expire after a TTL, like the host's
/// checkout session. Expired entries are dropped on lookup and pruned
/// whenever a new entry is written, so memory is bounded by what was issued
/// within one TTL.
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: DashMap<CheckoutId, Expiring<PaymentSession>>,
    references: DashMap<Address, Expiring<CheckoutId>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(Self::DEFAULT_TTL)
    }
}

impl MemorySessionStore {
    /// Default lifetime of a session and its reference claim (24 hours).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates an empty store using [`Self::DEFAULT_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose entries live for `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: DashMap::new(),
            references: DashMap::new(),
        }
    }

    /// Returns the entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored sessions, including expired ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of reference claims, including expired ones not yet pruned.
    #[must_use]
    pub fn claimed_references(&self) -> usize {
        self.references.len()
    }

    /// Drops every expired session and reference claim.
    pub fn prune_expired(&self) {
        let now = Instant::now();
        self.sessions.retain(|_, entry| entry.is_live(now));
        self.references.retain(|_, entry| entry.is_live(now));
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, checkout: &CheckoutId) -> Option<PaymentSession> {
        let now = Instant::now();
        let found = self
            .sessions
            .get(checkout)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match found {
            Some(Some(session)) => Some(session),
            Some(None) => {
                self.sessions
                    .remove_if(checkout, |_, entry| !entry.is_live(now));
                None
            }
            None => None,
        }
    }

    async fn put(&self, checkout: &CheckoutId, session: PaymentSession) {
        self.prune_expired();
        let expires_at = Instant::now() + self.ttl;
        // A claim lives at least as long as the session it guards.
        self.references.alter(&session.reference, |_, mut claim| {
            if claim.value == *checkout {
                claim.expires_at = claim.expires_at.max(expires_at);
            }
            claim
        });
        self.sessions.insert(
            checkout.clone(),
            Expiring {
                value: session,
                expires_at,
            },
        );
    }

    async fn claim_reference(&self, reference: &Address, checkout: &CheckoutId) -> bool {
        self.prune_expired();
        let now = Instant::now();
        let claim = Expiring {
            value: checkout.clone(),
            expires_at: now + self.ttl,
        };
        match self.references.entry(*reference) {
            Entry::Occupied(mut owner) => {
                let current = owner.get();
                if current.is_live(now) && current.value != *checkout {
                    return false;
                }
                owner.insert(claim);
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(claim);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::currency::Currency;
    use crate::nonce::Nonce;

    fn session(amount: i64) -> PaymentSession {
        PaymentSession {
            recipient: Address::random(),
            reference: Address::random(),
            label: "Test Store".to_owned(),
            amount: Decimal::new(amount, 2),
            currency: Currency::Usdc,
            nonce: Nonce::generate(),
        }
    }

    #[tokio::test]
    async fn test_get_unknown_checkout_is_none() {
        let store = MemorySessionStore::new();
        assert!(store.get(&CheckoutId::from("nobody")).await.is_none());
        assert!(store.is_empty());
        assert_eq!(store.ttl(), MemorySessionStore::DEFAULT_TTL);
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_session() {
        let store = MemorySessionStore::new();
        let checkout = CheckoutId::from("cart-1");
        let first = session(1000);
        let second = session(2500);

        store.put(&checkout, first).await;
        store.put(&checkout, second.clone()).await;

        assert_eq!(store.get(&checkout).await, Some(second));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_reference_is_exclusive_per_checkout() {
        let store = MemorySessionStore::new();
        let reference = Address::random();
        let a = CheckoutId::from("a");
        let b = CheckoutId::from("b");

        assert!(store.claim_reference(&reference, &a).await);
        assert!(store.claim_reference(&reference, &a).await);
        assert!(!store.claim_reference(&reference, &b).await);
    }

    #[tokio::test]
    async fn test_expired_session_is_gone() {
        let store = MemorySessionStore::with_ttl(Duration::from_millis(200));
        let checkout = CheckoutId::from("cart-1");
        let issued = session(100);
        assert!(store.claim_reference(&issued.reference, &checkout).await);
        store.put(&checkout, issued.clone()).await;
        assert_eq!(store.get(&checkout).await, Some(issued));

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(store.get(&checkout).await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_writes_prune_expired_entries() {
        let store = MemorySessionStore::with_ttl(Duration::from_millis(200));
        for i in 0..100 {
            let checkout = CheckoutId::from(format!("cart-{i}"));
            let issued = session(100);
            assert!(store.claim_reference(&issued.reference, &checkout).await);
            store.put(&checkout, issued).await;
        }
        assert_eq!(store.len(), 100);
        assert_eq!(store.claimed_references(), 100);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let fresh = session(100);
        let checkout = CheckoutId::from("cart-new");
        assert!(store.claim_reference(&fresh.reference, &checkout).await);
        store.put(&checkout, fresh).await;

        assert_eq!(store.len(), 1);
        assert_eq!(store.claimed_references(), 1);
    }

    #[tokio::test]
    async fn test_expired_reference_claim_can_be_reissued() {
        let store = MemorySessionStore::with_ttl(Duration::from_millis(200));
        let reference = Address::random();

        assert!(store.claim_reference(&reference, &CheckoutId::from("a")).await);
        assert!(!store.claim_reference(&reference, &CheckoutId::from("b")).await);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(store.claim_reference(&reference, &CheckoutId::from("b")).await);
    }
}
