//! Webhook signature verification and delivery deduplication.
//!
//! The signature check runs over the raw body bytes before any payload
//! parsing and before the idempotency check, so an invalid signature can
//! never influence the dedup cache.
//!
//! The delivery cache is a best-effort optimization: it is bounded,
//! insertion-ordered, and explicitly allowed to lose entries on restart.
//! At-least-once redelivery at the boundary makes recomputation safe.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a webhook HMAC signature header against the raw body.
///
/// The header must have the form `<algo>=<hex>`; `sha256` is the only
/// supported digest. Any malformed header returns `false`, never an error,
/// and the comparison is constant-time.
pub fn verify_signature(secret: &str, signature_header: &str, raw_body: &[u8]) -> bool {
    let Some((algo, hex_digest)) = signature_header.split_once('=') else {
        return false;
    };
    if algo != "sha256" {
        return false;
    }
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);
    // verify_slice is constant-time over the full digest length.
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature header value for a body, for outbound use and tests.
pub fn sign_body(secret: &str, raw_body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(raw_body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Default capacity of the processed-delivery set.
pub const DEFAULT_DELIVERY_CAPACITY: usize = 10_000;

struct DeliverySet {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

/// Bounded, insertion-ordered set of processed delivery ids.
///
/// Check-and-insert is atomic under one lock so two concurrent deliveries
/// of the same id cannot both miss the cache. When the cap is exceeded the
/// oldest entry is evicted first.
pub struct DeliveryCache {
    capacity: usize,
    inner: Mutex<DeliverySet>,
}

impl DeliveryCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_DELIVERY_CAPACITY)
    }

    /// Create a cache holding at most `capacity` delivery ids.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(DeliverySet {
                seen: HashSet::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Return whether `delivery_id` was already processed, inserting it if
    /// unseen and evicting the oldest entry past capacity.
    pub fn is_duplicate(&self, delivery_id: &str) -> bool {
        let mut inner = self.inner.lock().expect("delivery cache lock poisoned");
        if inner.seen.contains(delivery_id) {
            return true;
        }
        inner.seen.insert(delivery_id.to_string());
        inner.order.push_back(delivery_id.to_string());
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }
        false
    }

    /// Number of delivery ids currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("delivery cache lock poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeliveryCache {
    fn default() -> Self {
        Self::new()
    }
}
