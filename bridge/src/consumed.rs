//! Consumed-nonce tracking for one source chain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Nonces already credited from one source.
///
/// Sources number their messages 0, 1, 2, ... so almost every consumed
/// nonce sits below `watermark`. Only nonces delivered ahead of a gap are
/// kept individually.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedNonces {
    /// Every nonce below this has been consumed.
    watermark: u64,
    /// Consumed nonces at or above the watermark.
    sparse: BTreeSet<u64>,
}

impl ConsumedNonces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nonce: u64) -> bool {
        nonce < self.watermark || self.sparse.contains(&nonce)
    }

    /// Mark `nonce` consumed. Returns false if it already was.
    pub fn insert(&mut self, nonce: u64) -> bool {
        if self.contains(nonce) {
            return false;
        }
        self.sparse.insert(nonce);
        while self.watermark < u64::MAX && self.sparse.remove(&self.watermark) {
            self.watermark += 1;
        }
        true
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    /// Nonces held individually because a lower one is still outstanding.
    pub fn sparse_len(&self) -> usize {
        self.sparse.len()
    }

    pub fn len(&self) -> u64 {
        self.watermark.saturating_add(self.sparse.len() as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_nonces_collapse_into_the_watermark() {
        let mut consumed = ConsumedNonces::new();
        for nonce in 0..100 {
            assert!(consumed.insert(nonce));
        }
        assert_eq!(consumed.watermark(), 100);
        assert_eq!(consumed.sparse_len(), 0);
        assert_eq!(consumed.len(), 100);
        assert!(consumed.contains(42));
        assert!(!consumed.contains(100));
    }

    #[test]
    fn gap_holds_later_nonces_until_filled() {
        let mut consumed = ConsumedNonces::new();
        assert!(consumed.insert(2));
        assert!(consumed.insert(1));
        assert_eq!(consumed.watermark(), 0);
        assert_eq!(consumed.sparse_len(), 2);
        assert!(!consumed.contains(0));

        assert!(consumed.insert(0));
        assert_eq!(consumed.watermark(), 3);
        assert_eq!(consumed.sparse_len(), 0);
    }

    #[test]
    fn second_insert_is_refused() {
        let mut consumed = ConsumedNonces::new();
        assert!(consumed.insert(0));
        assert!(!consumed.insert(0));
        assert!(consumed.insert(7));
        assert!(!consumed.insert(7));
        assert_eq!(consumed.len(), 2);
    }

    #[test]
    fn last_nonce_stays_sparse() {
        let mut consumed = ConsumedNonces::new();
        assert!(consumed.insert(u64::MAX));
        assert!(consumed.contains(u64::MAX));
        assert!(!consumed.insert(u64::MAX));
        assert_eq!(consumed.watermark(), 0);
    }
}
