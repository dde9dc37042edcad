//! Property-based test generators using proptest.
//!
//! Provides strategies for comparator inputs, engine keys and fixed-stride
//! record pages.

use proptest::prelude::*;

/// Strategy for arbitrary comparator inputs, including empty buffers and
/// embedded NUL bytes.
pub fn bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..48)
}

/// Strategy for buffers drawn from a small alphabet, so that shared
/// prefixes and exact duplicates are common.
pub fn narrow_bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![0u8, 1, b'a', 0xff]), 0..6)
}

/// Strategy for short keys the engine accepts.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..64)
}

/// Strategy for a set of distinct keys.
pub fn distinct_keys_strategy(max: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::btree_set(key_strategy(), 1..max.max(2))
        .prop_map(|keys| keys.into_iter().collect())
}

/// A page of fixed-size records for a multi-value put.
#[derive(Debug, Clone)]
pub struct RecordPage {
    /// Record size in bytes.
    pub stride: usize,
    /// Concatenated records.
    pub page: Vec<u8>,
}

impl RecordPage {
    /// Number of records in the page.
    pub fn count(&self) -> usize {
        self.page.len() / self.stride
    }

    /// Iterates over the records.
    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        self.page.chunks_exact(self.stride)
    }
}

/// Strategy for a congruent record page of 1 to `max_records` records.
pub fn record_page_strategy(max_records: usize) -> impl Strategy<Value = RecordPage> {
    (1usize..=8, 1..max_records.max(2)).prop_flat_map(|(stride, count)| {
        prop::collection::vec(any::<u8>(), stride * count)
            .prop_map(move |page| RecordPage { stride, page })
    })
}

/// Strategy for a `(page length, stride)` pair that is not congruent.
pub fn incongruent_page_strategy() -> impl Strategy<Value = (Vec<u8>, usize)> {
    (2usize..=8, 0usize..8).prop_flat_map(|(stride, whole)| {
        (1..stride).prop_flat_map(move |extra| {
            prop::collection::vec(any::<u8>(), stride * whole + extra)
                .prop_map(move |page| (page, stride))
        })
    })
}

/// Proptest configuration for tests that drive a whole engine per case.
pub fn engine_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        max_shrink_iters: 256,
        ..ProptestConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmbridge_engine::sys::MAX_KEY_SIZE;

    proptest! {
        #[test]
        fn record_pages_are_congruent(page in record_page_strategy(16)) {
            prop_assert_eq!(page.page.len() % page.stride, 0);
            prop_assert_eq!(page.records().count(), page.count());
        }

        #[test]
        fn incongruent_pages_have_remainder((page, stride) in incongruent_page_strategy()) {
            prop_assert_ne!(page.len() % stride, 0);
        }

        #[test]
        fn keys_are_accepted_sizes(key in key_strategy()) {
            prop_assert!(!key.is_empty() && key.len() <= MAX_KEY_SIZE);
        }
    }
}
