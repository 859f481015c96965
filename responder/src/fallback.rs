//! Weighted-random selection over canned responses.

use std::sync::Arc;

use cake_core::{StaticResponse, Subject};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::store::ConfigurationStore;

pub struct FallbackSelector {
    store: Arc<ConfigurationStore>,
    rng: Mutex<StdRng>,
}

impl FallbackSelector {
    /// Seeded selectors produce the same sequence of picks for the same
    /// sequence of calls.
    pub fn new(store: Arc<ConfigurationStore>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    pub fn select(&self, subject: Subject, context_tag: &str, mood: &str) -> StaticResponse {
        let candidates = self.store.get_fallback_responses(subject, context_tag, mood);
        self.pick_weighted(&candidates)
            .cloned()
            .unwrap_or_else(|| StaticResponse::generic(subject, context_tag))
    }

    /// Draws uniformly over the cumulative weight sum. `None` only for an
    /// empty slice.
    pub fn pick_weighted<'a>(
        &self,
        candidates: &'a [StaticResponse],
    ) -> Option<&'a StaticResponse> {
        let cumulative: Vec<u64> = candidates
            .iter()
            .scan(0u64, |total, r| {
                *total += u64::from(r.weight.max(1));
                Some(*total)
            })
            .collect();
        let total = *cumulative.last()?;

        let draw = self.rng.lock().gen_range(0..total);
        let idx = cumulative.partition_point(|&bound| bound <= draw);
        candidates.get(idx)
    }
}
