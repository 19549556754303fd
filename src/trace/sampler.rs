//! Agent-side samplers.
//!
//! The client can only opt out of sampling (`Pinpoint-Sampled: s0`). Whether
//! an opted-in request is actually recorded is decided here.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::propagation::TraceId;

/// Decides whether a trace records span content.
pub trait Sampler: Send + Sync + Debug {
    /// Decision for a trace started at this agent.
    fn is_sampling(&self) -> bool;

    /// Decision for a trace continued from an upstream caller.
    fn is_continue_sampling(&self, _trace_id: &TraceId) -> bool {
        true
    }
}

/// Samples everything.
#[derive(Debug, Default)]
pub struct TrueSampler;

impl Sampler for TrueSampler {
    fn is_sampling(&self) -> bool {
        true
    }
}

/// Samples nothing started locally.
#[derive(Debug, Default)]
pub struct FalseSampler;

impl Sampler for FalseSampler {
    fn is_sampling(&self) -> bool {
        false
    }
}

/// Samples one new trace out of every `rate`.
#[derive(Debug)]
pub struct RateSampler {
    rate: u64,
    counter: AtomicU64,
}

impl RateSampler {
    pub fn new(rate: u32) -> Self {
        Self {
            rate: u64::from(rate.max(1)),
            counter: AtomicU64::new(0),
        }
    }
}

impl Sampler for RateSampler {
    fn is_sampling(&self) -> bool {
        self.counter.fetch_add(1, Ordering::Relaxed) % self.rate == 0
    }
}

/// Build a sampler for a configured rate (0 = never, 1 = always, n = 1 in n).
pub fn from_rate(rate: u32) -> Box<dyn Sampler> {
    match rate {
        0 => Box::new(FalseSampler),
        1 => Box::new(TrueSampler),
        n => Box::new(RateSampler::new(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_sampler() {
        let sampler = RateSampler::new(3);
        let decisions: Vec<bool> = (0..6).map(|_| sampler.is_sampling()).collect();
        assert_eq!(decisions, vec![true, false, false, true, false, false]);
    }

    #[test]
    fn test_from_rate() {
        assert!(!from_rate(0).is_sampling());
        assert!(from_rate(1).is_sampling());

        let id = TraceId::new("T1", 1, 2, 0);
        assert!(from_rate(0).is_continue_sampling(&id));
    }
}
