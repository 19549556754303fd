//! Client-supplied sampling override.
//!
//! The `Pinpoint-Sampled` header carries a token: `s0` disables sampling,
//! `s1` requests it. Only the exact token `s0` disables; anything else,
//! including an absent header, samples.

use axum::http::HeaderMap;

use crate::propagation::header;

/// Sampling tokens understood on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingFlag {
    Sample,
    DoNotSample,
}

impl SamplingFlag {
    /// Token that disables sampling.
    pub const FALSE_TOKEN: &'static str = "s0";
    /// Token that requests sampling.
    pub const TRUE_TOKEN: &'static str = "s1";

    /// Interpret an optional header value. Total over all inputs.
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(Self::FALSE_TOKEN) => SamplingFlag::DoNotSample,
            _ => SamplingFlag::Sample,
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            SamplingFlag::Sample => Self::TRUE_TOKEN,
            SamplingFlag::DoNotSample => Self::FALSE_TOKEN,
        }
    }

    pub fn is_sampled(&self) -> bool {
        matches!(self, SamplingFlag::Sample)
    }
}

/// Decide whether the inbound request asked to be sampled.
pub fn should_sample(headers: &HeaderMap) -> bool {
    let flag = header::get_lenient(headers, &header::SAMPLED);
    tracing::debug!(sampling_flag = ?flag, "SamplingFlag");
    SamplingFlag::from_header(flag).is_sampled()
}
