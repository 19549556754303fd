//! Client address resolution for the root span.
//!
//! # Variants
//! - Bypass: the `Host` header, verbatim
//! - RealIpHeader: a proxy-forwarded header such as `X-Forwarded-For`,
//!   falling back to `Host` when missing, empty or equal to the configured
//!   "empty" sentinel

use axum::http::{HeaderMap, HeaderName};

use crate::interceptor::error::TraceError;
use crate::propagation::header;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const UNKNOWN: &str = "unknown";

/// Strategy for picking the originating client address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAddressResolver {
    Bypass,
    RealIpHeader {
        header_name: HeaderName,
        empty_value: Option<String>,
    },
}

impl RemoteAddressResolver {
    /// Select the real-ip variant. Fails when no header name is given.
    pub fn real_ip_header(header_name: Option<&str>, empty_value: Option<&str>) -> Result<Self, TraceError> {
        let name = header_name.ok_or(TraceError::MissingRealIpHeader)?;
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TraceError::InvalidRealIpHeader(name.to_string()))?;
        Ok(RemoteAddressResolver::RealIpHeader {
            header_name,
            empty_value: empty_value.map(str::to_string),
        })
    }

    /// `X-Forwarded-For` with `unknown` as the empty sentinel.
    pub fn forwarded_for() -> Self {
        RemoteAddressResolver::RealIpHeader {
            header_name: HeaderName::from_static(X_FORWARDED_FOR),
            empty_value: Some(UNKNOWN.to_string()),
        }
    }

    /// Pick the variant for the configured header: none or empty → Bypass.
    pub fn from_config(header_name: Option<&str>, empty_value: Option<&str>) -> Result<Self, TraceError> {
        match header_name {
            None | Some("") => Ok(RemoteAddressResolver::Bypass),
            Some(_) => Self::real_ip_header(header_name, empty_value),
        }
    }

    /// Best guess of the client address.
    pub fn resolve<'a>(&self, headers: &'a HeaderMap) -> Result<Option<&'a str>, TraceError> {
        match self {
            RemoteAddressResolver::Bypass => header::host(headers),
            RemoteAddressResolver::RealIpHeader { header_name, empty_value } => {
                let real_ip = match header::get_strict(headers, header_name)? {
                    Some(v) if !v.is_empty() => v,
                    _ => return header::host(headers),
                };

                if let Some(empty) = empty_value {
                    if empty.eq_ignore_ascii_case(real_ip) {
                        return header::host(headers);
                    }
                }

                // left-most entry of a proxy chain, untrimmed
                match real_ip.find(',') {
                    Some(index) => Ok(Some(&real_ip[..index])),
                    None => Ok(Some(real_ip)),
                }
            }
        }
    }
}
