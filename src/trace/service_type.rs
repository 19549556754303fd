//! Service type codes, annotation keys and API descriptors.

use serde::Serialize;

/// A service type tag recorded on spans and span events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceType {
    pub code: i16,
    pub name: &'static str,
}

impl ServiceType {
    /// Placeholder when the caller's type is unknown or malformed.
    pub const UNDEFINED: ServiceType = ServiceType { code: -1, name: "UNDEFINED" };

    /// Root span of an inbound HTTP dispatch.
    pub const HTTP_DISPATCHER: ServiceType = ServiceType { code: 1140, name: "HTTP_DISPATCHER" };

    /// Span event covering the dispatched handler.
    pub const HTTP_DISPATCHER_METHOD: ServiceType = ServiceType { code: 1141, name: "HTTP_DISPATCHER_METHOD" };
}

/// Keys for span annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnotationKey {
    pub code: i32,
    pub name: &'static str,
}

impl AnnotationKey {
    pub const HTTP_PARAM: AnnotationKey = AnnotationKey { code: 41, name: "http.param" };
    pub const HTTP_STATUS_CODE: AnnotationKey = AnnotationKey { code: 46, name: "http.status.code" };
}

/// An interned API name. Created through [`TraceContext::cache_api`].
///
/// [`TraceContext::cache_api`]: crate::trace::TraceContext::cache_api
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiDescriptor {
    pub api_id: i32,
    pub full_name: String,
}
