//! Well-known context keys.
//!
//! Header-shaped keys use the lowercase header name so that outbound clients
//! can copy them onto requests verbatim.

/// Correlation id for one inbound request.
pub const REQUEST_ID: &str = "x-request-id";

/// W3C trace context header.
pub const TRACEPARENT: &str = "traceparent";

/// Tenant the request is executed for.
pub const TENANT_ID: &str = "x-tenant-id";

/// Keys copied onto outbound requests by header-propagating clients.
pub const PROPAGATED_HEADERS: [&str; 3] = [REQUEST_ID, TRACEPARENT, TENANT_ID];
