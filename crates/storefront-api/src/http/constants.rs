//! Shared HTTP constants (headers, cookies, problem URIs).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const SESSION_COOKIE: &str = "storefront_session";

pub(crate) const PROBLEM_INTERNAL: &str = "https://storefront.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://storefront.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://storefront.dev/problems/not-found";
