//! Per-request accounting for routed storefront requests.
//!
//! Runs as a route layer, inside the locale middleware, so both the matched
//! route template and the locale the resolver picked are known. Requests the
//! locale middleware answers itself (redirects) never reach this point and are
//! counted by `locale_redirects_total` instead.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use storefront_telemetry::with_request_context;
use tracing::Span;

use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::locale::RequestLocale;
use crate::state::ApiState;

const UNMATCHED_ROUTE: &str = "unmatched";
const NO_LOCALE: &str = "none";

/// Count the response under `{route, code, locale}` and expose the request id
/// and route to handlers through the task-local request context.
pub(crate) async fn track_request(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |matched| matched.as_str().to_string());
    let locale = request
        .extensions()
        .get::<RequestLocale>()
        .map_or(NO_LOCALE, |resolved| resolved.0.locale.as_str());
    let request_id = request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Span::current().record("locale", locale);

    with_request_context(request_id, route.clone(), async move {
        let response = next.run(request).await;
        state
            .telemetry
            .inc_http_request(&route, response.status().as_u16(), locale);
        response
    })
    .await
}
