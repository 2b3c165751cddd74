//! Storefront page context.
//!
//! Stands in for template rendering: reports which locale a storefront page
//! would render in. Paths under excluded prefixes are API or asset paths and
//! answer 404 instead.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, State},
    http::Uri,
};

use crate::http::errors::ApiError;
use crate::http::locale::RequestLocale;
use crate::models::PageContext;
use crate::state::ApiState;

pub(crate) async fn page(
    State(state): State<Arc<ApiState>>,
    Extension(RequestLocale(resolution)): Extension<RequestLocale>,
    uri: Uri,
) -> Result<Json<PageContext>, ApiError> {
    let path = uri.path();
    if state.redirect_rule.is_excluded(path) {
        return Err(ApiError::not_found(format!("no resource at {path}")));
    }
    Ok(Json(PageContext {
        locale: resolution.locale.as_str().to_string(),
        source: resolution.source.as_str().to_string(),
        path: path.to_string(),
    }))
}
