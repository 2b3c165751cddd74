//! Locale middleware and locale endpoints.
//!
//! # Design
//! - The middleware gathers route, session, cookie, and `Accept-Language`
//!   inputs into a [`RequestContext`], resolves the locale once, and persists
//!   any session write the resolver made before anything else happens.
//!   A new session is only started for an explicit choice (route or cookie)
//!   on a non-excluded path; header and default outcomes are recomputed per
//!   request until the visitor has a session.
//! - The locale-prefix redirect is evaluated after resolution; unsafe methods
//!   and excluded prefixes are never redirected.
//! - Handlers read the outcome from the [`RequestLocale`] extension; problem
//!   responses read it from the task-local scope.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::{Extension, State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, Request, StatusCode,
        header::{ACCEPT_LANGUAGE, COOKIE, LOCATION, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use storefront_events::Event;
use storefront_i18n::{
    LOCALE_COOKIE, Locale, LocaleResolution, LocaleSource, RequestContext, SESSION_LOCALE_KEY,
    parse_cookie_header,
};
use tracing::{debug, info, warn};

use crate::http::constants::SESSION_COOKIE;
use crate::http::errors::ApiError;
use crate::i18n::with_request_locale;
use crate::models::{LocaleSwitchRequest, LocaleSwitchResponse, LocalesResponse};
use crate::state::ApiState;

/// Locale resolved for the current request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestLocale(pub(crate) LocaleResolution);

/// Live session id attached to the current request, if any.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveSession(pub(crate) Option<String>);

pub(crate) async fn resolve_locale(
    State(state): State<Arc<ApiState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let cookies = request_cookies(req.headers());
    let cookie_session = cookies.get(SESSION_COOKIE).cloned();
    let session = cookie_session
        .as_deref()
        .and_then(|id| state.load_session(id));
    let mut session_id = session.as_ref().and(cookie_session);

    let path = req.uri().path().to_string();
    let route_locale = state.redirect_rule.route_locale(&path);
    let accept_language = req
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok());
    let mut context = RequestContext::new()
        .with_route_locale(route_locale.map(Locale::as_str))
        .with_session(session.unwrap_or_default())
        .with_cookies(cookies)
        .with_accept_language(accept_language);

    let resolution = state.resolver.resolve(&mut context);
    state
        .telemetry
        .inc_locale_resolution(resolution.source.as_str());
    if resolution.session_repaired {
        state.telemetry.inc_locale_session_repair();
    }
    debug!(
        locale = %resolution.locale,
        source = resolution.source.as_str(),
        path = %path,
        "resolved request locale"
    );

    let mut issued_session = None;
    if context.session_modified()
        && (session_id.is_some() || starts_session(&state, &path, resolution))
    {
        let id = state.save_session(session_id.as_deref(), context.into_session());
        if session_id.as_deref() != Some(id.as_str()) {
            issued_session = Some(id.clone());
        }
        session_id = Some(id);
    }

    if let Some(redirect) = state.redirect_rule.evaluate(
        req.method(),
        &path,
        req.uri().query(),
        resolution.locale,
    ) {
        state.telemetry.inc_locale_redirect();
        info!(
            location = %redirect.location,
            locale = %resolution.locale,
            reason = ?redirect.reason,
            "redirecting to locale url"
        );
        let mut response =
            (StatusCode::FOUND, [(LOCATION, redirect.location)]).into_response();
        if let Some(id) = issued_session.as_deref() {
            append_cookie(response.headers_mut(), &session_cookie(id));
        }
        return response;
    }

    req.extensions_mut().insert(RequestLocale(resolution));
    req.extensions_mut().insert(ActiveSession(session_id));
    let mut response = with_request_locale(resolution.locale, next.run(req)).await;
    if let Some(id) = issued_session.as_deref() {
        append_cookie(response.headers_mut(), &session_cookie(id));
    }
    response
}

fn starts_session(state: &ApiState, path: &str, resolution: LocaleResolution) -> bool {
    matches!(resolution.source, LocaleSource::Route | LocaleSource::Cookie)
        && !state.redirect_rule.is_excluded(path)
}

pub(crate) async fn list_locales(
    State(state): State<Arc<ApiState>>,
    Extension(RequestLocale(resolution)): Extension<RequestLocale>,
) -> Json<LocalesResponse> {
    let supported = state.resolver.supported();
    Json(LocalesResponse {
        locale: resolution.locale.as_str().to_string(),
        source: resolution.source.as_str().to_string(),
        default: supported.default_locale().as_str().to_string(),
        supported: supported
            .locales()
            .iter()
            .map(|locale| locale.as_str().to_string())
            .collect(),
    })
}

pub(crate) async fn switch_locale(
    State(state): State<Arc<ApiState>>,
    Extension(ActiveSession(session_id)): Extension<ActiveSession>,
    payload: Result<Json<LocaleSwitchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let locale = state
        .resolver
        .supported()
        .parse(&request.locale)
        .map_err(|err| {
            warn!(error = %err, locale = %request.locale, "rejected locale switch");
            ApiError::bad_request("unsupported locale")
                .with_invalid_param("/locale", err.to_string())
        })?;

    let mut data = session_id
        .as_deref()
        .and_then(|id| state.load_session(id))
        .unwrap_or_default();
    let previous = data
        .get(SESSION_LOCALE_KEY)
        .and_then(Value::as_str)
        .map(ToString::to_string);
    data.insert(
        SESSION_LOCALE_KEY.to_string(),
        Value::String(locale.as_str().to_string()),
    );
    let id = state.save_session(session_id.as_deref(), data);
    state.publish(Event::LocaleChanged {
        previous: previous.clone(),
        locale: locale.as_str().to_string(),
    });
    info!(locale = %locale, previous = ?previous, "locale switched");

    let mut response = Json(LocaleSwitchResponse {
        locale: locale.as_str().to_string(),
        previous,
    })
    .into_response();
    append_cookie(
        response.headers_mut(),
        &locale_cookie(locale, state.cookie_max_age),
    );
    if session_id.as_deref() != Some(id.as_str()) {
        append_cookie(response.headers_mut(), &session_cookie(&id));
    }
    Ok(response)
}

fn request_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
    {
        for (name, value) in parse_cookie_header(value) {
            cookies.entry(name).or_insert(value);
        }
    }
    cookies
}

fn session_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

fn locale_cookie(locale: Locale, max_age: Duration) -> String {
    format!(
        "{LOCALE_COOKIE}={locale}; Path=/; Max-Age={}; SameSite=Lax",
        max_age.as_secs()
    )
}

fn append_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(err) => warn!(error = %err, "failed to encode cookie header"),
    }
}
