//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    middleware,
    routing::{get, post, put},
};
use storefront_config::LocaleConfig;
use storefront_events::EventBus;
use storefront_payments::PaymentDispatcher;
use storefront_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::health::{health, metrics};
use crate::http::locale::{list_locales, resolve_locale, switch_locale};
use crate::http::pages::page;
use crate::http::payments::{list_methods, payment_status, process_payment, refund_payment};
use crate::http::telemetry::track_request;
use crate::state::ApiState;

/// Axum router wrapper that hosts the storefront API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the API with its shared dependencies wired through application state.
    #[must_use]
    pub fn new(
        locale: &LocaleConfig,
        payments: PaymentDispatcher,
        events: EventBus,
        telemetry: Metrics,
    ) -> Self {
        let state = Arc::new(ApiState::new(locale, payments, events, telemetry));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_REQUEST_ID)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    locale = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let routed = ServiceBuilder::new()
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(state.clone(), track_request));
        let locale_layer = middleware::from_fn_with_state(state.clone(), resolve_locale);
        // The id must be set before it can be copied onto the response.
        let request_id = ServiceBuilder::new()
            .layer(storefront_telemetry::set_request_id_layer())
            .layer(storefront_telemetry::propagate_request_id_layer());

        let router = Self::build_router()
            .route_layer(routed)
            .layer(locale_layer)
            .layer(request_id)
            .layer(cors_layer)
            .with_state(state);

        Self { router }
    }

    fn build_router() -> Router<Arc<ApiState>> {
        Self::public_routes()
            .merge(Self::v1_routes())
            .merge(Self::storefront_routes())
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn v1_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/v1/locales", get(list_locales))
            .route("/v1/locale", put(switch_locale))
            .route("/v1/payments", post(process_payment))
            .route("/v1/payments/methods", get(list_methods))
            .route("/v1/payments/{transaction_id}", get(payment_status))
            .route("/v1/payments/{transaction_id}/refund", post(refund_payment))
    }

    fn storefront_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/", get(page))
            .route("/{*path}", get(page))
    }

    /// Consume the server and hand out the underlying router.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API on `addr` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(addr = %addr, "starting storefront api");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocaleSwitchResponse, LocalesResponse, PageContext, ProblemDetails};
    use crate::state::fixtures::locale_config;
    use axum::body::{Body, to_bytes};
    use axum::http::{
        StatusCode,
        header::{ACCEPT_LANGUAGE, COOKIE, LOCATION, SET_COOKIE},
    };
    use axum::response::Response;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use storefront_events::Event;
    use storefront_payments::MockProvider;
    use tower::ServiceExt;

    struct Harness {
        router: Router,
        events: EventBus,
        telemetry: Metrics,
    }

    impl Harness {
        fn new() -> anyhow::Result<Self> {
            let events = EventBus::new();
            let telemetry = Metrics::new()?;
            let dispatcher = PaymentDispatcher::new(vec![Arc::new(MockProvider::new())]);
            let server = ApiServer::new(
                &locale_config(&["en", "de", "fr"], "en")?,
                dispatcher,
                events.clone(),
                telemetry.clone(),
            );
            Ok(Self {
                router: server.into_router(),
                events,
                telemetry,
            })
        }

        async fn send(&self, request: Request<Body>) -> anyhow::Result<Response> {
            Ok(self.router.clone().oneshot(request).await?)
        }
    }

    fn get_request(uri: &str) -> anyhow::Result<Request<Body>> {
        Ok(Request::builder().uri(uri).body(Body::empty())?)
    }

    fn json_request(method: Method, uri: &str, body: &Value) -> anyhow::Result<Request<Body>> {
        Ok(Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }

    fn session_cookie_value(response: &Response) -> Option<String> {
        set_cookies(response).into_iter().find_map(|cookie| {
            cookie
                .split(';')
                .next()
                .and_then(|pair| pair.strip_prefix("storefront_session="))
                .map(ToString::to_string)
        })
    }

    fn order_json(method: &str) -> Value {
        json!({
            "id": "6f1c1a52-8f3e-4a57-9d43-3c1d8b1b2f10",
            "number": "SO-1001",
            "customer_email": "buyer@example.com",
            "currency": "EUR",
            "items": [
                {"sku": "TS-1", "name": "T-shirt", "quantity": 2, "unit_price": "19.90"}
            ],
            "shipping": "4.90",
            "payment_method": method
        })
    }

    #[tokio::test]
    async fn preferred_locale_redirects_to_prefixed_url_with_query() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let request = Request::builder()
            .uri("/products/shirt?color=red&size=m")
            .header(ACCEPT_LANGUAGE, "de-DE,de;q=0.9,en;q=0.5")
            .body(Body::empty())?;
        let response = harness.send(request).await?;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/de/products/shirt?color=red&size=m")
        );
        assert_eq!(harness.telemetry.snapshot().locale_redirects_total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn default_locale_prefix_is_stripped() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness.send(get_request("/en/about")?).await?;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/about")
        );
        Ok(())
    }

    #[tokio::test]
    async fn route_locale_renders_page_and_starts_session() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness.send(get_request("/de/about")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let session = session_cookie_value(&response)
            .ok_or_else(|| anyhow::anyhow!("route hit should issue a session cookie"))?;
        let page: PageContext = read_json(response).await?;
        assert_eq!(page.locale, "de");
        assert_eq!(page.source, "route");
        assert_eq!(page.path, "/de/about");

        let request = Request::builder()
            .uri("/v1/locales")
            .header(COOKIE, format!("storefront_session={session}"))
            .body(Body::empty())?;
        let locales: LocalesResponse = read_json(harness.send(request).await?).await?;
        assert_eq!(locales.locale, "de");
        assert_eq!(locales.source, "session");
        assert_eq!(locales.default, "en");
        assert_eq!(locales.supported, vec!["en", "de", "fr"]);
        Ok(())
    }

    #[tokio::test]
    async fn unsafe_methods_on_prefixed_paths_are_never_redirected() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        for (method, uri) in [(Method::POST, "/de/checkout"), (Method::POST, "/en/checkout")] {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(ACCEPT_LANGUAGE, "fr")
                .body(Body::empty())?;
            let response = harness.send(request).await?;
            assert_ne!(response.status(), StatusCode::FOUND, "{uri}");
        }
        assert_eq!(harness.telemetry.snapshot().locale_redirects_total, 0);
        Ok(())
    }

    #[tokio::test]
    async fn locale_switch_sets_cookie_and_session() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let mut stream = harness.events.subscribe(None);
        let response = harness
            .send(json_request(Method::PUT, "/v1/locale", &json!({"locale": "fr"}))?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert!(
            cookies
                .iter()
                .any(|cookie| cookie == "locale=fr; Path=/; Max-Age=31536000; SameSite=Lax")
        );
        let session = session_cookie_value(&response)
            .ok_or_else(|| anyhow::anyhow!("switch should issue a session cookie"))?;
        let body: LocaleSwitchResponse = read_json(response).await?;
        assert_eq!(body.locale, "fr");
        assert!(body.previous.is_none());

        let request = Request::builder()
            .uri("/shop")
            .header(COOKIE, format!("storefront_session={session}"))
            .body(Body::empty())?;
        let response = harness.send(request).await?;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/fr/shop")
        );

        let envelope = stream
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("locale change should be published"))?;
        assert_eq!(
            envelope.event,
            Event::LocaleChanged {
                previous: None,
                locale: "fr".to_string(),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_locale_switch_returns_localized_problem() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let mut request = json_request(Method::PUT, "/v1/locale", &json!({"locale": "ja"}))?;
        request
            .headers_mut()
            .insert(COOKIE, "locale=de".parse()?);
        let response = harness.send(request).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(set_cookies(&response).is_empty());
        let problem: ProblemDetails = read_json(response).await?;
        assert_eq!(problem.title, "Ungültige Anfrage");
        assert_eq!(problem.detail.as_deref(), Some("Nicht unterstützte Sprache"));
        let params = problem.invalid_params.unwrap_or_default();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].pointer, "/locale");
        Ok(())
    }

    #[tokio::test]
    async fn unmatched_payment_method_falls_back_to_manual_processing() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness
            .send(json_request(
                Method::POST,
                "/v1/payments",
                &json!({"order": order_json("wire_transfer")}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let result: Value = read_json(response).await?;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["status"], json!("pending"));
        let transaction_id = result["transaction_id"].as_str().unwrap_or_default();
        assert!(transaction_id.starts_with("WIRE_TRANSFER-"), "{transaction_id}");
        Ok(())
    }

    #[tokio::test]
    async fn registered_method_processes_and_publishes() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let mut stream = harness.events.subscribe(None);
        let response = harness
            .send(json_request(
                Method::POST,
                "/v1/payments",
                &json!({"order": order_json("bank_transfer"), "method": "mock"}),
            )?)
            .await?;
        let result: Value = read_json(response).await?;
        assert_eq!(result["status"], json!("completed"));

        let envelope = stream
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("payment should be published"))?;
        assert!(matches!(
            envelope.event,
            Event::PaymentProcessed { ref method, ref status, .. }
                if method == "mock" && status == "completed"
        ));

        let rendered = harness.telemetry.render()?;
        assert!(rendered.contains("payments_total"));
        assert!(rendered.contains("events_emitted_total"));
        Ok(())
    }

    #[tokio::test]
    async fn overflowing_order_amount_yields_failed_result() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let mut order = order_json("mock");
        order["items"][0]["unit_price"] = json!("79228162514264337593543950335");
        let response = harness
            .send(json_request(Method::POST, "/v1/payments", &json!({"order": order}))?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let result: Value = read_json(response).await?;
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["status"], json!("failed"));
        assert_eq!(result["details"]["reason"], json!("invalid_amount"));
        Ok(())
    }

    #[tokio::test]
    async fn simulated_failure_publishes_payment_failed() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let mut stream = harness.events.subscribe(None);
        let response = harness
            .send(json_request(
                Method::POST,
                "/v1/payments",
                &json!({"order": order_json("mock"), "data": {"simulate": "failure"}}),
            )?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let result: Value = read_json(response).await?;
        assert_eq!(result["success"], json!(false));

        let envelope = stream
            .next()
            .await
            .ok_or_else(|| anyhow::anyhow!("failure should be published"))?;
        assert!(matches!(envelope.event, Event::PaymentFailed { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn refund_and_status_dispatch_by_method() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness
            .send(json_request(
                Method::POST,
                "/v1/payments/MOCK-1/refund",
                &json!({"method": "mock", "amount": "5.00"}),
            )?)
            .await?;
        let refund: Value = read_json(response).await?;
        assert_eq!(refund["status"], json!("refunded"));

        let response = harness
            .send(get_request("/v1/payments/ORDER-9?method=bank_transfer")?)
            .await?;
        let status: Value = read_json(response).await?;
        assert_eq!(status["status"], json!("pending"));
        assert_eq!(status["transaction_id"], json!("ORDER-9"));
        Ok(())
    }

    #[tokio::test]
    async fn status_without_method_is_rejected() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness.send(get_request("/v1/payments/ORDER-9")?).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let problem: ProblemDetails = read_json(response).await?;
        assert_eq!(problem.title, "bad request");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_payment_body_is_a_problem_response() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness
            .send(json_request(Method::POST, "/v1/payments", &json!({"order": 1}))?)
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let problem: ProblemDetails = read_json(response).await?;
        assert_eq!(problem.detail.as_deref(), Some("request body is invalid"));
        Ok(())
    }

    #[tokio::test]
    async fn methods_health_and_metrics_are_served() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness.send(get_request("/v1/payments/methods")?).await?;
        let methods: Value = read_json(response).await?;
        assert_eq!(methods, json!({"methods": ["mock"]}));

        let health: Value = read_json(harness.send(get_request("/health")?).await?).await?;
        assert_eq!(health["status"], json!("ok"));
        assert_eq!(health["payment_methods"], json!(["mock"]));

        let response = harness.send(get_request("/metrics")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(bytes.to_vec())?;
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("locale_resolutions_total"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_api_paths_are_not_found() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness.send(get_request("/v1/unknown")?).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn responses_carry_request_id() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness.send(get_request("/health")?).await?;
        assert!(response.headers().contains_key(HEADER_REQUEST_ID));

        let redirect = harness.send(get_request("/en/about")?).await?;
        assert_eq!(redirect.status(), StatusCode::FOUND);
        assert!(redirect.headers().contains_key(HEADER_REQUEST_ID));

        let request = Request::builder()
            .uri("/health")
            .header(HEADER_REQUEST_ID, "req-42")
            .body(Body::empty())?;
        let response = harness.send(request).await?;
        assert_eq!(
            response
                .headers()
                .get(HEADER_REQUEST_ID)
                .and_then(|v| v.to_str().ok()),
            Some("req-42")
        );
        Ok(())
    }

    #[tokio::test]
    async fn request_metrics_are_labelled_with_resolved_locale() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        let response = harness.send(get_request("/de/about")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        harness.send(get_request("/v1/unknown")?).await?;

        let rendered = harness.telemetry.render()?;
        assert!(
            rendered.contains(r#"http_requests_total{code="200",locale="de",route="/{*path}"} 1"#),
            "{rendered}"
        );
        assert!(!rendered.contains(r#"route="/de/about""#));
        Ok(())
    }

    #[tokio::test]
    async fn visitors_without_an_explicit_choice_do_not_start_sessions() -> anyhow::Result<()> {
        let harness = Harness::new()?;
        for _ in 0..3 {
            let response = harness.send(get_request("/about")?).await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(session_cookie_value(&response).is_none());
        }
        let request = Request::builder()
            .uri("/about")
            .header(ACCEPT_LANGUAGE, "fr")
            .body(Body::empty())?;
        let response = harness.send(request).await?;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(session_cookie_value(&response).is_none());
        assert_eq!(harness.telemetry.snapshot().active_sessions, 0);

        let request = Request::builder()
            .uri("/about")
            .header(COOKIE, "locale=de")
            .body(Body::empty())?;
        let response = harness.send(request).await?;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(session_cookie_value(&response).is_some());
        assert_eq!(harness.telemetry.snapshot().active_sessions, 1);
        Ok(())
    }
}
