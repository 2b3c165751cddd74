//! Payment endpoints backed by the shared dispatcher.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde_json::Value;
use storefront_events::Event;
use storefront_payments::PaymentResult;
use storefront_telemetry::{current_request_id, current_route};
use tracing::{info, warn};

use crate::http::errors::ApiError;
use crate::models::{
    PaymentMethodsResponse, PaymentStatusQuery, ProcessPaymentRequest, RefundRequest,
};
use crate::state::ApiState;

/// Metrics label for calls no adapter handles.
const MANUAL_METHOD_LABEL: &str = "manual";

pub(crate) async fn list_methods(
    State(state): State<Arc<ApiState>>,
) -> Json<PaymentMethodsResponse> {
    Json(PaymentMethodsResponse {
        methods: state.payments.methods(),
    })
}

pub(crate) async fn process_payment(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ProcessPaymentRequest>, JsonRejection>,
) -> Result<Json<PaymentResult>, ApiError> {
    let Json(request) = payload?;
    let method = request
        .method
        .clone()
        .unwrap_or_else(|| request.order.payment_method().to_string());
    let result = state
        .payments
        .process_payment(&request.order, &method, &request.data)
        .await;
    record_outcome(&state, "process", &method, &result);
    if result.success {
        state.publish(Event::PaymentProcessed {
            order_number: request.order.number.clone(),
            method: method.clone(),
            transaction_id: result.transaction_id.clone(),
            status: result.status.as_str().to_string(),
        });
    }
    info!(
        order = %request.order.number,
        method = %method,
        status = result.status.as_str(),
        "payment processed"
    );
    Ok(Json(result))
}

pub(crate) async fn refund_payment(
    State(state): State<Arc<ApiState>>,
    Path(transaction_id): Path<String>,
    payload: Result<Json<RefundRequest>, JsonRejection>,
) -> Result<Json<PaymentResult>, ApiError> {
    let Json(request) = payload?;
    if let Some(amount) = request.amount
        && amount.is_sign_negative()
    {
        return Err(ApiError::bad_request("request body is invalid")
            .with_invalid_param("/amount", "refund amount must not be negative"));
    }
    let result = state
        .payments
        .refund_payment(&transaction_id, &request.method, request.amount)
        .await;
    record_outcome(&state, "refund", &request.method, &result);
    if result.success {
        state.publish(Event::PaymentRefunded {
            transaction_id: transaction_id.clone(),
            method: request.method.clone(),
            refund_id: result.transaction_id.clone(),
            status: result.status.as_str().to_string(),
        });
    }
    info!(
        transaction_id = %transaction_id,
        method = %request.method,
        status = result.status.as_str(),
        "refund requested"
    );
    Ok(Json(result))
}

pub(crate) async fn payment_status(
    State(state): State<Arc<ApiState>>,
    Path(transaction_id): Path<String>,
    Query(query): Query<PaymentStatusQuery>,
) -> Result<Json<PaymentResult>, ApiError> {
    let method = query
        .method
        .filter(|method| !method.trim().is_empty())
        .ok_or_else(|| {
            ApiError::bad_request("method query parameter is required")
                .with_invalid_param("method", "missing")
        })?;
    let result = state.payments.payment_status(&transaction_id, &method).await;
    record_outcome(&state, "status", &method, &result);
    Ok(Json(result))
}

/// Count the call, track gateway reachability, and publish failures.
fn record_outcome(state: &ApiState, operation: &'static str, method: &str, result: &PaymentResult) {
    let label = state
        .payments
        .provider_for(method)
        .map_or(MANUAL_METHOD_LABEL, |provider| provider.method().as_str());
    state
        .telemetry
        .inc_payment(operation, label, result.status.as_str());

    if label != MANUAL_METHOD_LABEL {
        let component = format!("payments.{label}");
        let unreachable =
            result.details.get("reason").and_then(Value::as_str) == Some("transport");
        if unreachable {
            if state.add_degraded_component(&component) {
                warn!(method = label, "payment gateway marked degraded");
            }
        } else if result.success && state.remove_degraded_component(&component) {
            info!(method = label, "payment gateway recovered");
        }
    }

    if !result.success {
        warn!(
            operation,
            method = %method,
            request_id = current_request_id().as_deref(),
            route = current_route().as_deref(),
            message = %result.message,
            "payment operation failed"
        );
        state.publish(Event::PaymentFailed {
            operation: operation.to_string(),
            method: method.to_string(),
            message: result.message.clone(),
        });
    }
}
