//! Boot sequence: configuration, logging, payment adapter registry, serving.

use std::future::Future;
use std::sync::Arc;

use storefront_api::ApiServer;
use storefront_config::{EnvSource, PaymentsConfig, ProcessEnv, StorefrontConfig, load_config};
use storefront_events::EventBus;
use storefront_payments::{
    BankTransferProvider, BankTransferSettings, HostedCheckoutProvider, HostedCheckoutSettings,
    HttpCheckoutGateway, HttpOrderCaptureGateway, MockProvider, OrderCaptureProvider,
    OrderCaptureSettings, PaymentDispatcher, SharedProvider, build_client,
};
use storefront_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::{info, warn};

use crate::activity::spawn_activity_log;
use crate::error::{AppError, AppResult};

const BUILD_SHA: &str = match option_env!("STOREFRONT_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to bootstrap the storefront.
pub(crate) struct BootstrapDependencies {
    config: StorefrontConfig,
    payments: PaymentDispatcher,
    events: EventBus,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Load configuration from `env` and build the shared services.
    pub(crate) fn from_env(env: &impl EnvSource) -> AppResult<Self> {
        let config = load_config(env).map_err(|err| AppError::config("config.load", err))?;
        let payments = build_dispatcher(&config.payments)?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            payments,
            events: EventBus::new(),
            telemetry,
        })
    }
}

/// Entry point for the storefront boot sequence.
///
/// # Errors
///
/// Returns an error if configuration is invalid, logging cannot be installed,
/// or the API server fails to bind or serve.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env(&ProcessEnv)?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies {
        config,
        payments,
        events,
        telemetry,
    } = dependencies;

    let format = config
        .logging
        .format
        .as_deref()
        .map_or_else(LogFormat::infer, LogFormat::from_name);
    init_logging(&LoggingConfig {
        level: &config.logging.level,
        format,
        build_sha: BUILD_SHA,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!(
        methods = ?payments.methods(),
        default_locale = %config.locale.supported.default_locale(),
        "storefront bootstrap starting"
    );

    let activity = spawn_activity_log(events.subscribe(None));
    let addr = config.server.socket_addr();
    let server = ApiServer::new(&config.locale, payments, events, telemetry);
    let served = server
        .serve(addr, shutdown)
        .await
        .map_err(|err| AppError::api_server("api.serve", err));
    activity.abort();
    info!("storefront stopped");
    served
}

/// Build the adapter registry from configuration.
///
/// Adapters are registered only when configured, in the order bank transfer,
/// hosted checkout, order capture, mock; unconfigured methods fall through to
/// manual processing.
pub(crate) fn build_dispatcher(payments: &PaymentsConfig) -> AppResult<PaymentDispatcher> {
    let mut providers: Vec<SharedProvider> = Vec::new();

    if let Some(bank) = &payments.bank_transfer {
        providers.push(Arc::new(BankTransferProvider::new(BankTransferSettings {
            account_holder: bank.account_holder.clone(),
            iban: bank.iban.clone(),
            bic: bank.bic.clone(),
            bank_name: bank.bank_name.clone(),
        })));
    }

    if payments.checkout.is_some() || payments.capture.is_some() {
        let client = build_client(payments.timeout)
            .map_err(|err| AppError::payments("payments.http_client", err))?;
        if let Some(checkout) = &payments.checkout {
            let gateway = HttpCheckoutGateway::new(
                client.clone(),
                checkout.api_base.clone(),
                checkout.secret_key.clone(),
            );
            providers.push(Arc::new(HostedCheckoutProvider::new(
                HostedCheckoutSettings {
                    success_url: checkout.success_url.to_string(),
                    cancel_url: checkout.cancel_url.to_string(),
                },
                Arc::new(gateway),
            )));
        }
        if let Some(capture) = &payments.capture {
            let gateway = HttpOrderCaptureGateway::new(
                client,
                capture.api_base.clone(),
                capture.client_id.clone(),
                capture.client_secret.clone(),
            );
            providers.push(Arc::new(OrderCaptureProvider::new(
                OrderCaptureSettings {
                    return_url: capture.return_url.to_string(),
                    cancel_url: capture.cancel_url.to_string(),
                },
                Arc::new(gateway),
            )));
        }
    }

    if payments.mock_enabled {
        warn!("mock payment adapter enabled; payments are simulated");
        providers.push(Arc::new(MockProvider::new()));
    }

    Ok(PaymentDispatcher::new(providers))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
