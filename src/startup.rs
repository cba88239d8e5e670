use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    routing::{get, post},
    Router,
};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    configuration::{EmailTransport, FormBackend, Settings},
    domain::EmailAddress,
    email_client::EmailClient,
    notifier::{LogNotifier, Notifier},
    routes::{contact, health_check, method_not_allowed, preflight, subscribe},
    storage::{CooldownGate, SubscriberList},
};

/// Where accepted newsletter subscriptions go.
#[derive(Clone)]
pub enum NewsletterSink {
    Subscribers(Arc<SubscriberList>),
    Notify,
}

#[derive(Clone)]
pub struct AppState {
    pub notifier: Arc<dyn Notifier>,
    pub recipient: EmailAddress,
    pub cooldown: Option<Arc<CooldownGate>>,
    pub newsletter: NewsletterSink,
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn from_settings(configuration: &Settings) -> Result<Self, anyhow::Error> {
        let recipient = configuration
            .forms
            .recipient()
            .map_err(anyhow::Error::msg)?;

        let notifier: Arc<dyn Notifier> = match configuration.email_client.transport {
            EmailTransport::Http => {
                let sender = configuration
                    .email_client
                    .sender()
                    .map_err(anyhow::Error::msg)?;
                Arc::new(EmailClient::new(
                    configuration.email_client.base_url.clone(),
                    sender,
                    configuration.email_client.authorization_token.clone(),
                    configuration.email_client.timeout(),
                ))
            }
            EmailTransport::Log => Arc::new(LogNotifier),
        };

        let (cooldown, newsletter) = match configuration.forms.backend {
            FormBackend::File => (
                Some(Arc::new(CooldownGate::new(
                    configuration.forms.rate_limit_dir.clone(),
                    configuration.forms.cooldown(),
                ))),
                NewsletterSink::Subscribers(Arc::new(SubscriberList::new(
                    configuration.forms.subscriber_file.clone(),
                ))),
            ),
            FormBackend::Notify => (None, NewsletterSink::Notify),
        };

        Ok(Self {
            notifier,
            recipient,
            cooldown,
            newsletter,
            trust_forwarded_for: configuration.application.trust_forwarded_for,
        })
    }
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    janitor: Option<(Arc<CooldownGate>, Duration)>,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let state = AppState::from_settings(&configuration)?;
        let janitor = state
            .cooldown
            .clone()
            .zip(configuration.forms.prune_interval());

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address).await?;
        let port = listener.local_addr()?.port();
        tracing::info!(port, backend = ?configuration.forms.backend, "Listening");

        Ok(Self {
            port,
            listener,
            router: router(state),
            janitor,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        let janitor = self
            .janitor
            .map(|(gate, every)| spawn_cooldown_janitor(gate, every));
        let outcome = axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
        if let Some(janitor) = janitor {
            janitor.abort();
        }
        outcome
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health_check", get(health_check))
        .route(
            "/contact",
            post(contact)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/newsletter",
            post(subscribe)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = uuid::Uuid::new_v4();
                        tracing::info_span!(
                            "http-request",
                            method = %request.method(),
                            uri = %request.uri(),
                            %request_id,
                        )
                    }),
                )
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static("POST, OPTIONS"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static("Content-Type"),
                )),
        )
        .with_state(state)
}

fn spawn_cooldown_janitor(gate: Arc<CooldownGate>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match gate.prune_expired(OffsetDateTime::now_utc()).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Pruned expired cooldown entries"),
                Err(e) => {
                    tracing::warn!(error.cause_chain = ?e, "Failed to prune cooldown entries")
                }
            }
        }
    })
}
