use anyhow::Context;
use axum::extract::State;
use time::OffsetDateTime;

use super::{AppJson, FormError, FormResponse};
use crate::{
    client_info::ClientInfo,
    domain::{escape_html, EmailAddress},
    notifier::Notification,
    startup::{AppState, NewsletterSink},
    storage::{SubscribeOutcome, SubscriberRecord},
    utils::format_timestamp,
};

pub const SUBSCRIBE_CONFIRMATION: &str =
    "Thank you for subscribing! Check your email for confirmation.";
pub const ALREADY_SUBSCRIBED: &str = "You are already subscribed!";

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct SubscribeRequest {
    email: Option<String>,
}

#[tracing::instrument(
    name = "Adding a newsletter subscriber",
    skip(state, client, body),
    fields(client_ip = %client.ip, subscriber_email = tracing::field::Empty)
)]
pub async fn subscribe(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(body): AppJson<SubscribeRequest>,
) -> Result<FormResponse, FormError> {
    let email = EmailAddress::parse_subscriber(body.email.as_deref().unwrap_or_default())?;
    tracing::Span::current().record("subscriber_email", &tracing::field::display(&email));
    let now = OffsetDateTime::now_utc();

    match &state.newsletter {
        NewsletterSink::Subscribers(list) => {
            let record = SubscriberRecord {
                email,
                subscribed_at: now,
                ip: client.ip,
                user_agent: client.user_agent,
            };
            match list.subscribe(record).await? {
                SubscribeOutcome::Added => Ok(FormResponse::success(SUBSCRIBE_CONFIRMATION)),
                SubscribeOutcome::AlreadySubscribed => {
                    Ok(FormResponse::success(ALREADY_SUBSCRIBED))
                }
            }
        }
        NewsletterSink::Notify => {
            let notification = subscription_notification(&email, &client, now)?;
            state
                .notifier
                .notify(&state.recipient, &notification)
                .await
                .context("Failed to deliver the subscription notification")?;
            Ok(FormResponse::success(SUBSCRIBE_CONFIRMATION))
        }
    }
}

fn subscription_notification(
    email: &EmailAddress,
    client: &ClientInfo,
    subscribed_at: OffsetDateTime,
) -> Result<Notification, anyhow::Error> {
    let date = format_timestamp(subscribed_at).context("Failed to format the subscription time")?;
    Ok(Notification {
        subject: "New Newsletter Subscription".to_string(),
        text_body: format!(
            "New newsletter subscription:\n\n\
             Email: {}\n\
             Date: {}\n\
             IP: {}\n\
             ---\n\
             Sent from: {}\n",
            escape_html(email.as_ref()),
            date,
            client.ip,
            escape_html(&client.host),
        ),
        reply_to: None,
    })
}
