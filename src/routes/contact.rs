use anyhow::Context;
use axum::extract::State;
use time::OffsetDateTime;

use super::{AppJson, FormError, FormResponse};
use crate::{
    client_info::ClientInfo,
    domain::{escape_html, ContactSubmission, ValidationErrors},
    notifier::Notification,
    startup::AppState,
    storage::Admission,
    utils::format_timestamp,
};

pub const CONTACT_CONFIRMATION: &str = "Thank you! Your message has been sent successfully.";

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ContactRequest {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    project_type: Option<String>,
    message: Option<String>,
}

impl TryFrom<ContactRequest> for ContactSubmission {
    type Error = ValidationErrors;

    fn try_from(value: ContactRequest) -> Result<Self, Self::Error> {
        ContactSubmission::parse(
            value.name.as_deref(),
            value.email.as_deref(),
            value.phone.as_deref(),
            value.project_type.as_deref(),
            value.message.as_deref(),
        )
    }
}

#[tracing::instrument(
    name = "Handling a contact enquiry",
    skip(state, client, body),
    fields(client_ip = %client.ip)
)]
pub async fn contact(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(body): AppJson<ContactRequest>,
) -> Result<FormResponse, FormError> {
    let submission: ContactSubmission = body.try_into()?;
    let now = OffsetDateTime::now_utc();

    if let Some(gate) = &state.cooldown {
        if let Admission::Limited { retry_after } = gate.check_and_record(client.ip, now).await {
            return Err(FormError::RateLimited { retry_after });
        }
    }

    let notification = contact_notification(&submission, &client, now)?;
    state
        .notifier
        .notify(&state.recipient, &notification)
        .await
        .context("Failed to deliver the contact notification")?;
    Ok(FormResponse::success(CONTACT_CONFIRMATION))
}

/// User text is escaped here, once, as it goes into the message.
fn contact_notification(
    submission: &ContactSubmission,
    client: &ClientInfo,
    received_at: OffsetDateTime,
) -> Result<Notification, anyhow::Error> {
    let name = escape_html(&submission.name);
    let mut body = String::from("New contact form submission:\n\n");
    body.push_str(&format!("Name: {}\n", name));
    body.push_str(&format!("Email: {}\n", escape_html(submission.email.as_ref())));
    if let Some(phone) = &submission.phone {
        body.push_str(&format!("Phone: {}\n", escape_html(phone)));
    }
    body.push_str(&format!(
        "Project type: {}\n\n",
        escape_html(&submission.project_type)
    ));
    body.push_str(&format!("Message:\n{}\n\n", escape_html(&submission.message)));
    body.push_str("---\n");
    body.push_str(&format!("Sent from: {}\n", escape_html(&client.host)));
    body.push_str(&format!("IP address: {}\n", client.ip));
    body.push_str(&format!(
        "Time: {}\n",
        format_timestamp(received_at).context("Failed to format the submission time")?
    ));

    Ok(Notification {
        subject: format!("New enquiry from {}", name),
        text_body: body,
        reply_to: Some(submission.email.clone()),
    })
}
