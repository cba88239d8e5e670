use bearshop_api::configuration::FormBackend;
use serde_json::json;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{assert_form_response, spawn_app, spawn_app_with};

fn valid_enquiry() -> serde_json::Value {
    json!({
        "name": "Jo",
        "email": "jo@x.com",
        "projectType": "Sonstiges",
        "message": "Hello there world"
    })
}

#[tokio::test]
async fn contact_returns_200_for_a_valid_enquiry() {
    let app = spawn_app().await;
    app.accept_emails().await;

    let response = app.post_contact(&valid_enquiry()).await;

    let message = assert_form_response(response, 200, true).await;
    assert_eq!(message, "Thank you! Your message has been sent successfully.");
}

#[tokio::test]
async fn contact_sends_a_notification_to_the_configured_recipient() {
    let app = spawn_app().await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let mut enquiry = valid_enquiry();
    enquiry["name"] = json!("<script>Jo</script>");
    enquiry["phone"] = json!("+43 664 1234567");
    app.post_contact(&enquiry).await;

    let email_request = &app.email_server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
    assert_eq!(body["To"], "kontakt@bearshop.at");
    assert_eq!(body["ReplyTo"], "jo@x.com");
    let text = body["TextBody"].as_str().unwrap();
    assert!(text.contains("Name: &lt;script&gt;Jo&lt;&#x2F;script&gt;"), "{text}");
    assert!(text.contains("Phone: +43 664 1234567"), "{text}");
    assert!(text.contains("Project type: Sonstiges"), "{text}");
    assert!(!text.contains("<script>"));
}

#[tokio::test]
async fn contact_returns_400_when_the_message_is_too_short() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let mut enquiry = valid_enquiry();
    enquiry["message"] = json!("short");
    let response = app.post_contact(&enquiry).await;

    let message = assert_form_response(response, 400, false).await;
    assert_eq!(message, "Message must be at least 10 characters");
}

#[tokio::test]
async fn contact_returns_every_validation_error_at_once() {
    let app = spawn_app().await;
    let test_cases = vec![
        (json!({}), "Name is required, Email is required, Project type is required, Message is required"),
        (
            json!({"name": "J", "email": "jo@x", "phone": "call me", "projectType": "", "message": "Hi"}),
            "Name must be at least 2 characters, Invalid email address, Invalid phone number, \
             Project type is required, Message must be at least 10 characters",
        ),
        (
            json!({"name": "Jo", "email": "jo@x.com", "phone": "0664/123", "projectType": "Sonstiges", "message": "Hello there world"}),
            "Invalid phone number",
        ),
    ];

    for (body, expected) in test_cases {
        let response = app.post_contact(&body).await;
        let message = assert_form_response(response, 400, false).await;
        assert_eq!(message, expected, "the API did not reject {body}");
    }
}

#[tokio::test]
async fn contact_rejects_malformed_bodies() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(&format!("{}/contact", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_form_response(response, 400, false).await;

    let response = app
        .api_client
        .post(&format!("{}/contact", &app.address))
        .body(valid_enquiry().to_string())
        .send()
        .await
        .unwrap();
    assert_form_response(response, 415, false).await;

    let mut enquiry = valid_enquiry();
    enquiry["isAdmin"] = json!(true);
    let response = app.post_contact(&enquiry).await;
    assert_form_response(response, 422, false).await;

    let mut enquiry = valid_enquiry();
    enquiry["message"] = json!(42);
    let response = app.post_contact(&enquiry).await;
    assert_form_response(response, 422, false).await;
}

#[tokio::test]
async fn second_enquiry_within_the_cooldown_is_rate_limited() {
    let app = spawn_app().await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let first = app.post_contact(&valid_enquiry()).await;
    assert_form_response(first, 200, true).await;

    let second = app.post_contact(&valid_enquiry()).await;
    let retry_after: u64 = second.headers()["Retry-After"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    let message = assert_form_response(second, 429, false).await;
    assert_eq!(
        message,
        "Too many requests. Please wait a moment before trying again."
    );
}

#[tokio::test]
async fn invalid_enquiries_do_not_start_the_cooldown() {
    let app = spawn_app().await;
    app.accept_emails().await;

    let mut enquiry = valid_enquiry();
    enquiry["message"] = json!("short");
    app.post_contact(&enquiry).await;

    let response = app.post_contact(&valid_enquiry()).await;
    assert_form_response(response, 200, true).await;
}

#[tokio::test]
async fn contact_returns_500_with_a_generic_message_if_delivery_fails() {
    let app = spawn_app().await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_contact(&valid_enquiry()).await;

    let message = assert_form_response(response, 500, false).await;
    assert_eq!(message, "An error occurred. Please try again later.");
}

#[tokio::test]
async fn notify_backend_does_not_rate_limit() {
    let app = spawn_app_with(FormBackend::Notify).await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    for _ in 0..2 {
        let response = app.post_contact(&valid_enquiry()).await;
        assert_form_response(response, 200, true).await;
    }
}
