use std::path::PathBuf;

use bearshop_api::{
    configuration::{get_configuration, EmailTransport, FormBackend},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub struct TestApp {
    pub address: String,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
    pub subscriber_file: PathBuf,
    // Dropped with the app, taking the CSV and the cooldown entries along.
    _data_dir: TempDir,
}

impl TestApp {
    pub async fn post_contact(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/contact", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_newsletter(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/newsletter", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn request(&self, method: reqwest::Method, route: &str) -> reqwest::Response {
        self.api_client
            .request(method, &format!("{}{}", &self.address, route))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub fn subscriber_rows(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.subscriber_file) {
            Ok(contents) => contents.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn accept_emails(&self) {
        Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_server)
            .await;
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(FormBackend::File).await
}

pub async fn spawn_app_with(backend: FormBackend) -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;
    let data_dir = tempfile::tempdir().expect("Failed to create a data directory.");
    let subscriber_file = data_dir.path().join("data").join("newsletter_subscribers.csv");

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.application.host = "127.0.0.1".into();
        c.application.port = 0;
        c.application.trust_forwarded_for = false;
        c.email_client.transport = EmailTransport::Http;
        c.email_client.base_url = email_server.uri();
        c.forms.backend = backend;
        c.forms.subscriber_file = subscriber_file.clone();
        c.forms.rate_limit_dir = data_dir.path().join("rate_limit");
        c.forms.cooldown_seconds = 60;
        c
    };

    let application = Application::build(configuration)
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let address = format!("http://127.0.0.1:{}", application_port);
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        email_server,
        api_client: reqwest::Client::new(),
        subscriber_file,
        _data_dir: data_dir,
    }
}

pub async fn assert_form_response(
    response: reqwest::Response,
    status: u16,
    success: bool,
) -> String {
    assert_eq!(response.status().as_u16(), status);
    assert_eq!(
        response.headers()["Content-Type"],
        "application/json; charset=utf-8"
    );
    let body: serde_json::Value = response.json().await.expect("Body was not JSON.");
    assert_eq!(body["success"], success, "unexpected body: {body}");
    body["message"]
        .as_str()
        .expect("The message field is missing.")
        .to_string()
}
