use std::path::PathBuf;
use std::time::Duration;

use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::EmailAddress;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub email_client: EmailClientSettings,
    pub forms: FormSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransport {
    /// Postmark-style JSON API.
    Http,
    /// Only log what would have been sent.
    Log,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub transport: EmailTransport,
    pub base_url: String,
    pub sender_email: String,
    pub authorization_token: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn sender(&self) -> Result<EmailAddress, String> {
        EmailAddress::parse(&self.sender_email)
            .map_err(|e| format!("Invalid sender email `{}`: {}", self.sender_email, e))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

/// Selects how the form endpoints persist or forward what they accept.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FormBackend {
    /// Contact submissions are rate limited and mailed, newsletter
    /// subscribers land in a CSV file.
    File,
    /// Both endpoints only send a notification.
    Notify,
}

#[derive(serde::Deserialize, Clone)]
pub struct FormSettings {
    pub backend: FormBackend,
    pub recipient: String,
    pub subscriber_file: PathBuf,
    pub rate_limit_dir: PathBuf,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub cooldown_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub prune_interval_seconds: u64,
}

impl FormSettings {
    pub fn recipient(&self) -> Result<EmailAddress, String> {
        EmailAddress::parse(&self.recipient)
            .map_err(|e| format!("Invalid recipient email `{}`: {}", self.recipient, e))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    /// `None` disables pruning of stale rate-limit entries.
    pub fn prune_interval(&self) -> Option<Duration> {
        (self.prune_interval_seconds > 0).then(|| Duration::from_secs(self.prune_interval_seconds))
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {e}"))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // E.g. `APP_FORMS__RECIPIENT=kontakt@bearshop.at`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
