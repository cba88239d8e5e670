use std::fs::OpenOptions;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::domain::EmailAddress;
use crate::telemetry::spawn_blocking_with_tracing;
use crate::utils::format_timestamp;

pub const SUBSCRIBER_HEADER: [&str; 4] = ["Email", "Date", "IP", "User Agent"];

pub struct SubscriberRecord {
    pub email: EmailAddress,
    pub subscribed_at: OffsetDateTime,
    pub ip: IpAddr,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Added,
    AlreadySubscribed,
}

/// Newsletter subscribers kept as rows of a CSV file.
pub struct SubscriberList {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SubscriberList {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the record unless the address is already on the list. The
    /// lookup and the append happen under one lock.
    #[tracing::instrument(
        name = "Saving a newsletter subscriber",
        skip(self, record),
        fields(subscriber_email = %record.email)
    )]
    pub async fn subscribe(
        &self,
        record: SubscriberRecord,
    ) -> Result<SubscribeOutcome, anyhow::Error> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        spawn_blocking_with_tracing(move || -> Result<SubscribeOutcome, anyhow::Error> {
            if contains(&path, &record.email)? {
                return Ok(SubscribeOutcome::AlreadySubscribed);
            }
            append(&path, &record)?;
            Ok(SubscribeOutcome::Added)
        })
        .await
        .context("Failed to spawn the subscriber list task")?
    }

    pub async fn is_subscribed(&self, email: &EmailAddress) -> Result<bool, anyhow::Error> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let email = email.clone();
        spawn_blocking_with_tracing(move || contains(&path, &email))
            .await
            .context("Failed to spawn the subscriber list task")?
    }
}

/// Case-insensitive scan of the first column. A missing file has no
/// subscribers.
fn contains(path: &Path, email: &EmailAddress) -> Result<bool, anyhow::Error> {
    if !path.exists() {
        return Ok(false);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let wanted = email.as_ref().to_lowercase();
    for row in reader.records() {
        match row {
            Ok(row) => {
                if row.get(0).is_some_and(|c| c.trim().to_lowercase() == wanted) {
                    return Ok(true);
                }
            }
            Err(e) if e.is_io_error() => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Skipping an unreadable subscriber row");
            }
        }
    }
    Ok(false)
}

fn append(path: &Path, record: &SubscriberRecord) -> Result<(), anyhow::Error> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let is_new_file = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for appending", path.display()))?;

    let mut writer = csv::Writer::from_writer(file);
    if is_new_file {
        writer.write_record(SUBSCRIBER_HEADER)?;
    }
    let subscribed_at = format_timestamp(record.subscribed_at)?;
    writer.write_record([
        record.email.as_ref(),
        subscribed_at.as_str(),
        record.ip.to_string().as_str(),
        record.user_agent.as_str(),
    ])?;
    writer.flush().context("Failed to flush the subscriber list")?;
    Ok(())
}
