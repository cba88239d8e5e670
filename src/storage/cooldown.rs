use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::sync::Mutex;

const FILE_PREFIX: &str = "contact_rate_limit_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited { retry_after: Duration },
}

/// Per-client cooldown backed by one timestamp file per address.
///
/// The read-compare-write sequence runs under a lock so two requests from
/// the same address cannot both slip through. Storage failures let the
/// request through.
pub struct CooldownGate {
    dir: PathBuf,
    window: Duration,
    lock: Mutex<()>,
}

impl CooldownGate {
    pub fn new(dir: PathBuf, window: Duration) -> Self {
        Self {
            dir,
            window,
            lock: Mutex::new(()),
        }
    }

    #[tracing::instrument(name = "Checking the contact cooldown", skip(self))]
    pub async fn check_and_record(&self, client: IpAddr, now: OffsetDateTime) -> Admission {
        let _guard = self.lock.lock().await;
        let path = self.entry_path(client);

        match read_timestamp(&path).await {
            Ok(Some(last)) => {
                let elapsed = now.unix_timestamp() - last;
                let window = self.window_secs();
                if elapsed < window {
                    let remaining = u64::try_from(window - elapsed).unwrap_or(self.window.as_secs());
                    return Admission::Limited {
                        retry_after: Duration::from_secs(remaining),
                    };
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Failed to read the cooldown entry, letting the request through");
                return Admission::Allowed;
            }
        }

        if let Err(e) = self.write_timestamp(&path, now).await {
            tracing::warn!(error.cause_chain = ?e, "Failed to record the cooldown entry, letting the request through");
        }
        Admission::Allowed
    }

    /// Deletes entries whose window has already passed, returning how many
    /// were removed.
    #[tracing::instrument(name = "Pruning expired cooldown entries", skip(self))]
    pub async fn prune_expired(&self, now: OffsetDateTime) -> Result<usize, std::io::Error> {
        let _guard = self.lock.lock().await;
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let is_entry = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(FILE_PREFIX));
            if !is_entry {
                continue;
            }
            let expired = match read_timestamp(&entry.path()).await {
                Ok(Some(last)) => now.unix_timestamp() - last >= self.window_secs(),
                // Unreadable or garbage entries carry no useful state.
                Ok(None) | Err(_) => true,
            };
            if expired {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(removed)
    }

    fn entry_path(&self, client: IpAddr) -> PathBuf {
        let digest = Sha256::digest(client.to_string().as_bytes());
        self.dir
            .join(format!("{}{}", FILE_PREFIX, hex::encode(digest)))
    }

    fn window_secs(&self) -> i64 {
        i64::try_from(self.window.as_secs()).unwrap_or(i64::MAX)
    }

    async fn write_timestamp(
        &self,
        path: &Path,
        now: OffsetDateTime,
    ) -> Result<(), std::io::Error> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(path, now.unix_timestamp().to_string()).await
    }
}

/// `Ok(None)` when there is no entry or it does not hold a timestamp.
async fn read_timestamp(path: &Path) -> Result<Option<i64>, std::io::Error> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents.trim().parse().ok()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
