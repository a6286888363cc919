//! # Snapshot Export
//!
//! Background task that periodically writes a read-only JSON copy of the
//! store to `EXPORT_DIR`.
//!
//! ```text
//! ┌──────────────┐  every EXPORT_INTERVAL_SECS  ┌───────────────────────────────┐
//! │  Exporter    │ ────────────────────────────►│ EXPORT_DIR/                   │
//! │  (read-only) │   items + history + users    │   snapshot-<ts>.json          │
//! └──────────────┘                              └───────────────────────────────┘
//! ```
//!
//! A failed run is logged and the loop keeps going. Files are written to a
//! `.tmp` name first and renamed, so a reader never sees a partial snapshot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockroom_core::{HistoryEntry, Identity, Item};
use stockroom_db::{Database, DbError};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Export errors.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Contents of one snapshot file. Password hashes are never included.
#[derive(Debug, Serialize)]
pub struct StoreSnapshot {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<Item>,
    pub history: Vec<HistoryEntry>,
    pub users: Vec<Identity>,
}

/// Handle for stopping a running exporter.
#[derive(Debug, Clone)]
pub struct ExporterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ExporterHandle {
    /// Asks the exporter loop to stop after its current run.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Exporter already stopped");
        }
    }
}

/// Periodic snapshot writer.
pub struct SnapshotExporter {
    db: Database,
    dir: PathBuf,
    every: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

impl SnapshotExporter {
    /// Creates an exporter and the handle that stops it.
    pub fn new(db: Database, dir: PathBuf, every: Duration) -> (Self, ExporterHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let exporter = SnapshotExporter {
            db,
            dir,
            every,
            shutdown_rx,
        };

        (exporter, ExporterHandle { shutdown_tx })
    }

    /// Runs the export loop. Spawn this as a background task.
    ///
    /// The first tick fires immediately, so a snapshot is written at startup.
    pub async fn run(mut self) {
        info!(dir = %self.dir.display(), every = ?self.every, "Snapshot exporter starting");

        let mut interval = tokio::time::interval(self.every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match export_once(&self.db, &self.dir).await {
                        Ok(path) => info!(path = %path.display(), "Snapshot written"),
                        Err(e) => error!(error = %e, "Snapshot export failed"),
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Snapshot exporter shutting down");
                    break;
                }
            }
        }

        info!("Snapshot exporter stopped");
    }
}

/// Reads the whole store and writes one snapshot file into `dir`.
pub async fn export_once(db: &Database, dir: &Path) -> Result<PathBuf, ExportError> {
    let snapshot = StoreSnapshot {
        generated_at: Utc::now(),
        items: db.items().list_all().await?,
        history: db.history().list_all().await?,
        users: db.users().list_identities().await?,
    };

    debug!(
        items = snapshot.items.len(),
        history = snapshot.history.len(),
        users = snapshot.users.len(),
        "Collected snapshot"
    );

    let body = serde_json::to_vec_pretty(&snapshot)?;

    tokio::fs::create_dir_all(dir).await?;

    let file_name = format!(
        "snapshot-{}.json",
        snapshot.generated_at.format("%Y%m%dT%H%M%S%6fZ")
    );
    let path = dir.join(&file_name);
    let tmp_path = dir.join(format!("{}.tmp", file_name));

    tokio::fs::write(&tmp_path, &body).await?;
    tokio::fs::rename(&tmp_path, &path).await?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use stockroom_core::{ItemDraft, Money, UserRole};
    use stockroom_db::DbConfig;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("stockroom-export-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_export_writes_readable_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .create("alice", "$argon2id$not-a-real-hash", UserRole::Admin)
            .await
            .unwrap();

        db.inventory(FixedOffset::east_opt(0).unwrap())
            .create_or_update(
                &user.identity(),
                &[ItemDraft {
                    name: "Widget".to_string(),
                    quantity: 5,
                    price: Money::from_cents(200),
                }],
            )
            .await
            .unwrap();

        let dir = scratch_dir();
        let path = export_once(&db, &dir).await.unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("snapshot-"));
        assert!(name.ends_with(".json"));

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["items"][0]["name"], "Widget");
        assert_eq!(value["history"][0]["history_type"], "add");
        assert_eq!(value["users"][0]["username"], "alice");
        assert!(!text.contains("password_hash"));
        assert!(!text.contains("not-a-real-hash"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_exporter_stops_on_shutdown() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dir = scratch_dir();

        let (exporter, handle) = SnapshotExporter::new(db, dir.clone(), Duration::from_secs(3600));
        let task = tokio::spawn(exporter.run());

        handle.shutdown().await;
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
