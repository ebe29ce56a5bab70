//! Opening the local data directory and remembering who is signed in.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use barweek_core::backend::LocalBackend;
use barweek_core::guest::{DirKv, GuestStore};
use barweek_core::tracking::LogTracker;
use barweek_core::{BarweekConfig, Identity, Planner};
use tracing::debug;

pub struct App {
    pub config: BarweekConfig,
    pub backend: Arc<LocalBackend>,
    pub planner: Planner,
}

impl App {
    /// Open the backend and guest store under `data_dir` and resume the saved identity.
    pub async fn open(config: BarweekConfig) -> Result<Self> {
        let data_path = config.data_path();
        std::fs::create_dir_all(&data_path)
            .with_context(|| format!("Could not create {}", data_path.display()))?;

        let backend = Arc::new(LocalBackend::open(config.backend_path())?);
        let guest = GuestStore::new(Arc::new(DirKv::new(config.guest_path())));
        let identity = load_identity(&config.session_path())?;
        debug!(data_dir = %data_path.display(), guest = identity.is_guest(), "Opened data directory");

        let mut planner = Planner::new(backend.clone(), backend.clone(), guest, Arc::new(LogTracker))
            .with_identity(identity);
        planner.refresh(config.event_version.as_deref()).await?;

        Ok(App {
            config,
            backend,
            planner,
        })
    }

    pub fn save_session(&self) -> Result<()> {
        save_identity(&self.config.session_path(), self.planner.identity())
    }
}

fn load_identity(path: &Path) -> Result<Identity> {
    if !path.exists() {
        return Ok(Identity::Guest);
    }

    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).with_context(|| format!("Could not read {}", path.display()))
}

fn save_identity(path: &Path, identity: &Identity) -> Result<()> {
    if identity.is_guest() {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        return Ok(());
    }

    let content = serde_json::to_string_pretty(identity)?;
    std::fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use barweek_core::backend::UserAccount;
    use chrono::Utc;

    #[test]
    fn identity_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let identity = Identity::User(UserAccount {
            id: "u1".into(),
            email: "me@example.com".into(),
            created_at: Utc::now(),
        });

        save_identity(&path, &identity).unwrap();
        assert_eq!(load_identity(&path).unwrap(), identity);

        save_identity(&path, &Identity::Guest).unwrap();
        assert!(!path.exists());
        assert_eq!(load_identity(&path).unwrap(), Identity::Guest);
    }
}
