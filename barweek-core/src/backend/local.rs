//! In-process backend with optional JSON file persistence.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::{
    AgendaRow, AuthProvider, Backend, BarVisitRow, Credentials, PredictionRow, UserAccount,
};
use crate::error::{BarweekError, BarweekResult};
use crate::event::{Bar, Event};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    #[serde(flatten)]
    account: UserAccount,
    password_digest: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Tables {
    events: Vec<Event>,
    bars: Vec<Bar>,
    agenda: Vec<AgendaRow>,
    visits: Vec<BarVisitRow>,
    predictions: Vec<PredictionRow>,
    accounts: Vec<StoredAccount>,
}

pub struct LocalBackend {
    path: Option<PathBuf>,
    tables: RwLock<Tables>,
}

impl LocalBackend {
    pub fn in_memory() -> Self {
        LocalBackend {
            path: None,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Open a backend persisted at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> BarweekResult<Self> {
        let path = path.into();

        let tables = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                BarweekError::Storage(format!("Could not read {}: {}", path.display(), e))
            })?
        } else {
            Tables::default()
        };

        Ok(LocalBackend {
            path: Some(path),
            tables: RwLock::new(tables),
        })
    }

    /// Seed events and bars, replacing records with the same id.
    pub async fn import_catalog(&self, events: Vec<Event>, bars: Vec<Bar>) -> BarweekResult<()> {
        self.mutate(|tables| {
            for event in events {
                match tables.events.iter_mut().find(|e| e.id == event.id) {
                    Some(existing) => *existing = event,
                    None => tables.events.push(event),
                }
            }
            for bar in bars {
                match tables.bars.iter_mut().find(|b| b.id == bar.id) {
                    Some(existing) => *existing = bar,
                    None => tables.bars.push(bar),
                }
            }
            Ok(())
        })
        .await
    }

    /// Apply a change to a copy of the tables, persist it, then commit.
    /// A failed change or failed write leaves the live tables untouched.
    async fn mutate<R>(
        &self,
        change: impl FnOnce(&mut Tables) -> BarweekResult<R>,
    ) -> BarweekResult<R> {
        let mut tables = self.tables.write().await;
        let mut next = tables.clone();
        let result = change(&mut next)?;

        if let Some(path) = &self.path {
            persist(path, &next)?;
        }

        *tables = next;
        Ok(result)
    }
}

fn persist(path: &Path, tables: &Tables) -> BarweekResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(tables)?;
    let temp = path.with_extension("json.tmp");
    std::fs::write(&temp, content)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

fn password_digest(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_email(email: &str) -> BarweekResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(BarweekError::Validation(format!("'{}' is not a valid email", email))),
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn events(&self) -> BarweekResult<Vec<Event>> {
        Ok(self.tables.read().await.events.clone())
    }

    async fn bars(&self) -> BarweekResult<Vec<Bar>> {
        Ok(self.tables.read().await.bars.clone())
    }

    async fn agenda_for(&self, user_id: &str) -> BarweekResult<Vec<AgendaRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .agenda
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_agenda(&self) -> BarweekResult<Vec<AgendaRow>> {
        Ok(self.tables.read().await.agenda.clone())
    }

    async fn insert_agenda(&self, row: AgendaRow) -> BarweekResult<()> {
        self.mutate(|tables| {
            let exists = tables
                .agenda
                .iter()
                .any(|r| r.user_id == row.user_id && r.event_id == row.event_id);
            if exists {
                return Err(BarweekError::Duplicate(format!(
                    "agenda entry for event '{}'",
                    row.event_id
                )));
            }
            tables.agenda.push(row);
            Ok(())
        })
        .await
    }

    async fn update_agenda_arrival(
        &self,
        user_id: &str,
        event_id: &str,
        arrival_time: &str,
    ) -> BarweekResult<()> {
        self.mutate(|tables| {
            let row = tables
                .agenda
                .iter_mut()
                .find(|r| r.user_id == user_id && r.event_id == event_id)
                .ok_or_else(|| {
                    BarweekError::NotFound(format!("agenda entry for event '{}'", event_id))
                })?;
            row.arrival_time = Some(arrival_time.to_string());
            Ok(())
        })
        .await
    }

    async fn delete_agenda(&self, user_id: &str, event_id: &str) -> BarweekResult<()> {
        self.mutate(|tables| {
            tables
                .agenda
                .retain(|r| !(r.user_id == user_id && r.event_id == event_id));
            Ok(())
        })
        .await
    }

    async fn visits_for(&self, user_id: &str) -> BarweekResult<Vec<BarVisitRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .visits
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_visits(&self) -> BarweekResult<Vec<BarVisitRow>> {
        Ok(self.tables.read().await.visits.clone())
    }

    async fn upsert_visit(&self, row: BarVisitRow) -> BarweekResult<()> {
        self.mutate(|tables| {
            match tables
                .visits
                .iter_mut()
                .find(|r| r.user_id == row.user_id && r.bar_id == row.bar_id)
            {
                Some(existing) => *existing = row,
                None => tables.visits.push(row),
            }
            Ok(())
        })
        .await
    }

    async fn prediction_for(&self, user_id: &str) -> BarweekResult<Option<PredictionRow>> {
        let tables = self.tables.read().await;
        Ok(tables
            .predictions
            .iter()
            .find(|row| row.user_id == user_id)
            .cloned())
    }

    async fn all_predictions(&self) -> BarweekResult<Vec<PredictionRow>> {
        Ok(self.tables.read().await.predictions.clone())
    }

    async fn upsert_prediction(&self, row: PredictionRow) -> BarweekResult<()> {
        self.mutate(|tables| {
            match tables
                .predictions
                .iter_mut()
                .find(|r| r.user_id == row.user_id)
            {
                Some(existing) => *existing = row,
                None => tables.predictions.push(row),
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AuthProvider for LocalBackend {
    async fn sign_up(&self, credentials: &Credentials) -> BarweekResult<UserAccount> {
        let email = normalize_email(&credentials.email)?;
        if credentials.password.len() < MIN_PASSWORD_LEN {
            return Err(BarweekError::Validation(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        self.mutate(|tables| {
            if tables.accounts.iter().any(|a| a.account.email == email) {
                return Err(BarweekError::Auth("User already registered".into()));
            }

            let account = UserAccount {
                id: Uuid::new_v4().to_string(),
                email: email.clone(),
                created_at: Utc::now(),
            };
            tables.accounts.push(StoredAccount {
                account: account.clone(),
                password_digest: password_digest(&email, &credentials.password),
            });
            Ok(account)
        })
        .await
    }

    async fn sign_in(&self, credentials: &Credentials) -> BarweekResult<UserAccount> {
        let email = normalize_email(&credentials.email)?;
        let digest = password_digest(&email, &credentials.password);

        let tables = self.tables.read().await;
        tables
            .accounts
            .iter()
            .find(|a| a.account.email == email && a.password_digest == digest)
            .map(|a| a.account.clone())
            .ok_or_else(|| BarweekError::Auth("Invalid login credentials".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user: &str, event: &str) -> AgendaRow {
        AgendaRow {
            user_id: user.to_string(),
            event_id: event.to_string(),
            arrival_time: Some("20:00".to_string()),
            added_at: Utc::now(),
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn agenda_pair_is_unique() {
        let backend = LocalBackend::in_memory();
        backend.insert_agenda(row("u1", "e1")).await.unwrap();
        backend.insert_agenda(row("u2", "e1")).await.unwrap();

        let err = backend.insert_agenda(row("u1", "e1")).await.unwrap_err();
        assert!(matches!(err, BarweekError::Duplicate(_)));
        assert_eq!(backend.agenda_for("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_absent_row_is_ok() {
        let backend = LocalBackend::in_memory();
        backend.delete_agenda("u1", "e1").await.unwrap();
    }

    #[tokio::test]
    async fn persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let backend = LocalBackend::open(&path).unwrap();
        backend
            .import_catalog(
                vec![Event::new("e1", "Opening", Some("2025-10-07"), Some("20:00"))],
                vec![],
            )
            .await
            .unwrap();
        backend.insert_agenda(row("u1", "e1")).await.unwrap();

        let reopened = LocalBackend::open(&path).unwrap();
        assert_eq!(reopened.events().await.unwrap().len(), 1);
        assert_eq!(reopened.agenda_for("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn import_replaces_by_id() {
        let backend = LocalBackend::in_memory();
        let first = Event::new("e1", "Old Name", Some("2025-10-07"), Some("20:00"));
        let second = Event::new("e1", "New Name", Some("2025-10-07"), Some("20:00"));
        backend.import_catalog(vec![first], vec![]).await.unwrap();
        backend.import_catalog(vec![second], vec![]).await.unwrap();

        let events = backend.events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "New Name");
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let backend = LocalBackend::in_memory();
        let account = backend
            .sign_up(&credentials("Guest@Example.com", "secret-pw"))
            .await
            .unwrap();
        assert_eq!(account.email, "guest@example.com");

        let signed_in = backend
            .sign_in(&credentials("guest@example.com", "secret-pw"))
            .await
            .unwrap();
        assert_eq!(signed_in.id, account.id);

        assert!(
            backend
                .sign_in(&credentials("guest@example.com", "wrong-pw"))
                .await
                .is_err()
        );
        assert!(
            backend
                .sign_up(&credentials("guest@example.com", "another-pw"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn rejects_weak_sign_up() {
        let backend = LocalBackend::in_memory();
        assert!(matches!(
            backend.sign_up(&credentials("not-an-email", "secret-pw")).await,
            Err(BarweekError::Validation(_))
        ));
        assert!(matches!(
            backend.sign_up(&credentials("a@b.com", "123")).await,
            Err(BarweekError::Validation(_))
        ));
    }
}
