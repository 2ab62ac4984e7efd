use super::{PreferenceStore, PreferencesEnvelope};
use crate::catalog::DEFAULT_PREFERENCES;
use crate::error::{PrefsError, Result};
use crate::merge::{self, PartialPreferences};
use crate::model::PreferenceDocument;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores each user's document as `<root>/preferences/<user>.json`.
pub struct FileStore {
    root: PathBuf,
    user: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, user: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            user: user.into(),
        }
    }

    pub fn document_path(&self) -> PathBuf {
        self.root
            .join("preferences")
            .join(format!("{}.json", self.user))
    }

    /// When the document was last written; `None` before the first write.
    pub async fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        match fs::metadata(self.document_path()).await {
            Ok(meta) => Ok(Some(meta.modified()?.into())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_raw(&self, path: &Path) -> Result<Value> {
        if !fs::try_exists(path).await? {
            return Ok(Value::Null);
        }
        let content = fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        let mut envelope: Value = serde_json::from_str(&content)?;
        Ok(envelope
            .get_mut("preferences")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

#[async_trait]
impl PreferenceStore for FileStore {
    async fn fetch_preferences(&self) -> Result<PartialPreferences> {
        let raw = self.read_raw(&self.document_path()).await?;
        PartialPreferences::from_value(&raw)
    }

    async fn update_preferences(
        &self,
        document: PreferenceDocument,
    ) -> Result<PreferenceDocument> {
        let path = self.document_path();
        let dir = path
            .parent()
            .ok_or_else(|| PrefsError::Store(format!("Invalid store path: {}", path.display())))?;
        fs::create_dir_all(dir).await?;

        let envelope = PreferencesEnvelope {
            preferences: &document,
        };
        let content = serde_json::to_string_pretty(&envelope)?;

        // Write to a sibling temp file and rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        let stored = self.read_raw(&path).await?;
        merge::merge_value(&stored, &DEFAULT_PREFERENCES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_preferences;
    use crate::model::{GridKey, TeamColorScheme, Theme};
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_an_empty_document() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path(), "coach");
        let partial = store.fetch_preferences().await.unwrap();
        assert_eq!(partial, PartialPreferences::default());
    }

    #[tokio::test]
    async fn update_writes_envelope_and_echoes() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path(), "coach");

        let mut doc = default_preferences();
        doc.ui.theme = Theme::Dark;
        doc.team_color_schemes
            .insert(12, TeamColorScheme::new("#203731", "#ffb612"));
        doc.grids.standings.columns = vec!["team".into(), "wins".into()];

        let echo = store.update_preferences(doc.clone()).await.unwrap();
        assert_eq!(echo, doc);

        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(store.document_path()).unwrap()).unwrap();
        assert_eq!(on_disk["preferences"]["ui"]["theme"], "dark");
        assert!(!store.document_path().with_extension("json.tmp").exists());

        let partial = store.fetch_preferences().await.unwrap();
        assert_eq!(partial.theme, Some(Theme::Dark));
        assert_eq!(
            partial.grids[&GridKey::Standings].columns,
            Some(vec!["team".to_string(), "wins".to_string()])
        );
    }

    #[tokio::test]
    async fn last_modified_tracks_writes() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path(), "coach");
        assert_eq!(store.last_modified().await.unwrap(), None);

        store.update_preferences(default_preferences()).await.unwrap();
        assert!(store.last_modified().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let temp = TempDir::new().unwrap();
        let a = FileStore::new(temp.path(), "a");
        let b = FileStore::new(temp.path(), "b");

        let mut doc = default_preferences();
        doc.ui.theme = Theme::Light;
        a.update_preferences(doc).await.unwrap();

        assert_eq!(b.fetch_preferences().await.unwrap().theme, None);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path(), "coach");
        std::fs::create_dir_all(store.document_path().parent().unwrap()).unwrap();
        std::fs::write(store.document_path(), "{ not json").unwrap();

        assert!(matches!(
            store.fetch_preferences().await,
            Err(PrefsError::Serialization(_))
        ));
    }
}
