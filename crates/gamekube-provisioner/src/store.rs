//! Manifest storage on the local filesystem
//!
//! One file per server, named `{game}-{identity}.yml`. Records are written
//! once and never deleted here.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ProvisionError;
use crate::identity::ServerIdentity;
use crate::renderer::RenderedManifest;
use crate::request::Game;

/// Storage key of one manifest record, `{game}-{identity}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManifestKey(String);

impl ManifestKey {
    /// Key for the server `identity` of `game`
    pub fn new(game: Game, identity: &ServerIdentity) -> Self {
        Self(format!("{}-{}", game, identity))
    }

    /// Key text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name the record is stored under
    pub fn file_name(&self) -> String {
        format!("{}.yml", self.0)
    }
}

impl fmt::Display for ManifestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A manifest as read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedManifest {
    /// Where the record lives
    pub location: PathBuf,
    /// Exact bytes on disk
    pub bytes: Vec<u8>,
}

/// Directory of manifest records
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    /// Store records under `dir`, which is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Location of the record for `key`
    pub fn location(&self, key: &ManifestKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Write `manifest` as the record for `key`, replacing any existing file
    pub async fn write(
        &self,
        key: &ManifestKey,
        manifest: RenderedManifest,
    ) -> Result<PathBuf, ProvisionError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ProvisionError::io(&self.dir, e))?;

        let location = self.location(key);
        let bytes = manifest.into_bytes();
        let len = bytes.len();
        tokio::fs::write(&location, bytes)
            .await
            .map_err(|e| ProvisionError::io(&location, e))?;

        debug!(key = %key, path = %location.display(), bytes = len, "persisted manifest");
        Ok(location)
    }

    /// Read the record at `location`
    pub async fn read(&self, location: &Path) -> Result<PersistedManifest, ProvisionError> {
        let bytes = tokio::fs::read(location)
            .await
            .map_err(|e| ProvisionError::io(location, e))?;
        Ok(PersistedManifest {
            location: location.to_path_buf(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::renderer::{InMemoryTemplateRepository, TemplateRenderer};
    use crate::request::{ServerCreationRequest, ServerType};

    async fn rendered(identity: &ServerIdentity, source: &str) -> RenderedManifest {
        let renderer = TemplateRenderer::new(Arc::new(
            InMemoryTemplateRepository::new().with_template("pz", source),
        ));
        let request = ServerCreationRequest {
            name: "survivors".to_string(),
            server_type: ServerType::PzSm,
            game: Game::Pz,
            description: None,
        };
        renderer.render(&request, identity).await.unwrap()
    }

    #[test]
    fn test_key_format() {
        let id = ServerIdentity::generate();
        let key = ManifestKey::new(Game::Pz, &id);
        assert_eq!(key.as_str(), format!("PZ-{}", id));
        assert_eq!(key.file_name(), format!("PZ-{}.yml", id));
    }

    #[tokio::test]
    async fn test_write_then_read_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        // Nested path checks the directory is created on demand
        let store = ManifestStore::new(dir.path().join("manifests"));
        let id = ServerIdentity::generate();
        let manifest = rendered(&id, "ID: {{ ID }}\nnote: \"ünïcode\"\n").await;
        let expected = manifest.as_str().as_bytes().to_vec();

        let key = ManifestKey::new(Game::Pz, &id);
        let location = store.write(&key, manifest).await.unwrap();
        assert_eq!(location, store.location(&key));

        let persisted = store.read(&location).await.unwrap();
        assert_eq!(persisted.bytes, expected);
        assert_eq!(persisted.location, location);
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let id = ServerIdentity::generate();
        let key = ManifestKey::new(Game::Pz, &id);

        store.write(&key, rendered(&id, "first-and-longer\n").await).await.unwrap();
        let location = store.write(&key, rendered(&id, "second\n").await).await.unwrap();

        assert_eq!(store.read(&location).await.unwrap().bytes, b"second\n");
    }

    #[tokio::test]
    async fn test_read_missing_record_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path());
        let err = store.read(&dir.path().join("PZ-missing.yml")).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Io { .. }));
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let store = ManifestStore::new(&blocker);
        let id = ServerIdentity::generate();

        let err = store
            .write(&ManifestKey::new(Game::Pz, &id), rendered(&id, "x").await)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Io { .. }));
    }
}
