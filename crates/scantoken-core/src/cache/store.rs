use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config;
use crate::error::StoreError;

/// Token file name under the scan configuration directory
const TOKENS_FILE: &str = "tokens.json";

/// Mode for a freshly created token file (owner rw, group/other r)
#[cfg(unix)]
const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode for a freshly created scan directory
#[cfg(unix)]
const DEFAULT_DIR_MODE: u32 = 0o744;

pub type TokenMap = BTreeMap<String, String>;

/// On-disk map from username to cached scan ID token.
///
/// Reads fail open: a missing, unreadable or unparsable file behaves as an
/// empty map, so a corrupt cache can only force a refresh. Writes replace
/// the whole map and do report failures. Concurrent writers from other
/// processes race with last-writer-wins semantics.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/scan/tokens.json`
    pub fn default_location() -> anyhow::Result<Self> {
        Ok(Self::new(config::scan_dir()?.join(TOKENS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached token for `username`, or an empty string when there is none
    pub fn load(&self, username: &str) -> String {
        self.load_all().remove(username).unwrap_or_default()
    }

    /// The whole map; empty when the file is missing or corrupt
    pub fn load_all(&self) -> TokenMap {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No token store yet");
                return TokenMap::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read token store, treating as empty");
                return TokenMap::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse token store, treating as empty");
                TokenMap::new()
            }
        }
    }

    /// Insert or overwrite the entry for `username`, keeping every other entry
    pub fn save(&self, username: &str, token: &str) -> Result<(), StoreError> {
        self.update(|tokens| {
            tokens.insert(username.to_string(), token.to_string());
        })
    }

    /// Drop the entry for `username`; a missing entry is not an error
    pub fn remove(&self, username: &str) -> Result<(), StoreError> {
        if !self.load_all().contains_key(username) {
            return Ok(());
        }
        self.update(|tokens| {
            tokens.remove(username);
        })
    }

    fn update(&self, apply: impl FnOnce(&mut TokenMap)) -> Result<(), StoreError> {
        self.prepare_dir()?;

        let existing_mode = self.existing_mode()?;

        let mut tokens = self.load_all();
        apply(&mut tokens);
        let contents = serde_json::to_string(&tokens)?;

        self.write(contents.as_bytes(), existing_mode)
    }

    fn prepare_dir(&self) -> Result<(), StoreError> {
        let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        if parent.is_dir() {
            return Ok(());
        }

        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DEFAULT_DIR_MODE);
        }
        builder.create(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })
    }

    /// Permission bits of the current file, `None` if it does not exist yet
    fn existing_mode(&self) -> Result<Option<std::fs::Permissions>, StoreError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.permissions())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(
        &self,
        contents: &[u8],
        existing: Option<std::fs::Permissions>,
    ) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(DEFAULT_FILE_MODE);
        }

        {
            use std::io::Write;
            let mut file = options.open(&self.path).map_err(write_err)?;
            file.write_all(contents).map_err(write_err)?;
        }

        if let Some(permissions) = existing {
            std::fs::set_permissions(&self.path, permissions).map_err(write_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> TokenStore {
        TokenStore::new(dir.path().join("scan").join(TOKENS_FILE))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load("alice"), "");
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();

        for contents in ["{not json", "[1, 2, 3]", r#"{"alice": 42}"#, ""] {
            std::fs::write(store.path(), contents).unwrap();
            assert_eq!(store.load("alice"), "", "contents: {contents}");
        }
    }

    #[test]
    fn test_load_unknown_user_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("alice", "token-a").unwrap();
        assert_eq!(store.load("bob"), "");
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.load("alice"), "");
        store.save("alice", "eyJhbGciOi.first.sig").unwrap();
        assert_eq!(store.load("alice"), "eyJhbGciOi.first.sig");

        store.save("alice", "eyJhbGciOi.second.sig").unwrap();
        assert_eq!(store.load("alice"), "eyJhbGciOi.second.sig");
    }

    #[test]
    fn test_save_preserves_other_users() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save("alice", "token-a").unwrap();
        store.save("bob", "token-b").unwrap();
        store.save("alice", "token-a2").unwrap();

        let all = store.load_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all["alice"], "token-a2");
        assert_eq!(all["bob"], "token-b");
    }

    #[test]
    fn test_save_writes_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("alice", "token-a").unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, serde_json::json!({ "alice": "token-a" }));
    }

    #[test]
    fn test_save_overwrites_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{{{{").unwrap();

        store.save("bob", "token-b").unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let parsed: TokenMap = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["bob"], "token-b");
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.remove("alice").unwrap();
        assert!(!store.path().exists());

        store.save("alice", "token-a").unwrap();
        store.save("bob", "token-b").unwrap();
        store.remove("alice").unwrap();

        assert_eq!(store.load("alice"), "");
        assert_eq!(store.load("bob"), "token-b");
    }

    #[test]
    fn test_save_fails_when_directory_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the scan directory should be
        let blocker = dir.path().join("scan");
        std::fs::write(&blocker, "").unwrap();

        let store = store_in(&dir);
        let err = store.save("alice", "token-a").unwrap_err();
        assert!(matches!(err, StoreError::CreateDir { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_gets_default_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("alice", "token-a").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        // The process umask may only clear bits
        assert_eq!(mode & 0o777 & !0o644, 0);
        assert_ne!(mode & 0o600, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_mode_is_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save("alice", "token-a").unwrap();
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o600)).unwrap();

        store.save("bob", "token-b").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
