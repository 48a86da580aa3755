//! Newline-delimited JSON credential store.
//!
//! One record per line:
//!
//! ```text
//! {"nickname":"Vasya","account_hash":"4632b104-0f6b-11ee-a5ea-0242ac110002"}
//! ```
//!
//! The file is opened per operation and never held across a session.
//! Records are only ever appended; nothing is rewritten in place.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use minechat_core::{Credentials, Nickname};

use crate::error::Result;

/// Handle to the credential store file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record and flushes it.
    pub async fn append(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut record = serde_json::to_string(credentials)?;
        record.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;

        info!(
            nickname = %credentials.nickname,
            path = %self.path.display(),
            "Credentials saved"
        );
        Ok(())
    }

    /// Returns the first record for `nickname`, scanning forward once.
    ///
    /// Stops at the first match. A missing file is "not found"; malformed
    /// lines are skipped with a warning.
    pub async fn find(&self, nickname: &Nickname) -> Result<Option<Credentials>> {
        let Some(file) = self.open_for_read().await? else {
            return Ok(None);
        };

        let mut lines = BufReader::new(file).lines();
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let Some(credentials) = self.decode(&line, line_no) else {
                continue;
            };
            if credentials.nickname == *nickname {
                debug!(nickname = %nickname, line = line_no, "Credentials found");
                return Ok(Some(credentials));
            }
        }

        debug!(nickname = %nickname, "No stored credentials");
        Ok(None)
    }

    /// Reads every well-formed record in file order.
    pub async fn load_all(&self) -> Result<Vec<Credentials>> {
        let Some(file) = self.open_for_read().await? else {
            return Ok(Vec::new());
        };

        let mut lines = BufReader::new(file).lines();
        let mut records = Vec::new();
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if let Some(credentials) = self.decode(&line, line_no) {
                records.push(credentials);
            }
        }
        Ok(records)
    }

    async fn open_for_read(&self) -> Result<Option<File>> {
        match File::open(&self.path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn decode(&self, line: &str, line_no: usize) -> Option<Credentials> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    line = line_no,
                    error = %e,
                    "Skipping malformed credential record"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.jsonl"))
    }

    #[tokio::test]
    async fn test_append_writes_one_json_line() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .append(&Credentials::new("Vasya", "4632b104"))
            .await
            .unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content,
            "{\"nickname\":\"Vasya\",\"account_hash\":\"4632b104\"}\n"
        );
    }

    #[tokio::test]
    async fn test_find_returns_first_match() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.append(&Credentials::new("alice", "first")).await.unwrap();
        store.append(&Credentials::new("bob", "b")).await.unwrap();
        store.append(&Credentials::new("alice", "second")).await.unwrap();

        let found = store.find(&Nickname::new("alice")).await.unwrap().unwrap();

        assert_eq!(found.account_hash.expose(), "first");
    }

    #[tokio::test]
    async fn test_find_absent_nickname_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.append(&Credentials::new("alice", "a")).await.unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let found = store.find(&Nickname::new("carol")).await.unwrap();

        assert!(found.is_none());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(store.find(&Nickname::new("x")).await.unwrap().is_none());
        assert!(store.load_all().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        std::fs::write(
            store.path(),
            "not json\n\n{\"nickname\":\"bob\",\"account_hash\":\"b\"}\n{\"nickname\":1}\n",
        )
        .unwrap();

        let all = store.load_all().await.unwrap();

        assert_eq!(all, vec![Credentials::new("bob", "b")]);
        assert!(store.find(&Nickname::new("bob")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_append_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("a").join("b").join("creds.jsonl"));

        store.append(&Credentials::new("n", "t")).await.unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }
}
