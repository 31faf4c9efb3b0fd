use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{MatchesDocument, TeamsDocument};
use crate::utils::write_atomic;
use crate::{MATCHES_FILE, TEAMS_FILE};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("malformed json in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The two documents on local disk. Every write is a tmp-file plus rename.
#[derive(Debug, Clone)]
pub struct DataStore {
    dir: PathBuf,
}

impl DataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn read_teams(&self) -> Result<TeamsDocument, StoreError> {
        read_document(&self.dir.join(TEAMS_FILE))
    }

    pub fn read_matches(&self) -> Result<MatchesDocument, StoreError> {
        read_document(&self.dir.join(MATCHES_FILE))
    }

    pub fn write_teams(&self, teams: &TeamsDocument) -> Result<(), StoreError> {
        write_document(&self.dir.join(TEAMS_FILE), teams)
    }

    pub fn write_matches(&self, matches: &MatchesDocument) -> Result<(), StoreError> {
        write_document(&self.dir.join(MATCHES_FILE), matches)
    }
}

/// A missing file is the empty document, not an error.
pub fn read_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_document(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), StoreError> {
    let content = render_document(document)?;
    write_atomic(path, content.as_bytes()).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("wrote {}", path.display());
    Ok(())
}

pub fn parse_document<T: DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(content)
}

/// Two-space indented, non-ASCII kept literal, trailing newline.
pub fn render_document<T: Serialize>(document: &T) -> Result<String, serde_json::Error> {
    let mut content = serde_json::to_string_pretty(document)?;
    content.push('\n');
    Ok(content)
}
