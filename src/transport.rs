//! Moves the two documents between the editor and wherever the site lives:
//! a local data directory, or a remote host over SFTP.

use std::fs;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use ssh2::{RenameFlags, Session, Sftp};
use thiserror::Error;

use crate::models::{MatchesDocument, TeamsDocument};
use crate::store::{parse_document, render_document, DataStore, StoreError};
use crate::utils::tmp_sibling;
use crate::{MATCHES_FILE, TEAMS_FILE};

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_REMOTE_PATH: &str = "/var/www/html/data/";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not reach {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: io::Error,
    },
    #[error("ssh session with {host} failed: {source}")]
    Session { host: String, source: ssh2::Error },
    #[error("remote file {}: {source}", .path.display())]
    Remote { path: PathBuf, source: io::Error },
    #[error("saving {failed} failed (already saved: {saved:?}): {source}")]
    Save {
        saved: Vec<&'static str>,
        failed: &'static str,
        source: Box<TransportError>,
    },
}

/// Both documents, owned by whichever front-end loaded them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    pub teams: TeamsDocument,
    pub matches: MatchesDocument,
}

/// Connection parameters as typed into the editor. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub remote_path: String,
    pub data_dir: PathBuf,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_SSH_PORT,
            user: String::new(),
            password: String::new(),
            remote_path: DEFAULT_REMOTE_PATH.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl ConnectionSettings {
    pub fn is_remote(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

pub trait Transport {
    fn describe(&self) -> String;
    fn load(&self) -> Result<Documents, TransportError>;
    /// Teams first, then matches. The pair is not atomic: a failure on the
    /// second file leaves the first one saved and says so.
    fn save(&self, documents: &Documents) -> Result<(), TransportError>;
}

/// Remote when a host is configured, local otherwise.
pub fn connect(settings: &ConnectionSettings) -> Box<dyn Transport> {
    if settings.is_remote() {
        Box::new(SftpTransport::new(settings.clone()))
    } else {
        Box::new(LocalTransport::new(settings.data_dir.clone()))
    }
}

fn save_pair<E>(
    mut write_teams: impl FnMut() -> Result<(), E>,
    mut write_matches: impl FnMut() -> Result<(), E>,
) -> Result<(), TransportError>
where
    TransportError: From<E>,
{
    write_teams().map_err(|err| TransportError::Save {
        saved: Vec::new(),
        failed: TEAMS_FILE,
        source: Box::new(err.into()),
    })?;
    write_matches().map_err(|err| TransportError::Save {
        saved: vec![TEAMS_FILE],
        failed: MATCHES_FILE,
        source: Box::new(err.into()),
    })
}

pub struct LocalTransport {
    store: DataStore,
}

impl LocalTransport {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: DataStore::new(data_dir),
        }
    }
}

impl Transport for LocalTransport {
    fn describe(&self) -> String {
        format!("local directory {}", self.store.dir().display())
    }

    fn load(&self) -> Result<Documents, TransportError> {
        fs::create_dir_all(self.store.dir()).map_err(|source| StoreError::Io {
            path: self.store.dir().to_path_buf(),
            source,
        })?;
        Ok(Documents {
            teams: self.store.read_teams()?,
            matches: self.store.read_matches()?,
        })
    }

    fn save(&self, documents: &Documents) -> Result<(), TransportError> {
        save_pair(
            || self.store.write_teams(&documents.teams),
            || self.store.write_matches(&documents.matches),
        )
    }
}

pub struct SftpTransport {
    settings: ConnectionSettings,
}

impl SftpTransport {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    fn remote_file(&self, name: &str) -> PathBuf {
        Path::new(&self.settings.remote_path).join(name)
    }

    fn open(&self) -> Result<RemoteSession, TransportError> {
        let host = self.settings.host.trim().to_string();
        let port = self.settings.port;
        let tcp = TcpStream::connect((host.as_str(), port)).map_err(|source| TransportError::Connect {
            host: host.clone(),
            port,
            source,
        })?;
        let session_error = |source| TransportError::Session {
            host: host.clone(),
            source,
        };
        let mut session = Session::new().map_err(session_error)?;
        session.set_tcp_stream(tcp);
        session.handshake().map_err(session_error)?;
        session
            .userauth_password(&self.settings.user, &self.settings.password)
            .map_err(session_error)?;
        let sftp = session.sftp().map_err(session_error)?;
        log::debug!("opened sftp session with {host}:{port}");
        Ok(RemoteSession {
            session,
            sftp: Some(sftp),
        })
    }
}

impl Transport for SftpTransport {
    fn describe(&self) -> String {
        format!(
            "{}@{}:{}{}",
            self.settings.user, self.settings.host, self.settings.port, self.settings.remote_path
        )
    }

    fn load(&self) -> Result<Documents, TransportError> {
        let remote = self.open()?;
        let teams_path = self.remote_file(TEAMS_FILE);
        let matches_path = self.remote_file(MATCHES_FILE);
        Ok(Documents {
            teams: remote.read_document(&teams_path)?,
            matches: remote.read_document(&matches_path)?,
        })
    }

    fn save(&self, documents: &Documents) -> Result<(), TransportError> {
        let remote = self.open()?;
        let teams_path = self.remote_file(TEAMS_FILE);
        let matches_path = self.remote_file(MATCHES_FILE);
        save_pair(
            || remote.write_document(&teams_path, &documents.teams),
            || remote.write_document(&matches_path, &documents.matches),
        )
    }
}

/// One authenticated SFTP session, used for a single load or save and
/// disconnected when dropped.
struct RemoteSession {
    session: Session,
    sftp: Option<Sftp>,
}

impl RemoteSession {
    fn sftp(&self, path: &Path) -> Result<&Sftp, TransportError> {
        self.sftp.as_ref().ok_or_else(|| TransportError::Remote {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotConnected, "sftp channel closed"),
        })
    }

    fn read_document<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<T, TransportError> {
        let remote_error = |source: io::Error| TransportError::Remote {
            path: path.to_path_buf(),
            source,
        };
        let mut file = self
            .sftp(path)?
            .open(path)
            .map_err(|err| remote_error(err.into()))?;
        let mut content = String::new();
        file.read_to_string(&mut content).map_err(remote_error)?;
        parse_document(&content).map_err(|source| {
            StoreError::Parse {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    fn write_document<T: serde::Serialize>(&self, path: &Path, document: &T) -> Result<(), TransportError> {
        let content = render_document(document).map_err(StoreError::from)?;
        replace_remote(self.sftp(path)?, path, content.as_bytes()).map_err(|source| {
            TransportError::Remote {
                path: path.to_path_buf(),
                source,
            }
        })?;
        log::info!("uploaded {}", path.display());
        Ok(())
    }
}

/// The few remote file operations a document upload needs.
trait RemoteFs {
    fn put(&self, path: &Path, content: &[u8]) -> io::Result<()>;
    fn rename_over(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

impl RemoteFs for Sftp {
    fn put(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        let mut file = self.create(path)?;
        file.write_all(content)
    }

    fn rename_over(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.rename(
            from,
            to,
            Some(RenameFlags::OVERWRITE | RenameFlags::ATOMIC | RenameFlags::NATIVE),
        )
        .map_err(io::Error::from)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.unlink(path).map_err(io::Error::from)
    }
}

/// Uploads next to the destination, then renames over it.
///
/// SFTPv3 servers (OpenSSH among them) ignore rename flags and refuse to
/// rename onto an existing file, so a refused rename removes the old
/// document and retries. The staging file never outlives a failure.
fn replace_remote(remote: &impl RemoteFs, path: &Path, content: &[u8]) -> io::Result<()> {
    let tmp_path = tmp_sibling(path);
    let result = remote.put(&tmp_path, content).and_then(|()| {
        remote.rename_over(&tmp_path, path).or_else(|refused| {
            log::debug!("rename onto {} refused ({refused}), replacing", path.display());
            remote.remove(path).map_err(|_| refused)?;
            remote.rename_over(&tmp_path, path)
        })
    });
    if result.is_err() {
        if let Err(err) = remote.remove(&tmp_path) {
            log::debug!("leaving {}: {err}", tmp_path.display());
        }
    }
    result
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        drop(self.sftp.take());
        if let Err(err) = self.session.disconnect(None, "bhml-editor done", None) {
            log::warn!("closing ssh session: {err}");
        } else {
            log::debug!("closed sftp session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::MatchForm;
    use crate::models::MatchStatus;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory server with SFTPv3 rename rules: renaming onto an existing
    /// file fails.
    #[derive(Default)]
    struct V3Server {
        files: RefCell<HashMap<PathBuf, Vec<u8>>>,
        fail_puts: bool,
    }

    impl RemoteFs for V3Server {
        fn put(&self, path: &Path, content: &[u8]) -> io::Result<()> {
            let mut files = self.files.borrow_mut();
            if self.fail_puts {
                files.insert(path.to_path_buf(), content[..content.len() / 2].to_vec());
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection lost"));
            }
            files.insert(path.to_path_buf(), content.to_vec());
            Ok(())
        }

        fn rename_over(&self, from: &Path, to: &Path) -> io::Result<()> {
            let mut files = self.files.borrow_mut();
            if files.contains_key(to) {
                return Err(io::Error::new(io::ErrorKind::Other, "failure"));
            }
            let content = files
                .remove(from)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            files.insert(to.to_path_buf(), content);
            Ok(())
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            self.files
                .borrow_mut()
                .remove(path)
                .map(drop)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    #[test]
    fn remote_replace_overwrites_an_existing_document() {
        let server = V3Server::default();
        let path = Path::new("/var/www/html/data/teams.json");
        replace_remote(&server, path, b"first").unwrap();
        replace_remote(&server, path, b"second").unwrap();
        let files = server.files.borrow();
        assert_eq!(files.get(path).map(Vec::as_slice), Some(&b"second"[..]));
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn failed_remote_upload_removes_the_staging_file() {
        let server = V3Server {
            fail_puts: true,
            ..V3Server::default()
        };
        let path = Path::new("/srv/data/matches.json");
        assert!(replace_remote(&server, path, b"{}").is_err());
        assert!(server.files.borrow().is_empty());
    }

    #[test]
    fn host_selects_the_mode() {
        let mut settings = ConnectionSettings::default();
        assert!(!settings.is_remote());
        settings.host = "   ".to_string();
        assert!(!settings.is_remote());
        settings.host = "10.147.17.3".to_string();
        assert!(settings.is_remote());
        assert!(connect(&settings).describe().contains("10.147.17.3"));
    }

    #[test]
    fn local_load_creates_the_directory_and_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let transport = LocalTransport::new(&data_dir);
        assert_eq!(transport.load().unwrap(), Documents::default());
        assert!(data_dir.is_dir());
    }

    #[test]
    fn local_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let transport = LocalTransport::new(dir.path());
        let mut documents = Documents::default();
        documents.teams.upsert_team(None, "rdfz", "RDFZ").unwrap();
        documents
            .matches
            .upsert_match(&MatchForm {
                id: "m1".to_string(),
                status: MatchStatus::Live,
                ..MatchForm::default()
            })
            .unwrap();
        transport.save(&documents).unwrap();
        assert_eq!(transport.load().unwrap(), documents);
    }

    #[cfg(unix)]
    #[test]
    fn partial_save_names_what_was_saved() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where matches.json should be makes the rename fail
        fs::create_dir_all(dir.path().join(MATCHES_FILE).join("blocker")).unwrap();
        let transport = LocalTransport::new(dir.path());
        let err = transport.save(&Documents::default()).unwrap_err();
        match err {
            TransportError::Save { saved, failed, .. } => {
                assert_eq!(saved, vec![TEAMS_FILE]);
                assert_eq!(failed, MATCHES_FILE);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(dir.path().join(TEAMS_FILE).is_file());
    }

    #[test]
    fn unreachable_host_is_reported() {
        let settings = ConnectionSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..ConnectionSettings::default()
        };
        assert!(matches!(
            SftpTransport::new(settings).load(),
            Err(TransportError::Connect { .. })
        ));
    }
}
