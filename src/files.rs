//! Sandboxed access to the site tree for remote ad-hoc editing.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::utils::{display_relative, write_atomic};

pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".venv",
    "__pycache__",
    ".idea",
    ".vscode",
    "target",
    "node_modules",
];
pub const SENSITIVE_FILES: &[&str] = &[".env", ".env.local", "bhml.db"];
pub const EDITABLE_EXTENSIONS: &[&str] = &["html", "css", "js", "json", "txt", "md", "py", "svg"];

#[derive(Debug, Error)]
pub enum FsError {
    #[error("path escapes the site root")]
    InvalidPath,
    #[error("file not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// The root must exist; it is canonicalized once here.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            root: fs::canonicalize(root)?,
        })
    }

    /// Sorted root-relative listing. Directories end in `/`; ignored
    /// directories, sensitive files and symbolic links are skipped.
    pub fn list(&self) -> Result<Vec<String>, FsError> {
        let mut entries = Vec::new();
        self.walk(Path::new(""), &mut entries)?;
        entries.sort();
        Ok(entries)
    }

    fn walk(&self, relative: &Path, entries: &mut Vec<String>) -> Result<(), FsError> {
        for entry in fs::read_dir(self.root.join(relative))? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let child = relative.join(&name);
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                if is_ignored(&name_str) {
                    continue;
                }
                entries.push(format!("{}/", display_relative(&child)));
                self.walk(&child, entries)?;
            } else if file_type.is_file() && !is_sensitive(&name_str) && is_editable(&child) {
                entries.push(display_relative(&child));
            }
        }
        Ok(())
    }

    /// Maps a request path to an absolute path under the root.
    ///
    /// Absolute paths, `..` segments, ignored directories and sensitive names
    /// are refused before touching the disk. The deepest existing ancestor is then
    /// canonicalized so symbolic links cannot lead outside the root.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, FsError> {
        let requested = requested.trim().replace('\\', "/");
        let mut relative = PathBuf::new();
        for component in Path::new(&requested).components() {
            match component {
                Component::Normal(part) if is_ignored(&part.to_string_lossy()) => {
                    return Err(FsError::InvalidPath)
                }
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(FsError::InvalidPath)
                }
            }
        }
        let Some(file_name) = relative.file_name() else {
            return Err(FsError::InvalidPath);
        };
        if is_sensitive(&file_name.to_string_lossy()) {
            return Err(FsError::InvalidPath);
        }
        let candidate = self.root.join(&relative);
        let mut existing = candidate.as_path();
        while fs::symlink_metadata(existing).is_err() {
            existing = existing.parent().ok_or(FsError::InvalidPath)?;
        }
        match fs::canonicalize(existing) {
            Ok(real) if real.starts_with(&self.root) => Ok(candidate),
            _ => Err(FsError::InvalidPath),
        }
    }

    pub fn read(&self, requested: &str) -> Result<String, FsError> {
        let path = self.resolve(requested)?;
        if path.is_dir() {
            return Err(FsError::NotFound);
        }
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(FsError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    pub fn read_bytes(&self, requested: &str) -> Result<Vec<u8>, FsError> {
        let path = self.resolve(requested)?;
        if path.is_dir() {
            return Err(FsError::NotFound);
        }
        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(FsError::NotFound),
            Err(err) => Err(err.into()),
        }
    }

    /// Unconditional overwrite; parent directories are created as needed.
    pub fn write(&self, requested: &str, content: &[u8]) -> Result<(), FsError> {
        let path = self.resolve(requested)?;
        write_atomic(&path, content)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }

    /// Stores an uploaded file. A target ending in `/` is a directory prefix
    /// and gets the uploaded file name appended; anything else is the full
    /// relative path. Returns the relative path written.
    pub fn upload(&self, target: Option<&str>, content: &[u8], filename: &str) -> Result<String, UploadError> {
        if content.is_empty() {
            return Err(UploadError::EmptyContent);
        }
        let filename = Path::new(filename.trim())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = target.map(str::trim).unwrap_or_default();
        let relative = if target.is_empty() || target.ends_with('/') {
            if filename.is_empty() {
                return Err(UploadError::MissingFilename);
            }
            format!("{target}{filename}")
        } else {
            target.to_string()
        };
        self.write(&relative, content)?;
        Ok(relative)
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("uploaded file is empty")]
    EmptyContent,
    #[error("uploaded file has no usable name")]
    MissingFilename,
    #[error(transparent)]
    Fs(#[from] FsError),
}

fn is_ignored(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

fn is_sensitive(name: &str) -> bool {
    SENSITIVE_FILES.contains(&name)
}

fn is_editable(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| EDITABLE_EXTENSIONS.contains(&ext.as_str()))
}
