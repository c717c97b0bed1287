use std::{
    fmt::{Display, Formatter},
    fs, io,
    path::{Path, PathBuf},
};

const RES_SCHEME: &str = "res://";

/// Filesystem anchor for `res://` locators. Passed explicitly; there is no process-wide root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    root: PathBuf,
}

#[derive(Debug)]
pub enum LoadError {
    EmptyLocator,
    UnsupportedScheme(String),
    NotFound(PathBuf),
    Io { path: PathBuf, source: io::Error },
    InvalidUtf8(PathBuf),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLocator => write!(f, "empty asset locator"),
            Self::UnsupportedScheme(locator) => {
                write!(f, "unsupported locator scheme in `{locator}`")
            }
            Self::NotFound(path) => write!(f, "asset not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::InvalidUtf8(path) => write!(f, "asset is not valid UTF-8: {}", path.display()),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl AssetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Map a locator to a disk path.
    ///
    /// `res://a/b.scn` resolves under the root, absolute paths are taken as-is, and
    /// bare relative paths are joined to the root. Any other `scheme://` is rejected.
    pub fn resolve(&self, locator: &str) -> Result<PathBuf, LoadError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(LoadError::EmptyLocator);
        }
        if let Some(stripped) = locator.strip_prefix(RES_SCHEME) {
            let rel = stripped.trim_start_matches('/');
            if rel.is_empty() {
                return Err(LoadError::EmptyLocator);
            }
            return Ok(self.root.join(rel));
        }
        if locator.contains("://") {
            return Err(LoadError::UnsupportedScheme(locator.to_string()));
        }
        let path = PathBuf::from(locator);
        if path.is_absolute() {
            return Ok(path);
        }
        Ok(self.root.join(path))
    }

    pub fn load_bytes(&self, locator: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(locator)?;
        fs::read(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound(path.clone()),
            _ => LoadError::Io {
                path: path.clone(),
                source,
            },
        })
    }

    pub fn load_string(&self, locator: &str) -> Result<String, LoadError> {
        let path = self.resolve(locator)?;
        let bytes = self.load_bytes(locator)?;
        String::from_utf8(bytes).map_err(|_| LoadError::InvalidUtf8(path))
    }

    /// Write `contents` to the locator's path, creating parent directories.
    pub fn save_string(&self, locator: &str, contents: &str) -> Result<PathBuf, LoadError> {
        let path = self.resolve(locator)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LoadError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, contents).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
