use relative_path::{RelativePath, RelativePathBuf};
use std::path::{Path, PathBuf};

/// Type-safe wrapper for file paths relative to the PAL base directory.
///
/// Uses `RelativePathBuf` to enforce that paths are always relative to the
/// PAL's base directory, preventing accidental use of absolute or escaping
/// paths.
///
/// # Examples
///
/// ```
/// use stockroom_base::FilePath;
///
/// let path1 = FilePath::from("data/inventory.json");
/// let path2 = FilePath::from(String::from("stockroom.toml"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the underlying RelativePath as a reference.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Converts to a regular Path for use with std::fs operations.
    /// This returns the relative path portion without a base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }

    /// Consumes the FilePath and returns a PathBuf.
    pub fn into_path_buf(self) -> PathBuf {
        PathBuf::from(self.0.as_str())
    }

    /// Returns the parent directory, or None for a bare file name.
    pub fn parent(&self) -> Option<FilePath> {
        self.0
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .map(FilePath::from)
    }

    /// Returns a sibling path with the given suffix appended to the file name.
    /// Used for transient artifacts such as `inventory.json.tmp`.
    pub fn with_suffix(&self, suffix: &str) -> FilePath {
        FilePath(RelativePathBuf::from(format!("{}{}", self.0, suffix)))
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<RelativePathBuf> for FilePath {
    fn from(p: RelativePathBuf) -> Self {
        Self(p)
    }
}

impl From<&RelativePath> for FilePath {
    fn from(p: &RelativePath) -> Self {
        Self(p.to_relative_path_buf())
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}
