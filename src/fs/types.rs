//! File System Types
//!
//! The minimal filesystem capability the interpreter consumes. Redirection
//! uses `read_file`/`write_file`/`append_file`; command handlers get the
//! full surface.

use async_trait::async_trait;
use std::time::SystemTime;
use thiserror::Error;

/// File system errors. Each variant maps to a POSIX-style code, exposed
/// through [`FsError::code`].
#[derive(Error, Debug, Clone)]
pub enum FsError {
    #[error("ENOENT: no such file or directory, {operation} '{path}'")]
    NotFound { path: String, operation: String },

    #[error("EEXIST: file already exists, {operation} '{path}'")]
    AlreadyExists { path: String, operation: String },

    #[error("EISDIR: illegal operation on a directory, {operation} '{path}'")]
    IsDirectory { path: String, operation: String },

    #[error("ENOTDIR: not a directory, {operation} '{path}'")]
    NotDirectory { path: String, operation: String },

    #[error("ENOTEMPTY: directory not empty, {operation} '{path}'")]
    NotEmpty { path: String, operation: String },

    #[error("EACCES: permission denied, {operation} '{path}'")]
    PermissionDenied { path: String, operation: String },
}

impl FsError {
    pub fn not_found(path: &str, operation: &str) -> Self {
        Self::NotFound { path: path.to_string(), operation: operation.to_string() }
    }

    /// The POSIX errno name for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "ENOENT",
            Self::AlreadyExists { .. } => "EEXIST",
            Self::IsDirectory { .. } => "EISDIR",
            Self::NotDirectory { .. } => "ENOTDIR",
            Self::NotEmpty { .. } => "ENOTEMPTY",
            Self::PermissionDenied { .. } => "EACCES",
        }
    }

    /// Short reason used in user-facing command diagnostics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "No such file or directory",
            Self::AlreadyExists { .. } => "File exists",
            Self::IsDirectory { .. } => "Is a directory",
            Self::NotDirectory { .. } => "Not a directory",
            Self::NotEmpty { .. } => "Directory not empty",
            Self::PermissionDenied { .. } => "Permission denied",
        }
    }
}

/// File status information.
#[derive(Debug, Clone)]
pub struct FsStat {
    pub is_file: bool,
    pub is_directory: bool,
    pub size: u64,
    pub mtime: SystemTime,
}

/// Options for mkdir.
#[derive(Debug, Clone, Default)]
pub struct MkdirOptions {
    pub recursive: bool,
}

/// Abstract filesystem capability. Implementations must be safe to share
/// behind an `Arc`; the interpreter only calls in from its own task.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file as a UTF-8 string.
    async fn read_file(&self, path: &str) -> Result<String, FsError>;

    /// Write a file, creating it and any missing parents.
    async fn write_file(&self, path: &str, data: &str) -> Result<(), FsError>;

    /// Append to a file, creating it if missing.
    async fn append_file(&self, path: &str, data: &str) -> Result<(), FsError>;

    /// Entry names of a directory, sorted.
    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError>;

    async fn mkdir(&self, path: &str, options: &MkdirOptions) -> Result<(), FsError>;

    /// Remove an empty directory.
    async fn rmdir(&self, path: &str) -> Result<(), FsError>;

    async fn stat(&self, path: &str) -> Result<FsStat, FsError>;

    /// Succeeds when the path exists.
    async fn access(&self, path: &str) -> Result<(), FsError>;

    /// Remove a file.
    async fn unlink(&self, path: &str) -> Result<(), FsError>;

    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    async fn copy_file(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// Canonical absolute path.
    async fn realpath(&self, path: &str) -> Result<String, FsError>;

    /// Resolve a possibly-relative path against a base directory.
    fn resolve_path(&self, base: &str, path: &str) -> String;
}

/// Collapse a path to absolute normalized form: leading `/`, no empty
/// segments, no `.` or `..`.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    let mut prefixed = path.to_string();
    if !prefixed.starts_with('/') {
        prefixed = format!("/{}", prefixed);
    }
    let parts = prefixed.split('/').filter(|p| !p.is_empty() && *p != ".");
    let mut resolved: Vec<&str> = Vec::new();
    for part in parts {
        if part == ".." {
            resolved.pop();
        } else {
            resolved.push(part);
        }
    }
    if resolved.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", resolved.join("/"))
    }
}

/// Join a path onto a base directory and normalize.
pub fn join_path(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize_path(path)
    } else {
        normalize_path(&format!("{}/{}", base, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/a/b/"), "/a/b");
        assert_eq!(normalize_path("/a/./b"), "/a/b");
        assert_eq!(normalize_path("/a/../b"), "/b");
        assert_eq!(normalize_path("/../.."), "/");
        assert_eq!(normalize_path("a/b"), "/a/b");
        assert_eq!(normalize_path("/a//b"), "/a/b");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/home/user", "f.txt"), "/home/user/f.txt");
        assert_eq!(join_path("/home/user", "/etc/x"), "/etc/x");
        assert_eq!(join_path("/home/user", ".."), "/home");
        assert_eq!(join_path("/", "a"), "/a");
    }

    #[test]
    fn test_error_codes() {
        let err = FsError::not_found("/x", "open");
        assert_eq!(err.code(), "ENOENT");
        assert!(err.to_string().contains("ENOENT"));
        assert_eq!(err.reason(), "No such file or directory");
    }
}
