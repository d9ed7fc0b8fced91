//! In-Memory File System
//!
//! A pure in-memory filesystem keyed by normalized absolute path. This is
//! the default sandbox backend; hosts may plug in their own `FileSystem`.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::{
    join_path, normalize_path, FileSystem, FsError, FsStat, MkdirOptions,
};

#[derive(Debug, Clone)]
enum Entry {
    File { content: String, mtime: SystemTime },
    Directory { mtime: SystemTime },
}

impl Entry {
    fn file(content: impl Into<String>) -> Self {
        Entry::File { content: content.into(), mtime: SystemTime::now() }
    }

    fn directory() -> Self {
        Entry::Directory { mtime: SystemTime::now() }
    }

    fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }
}

/// In-memory virtual filesystem.
pub struct MemFs {
    data: RwLock<HashMap<String, Entry>>,
}

impl MemFs {
    /// Create an empty filesystem containing only the root directory.
    pub fn new() -> Self {
        let mut data = HashMap::new();
        data.insert("/".to_string(), Entry::directory());
        Self { data: RwLock::new(data) }
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

fn dirname(path: &str) -> String {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => normalized[..pos].to_string(),
        None => "/".to_string(),
    }
}

fn ensure_parent_dirs(data: &mut HashMap<String, Entry>, path: &str) {
    let dir = dirname(path);
    if dir == "/" || data.contains_key(&dir) {
        return;
    }
    let parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    let mut current = String::new();
    for part in parts {
        current = format!("{}/{}", current, part);
        data.entry(current.clone()).or_insert_with(Entry::directory);
    }
}

#[async_trait]
impl FileSystem for MemFs {
    async fn read_file(&self, path: &str) -> Result<String, FsError> {
        let data = self.data.read().await;
        let normalized = normalize_path(path);
        match data.get(&normalized) {
            Some(Entry::File { content, .. }) => Ok(content.clone()),
            Some(Entry::Directory { .. }) => Err(FsError::IsDirectory {
                path: normalized,
                operation: "read".to_string(),
            }),
            None => Err(FsError::not_found(&normalized, "open")),
        }
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let normalized = normalize_path(path);
        if let Some(entry) = data.get(&normalized) {
            if entry.is_directory() {
                return Err(FsError::IsDirectory {
                    path: normalized,
                    operation: "write".to_string(),
                });
            }
        }
        ensure_parent_dirs(&mut data, &normalized);
        data.insert(normalized, Entry::file(contents));
        Ok(())
    }

    async fn append_file(&self, path: &str, contents: &str) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let normalized = normalize_path(path);
        match data.get_mut(&normalized) {
            Some(Entry::File { content, mtime }) => {
                content.push_str(contents);
                *mtime = SystemTime::now();
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(FsError::IsDirectory {
                path: normalized,
                operation: "append".to_string(),
            }),
            None => {
                ensure_parent_dirs(&mut data, &normalized);
                data.insert(normalized, Entry::file(contents));
                Ok(())
            }
        }
    }

    async fn readdir(&self, path: &str) -> Result<Vec<String>, FsError> {
        let data = self.data.read().await;
        let normalized = normalize_path(path);
        match data.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(_) => {
                return Err(FsError::NotDirectory {
                    path: normalized,
                    operation: "scandir".to_string(),
                })
            }
            None => return Err(FsError::not_found(&normalized, "scandir")),
        }

        let prefix = if normalized == "/" {
            "/".to_string()
        } else {
            format!("{}/", normalized)
        };
        let mut names: Vec<String> = data
            .keys()
            .filter(|k| *k != &normalized && k.starts_with(&prefix))
            .filter_map(|k| {
                let rest = &k[prefix.len()..];
                if rest.contains('/') {
                    None
                } else {
                    Some(rest.to_string())
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    async fn mkdir(&self, path: &str, options: &MkdirOptions) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let normalized = normalize_path(path);

        if data.contains_key(&normalized) {
            if options.recursive {
                return Ok(());
            }
            return Err(FsError::AlreadyExists {
                path: normalized,
                operation: "mkdir".to_string(),
            });
        }

        let parent = dirname(&normalized);
        match data.get(&parent) {
            Some(entry) if entry.is_directory() => {}
            Some(_) => {
                return Err(FsError::NotDirectory {
                    path: parent,
                    operation: "mkdir".to_string(),
                })
            }
            None if options.recursive => ensure_parent_dirs(&mut data, &normalized),
            None => return Err(FsError::not_found(&parent, "mkdir")),
        }

        data.insert(normalized, Entry::directory());
        Ok(())
    }

    async fn rmdir(&self, path: &str) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let normalized = normalize_path(path);
        match data.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(_) => {
                return Err(FsError::NotDirectory {
                    path: normalized,
                    operation: "rmdir".to_string(),
                })
            }
            None => return Err(FsError::not_found(&normalized, "rmdir")),
        }

        let prefix = format!("{}/", normalized);
        if data.keys().any(|k| k.starts_with(&prefix)) {
            return Err(FsError::NotEmpty {
                path: normalized,
                operation: "rmdir".to_string(),
            });
        }
        data.remove(&normalized);
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FsStat, FsError> {
        let data = self.data.read().await;
        let normalized = normalize_path(path);
        match data.get(&normalized) {
            Some(Entry::File { content, mtime }) => Ok(FsStat {
                is_file: true,
                is_directory: false,
                size: content.len() as u64,
                mtime: *mtime,
            }),
            Some(Entry::Directory { mtime }) => Ok(FsStat {
                is_file: false,
                is_directory: true,
                size: 0,
                mtime: *mtime,
            }),
            None => Err(FsError::not_found(&normalized, "stat")),
        }
    }

    async fn access(&self, path: &str) -> Result<(), FsError> {
        let data = self.data.read().await;
        let normalized = normalize_path(path);
        if data.contains_key(&normalized) {
            Ok(())
        } else {
            Err(FsError::not_found(&normalized, "access"))
        }
    }

    async fn unlink(&self, path: &str) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let normalized = normalize_path(path);
        match data.get(&normalized) {
            Some(Entry::File { .. }) => {
                data.remove(&normalized);
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(FsError::IsDirectory {
                path: normalized,
                operation: "unlink".to_string(),
            }),
            None => Err(FsError::not_found(&normalized, "unlink")),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let from = normalize_path(from);
        let to = normalize_path(to);
        if !data.contains_key(&from) {
            return Err(FsError::not_found(&from, "rename"));
        }

        // Move the entry and, for directories, everything beneath it.
        let prefix = format!("{}/", from);
        let moved: Vec<(String, Entry)> = data
            .iter()
            .filter(|(k, _)| *k == &from || k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (k, _) in &moved {
            data.remove(k);
        }
        ensure_parent_dirs(&mut data, &to);
        for (k, v) in moved {
            let suffix = &k[from.len()..];
            data.insert(format!("{}{}", to, suffix), v);
        }
        Ok(())
    }

    async fn copy_file(&self, from: &str, to: &str) -> Result<(), FsError> {
        let mut data = self.data.write().await;
        let from = normalize_path(from);
        let to = normalize_path(to);
        let content = match data.get(&from) {
            Some(Entry::File { content, .. }) => content.clone(),
            Some(Entry::Directory { .. }) => {
                return Err(FsError::IsDirectory {
                    path: from,
                    operation: "copyfile".to_string(),
                })
            }
            None => return Err(FsError::not_found(&from, "copyfile")),
        };
        ensure_parent_dirs(&mut data, &to);
        data.insert(to, Entry::file(content));
        Ok(())
    }

    async fn realpath(&self, path: &str) -> Result<String, FsError> {
        let data = self.data.read().await;
        let normalized = normalize_path(path);
        if data.contains_key(&normalized) {
            Ok(normalized)
        } else {
            Err(FsError::not_found(&normalized, "realpath"))
        }
    }

    fn resolve_path(&self, base: &str, path: &str) -> String {
        join_path(base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let fs = MemFs::new();
        fs.write_file("/a/b/f.txt", "hello").await.unwrap();
        assert_eq!(fs.read_file("/a/b/f.txt").await.unwrap(), "hello");
        // Parents were created implicitly.
        assert!(fs.stat("/a/b").await.unwrap().is_directory);
    }

    #[tokio::test]
    async fn test_read_missing_is_enoent() {
        let fs = MemFs::new();
        let err = fs.read_file("/nope").await.unwrap_err();
        assert_eq!(err.code(), "ENOENT");
    }

    #[tokio::test]
    async fn test_append() {
        let fs = MemFs::new();
        fs.append_file("/f", "a").await.unwrap();
        fs.append_file("/f", "b").await.unwrap();
        assert_eq!(fs.read_file("/f").await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_mkdir_and_readdir() {
        let fs = MemFs::new();
        fs.mkdir("/dir", &MkdirOptions::default()).await.unwrap();
        fs.write_file("/dir/b.txt", "").await.unwrap();
        fs.write_file("/dir/a.txt", "").await.unwrap();
        fs.mkdir("/dir/sub", &MkdirOptions::default()).await.unwrap();
        fs.write_file("/dir/sub/deep.txt", "").await.unwrap();

        let names = fs.readdir("/dir").await.unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }

    #[tokio::test]
    async fn test_mkdir_without_parent_fails() {
        let fs = MemFs::new();
        let err = fs.mkdir("/a/b", &MkdirOptions::default()).await.unwrap_err();
        assert_eq!(err.code(), "ENOENT");
        fs.mkdir("/a/b", &MkdirOptions { recursive: true }).await.unwrap();
        assert!(fs.stat("/a/b").await.unwrap().is_directory);
    }

    #[tokio::test]
    async fn test_mkdir_existing() {
        let fs = MemFs::new();
        fs.mkdir("/d", &MkdirOptions::default()).await.unwrap();
        let err = fs.mkdir("/d", &MkdirOptions::default()).await.unwrap_err();
        assert_eq!(err.code(), "EEXIST");
        // Recursive mode tolerates existing directories.
        fs.mkdir("/d", &MkdirOptions { recursive: true }).await.unwrap();
    }

    #[tokio::test]
    async fn test_rmdir() {
        let fs = MemFs::new();
        fs.mkdir("/d", &MkdirOptions::default()).await.unwrap();
        fs.write_file("/d/f", "x").await.unwrap();
        let err = fs.rmdir("/d").await.unwrap_err();
        assert_eq!(err.code(), "ENOTEMPTY");
        fs.unlink("/d/f").await.unwrap();
        fs.rmdir("/d").await.unwrap();
        assert!(fs.access("/d").await.is_err());
    }

    #[tokio::test]
    async fn test_unlink_directory_fails() {
        let fs = MemFs::new();
        fs.mkdir("/d", &MkdirOptions::default()).await.unwrap();
        assert_eq!(fs.unlink("/d").await.unwrap_err().code(), "EISDIR");
    }

    #[tokio::test]
    async fn test_rename_moves_subtree() {
        let fs = MemFs::new();
        fs.write_file("/a/x", "1").await.unwrap();
        fs.write_file("/a/y/z", "2").await.unwrap();
        fs.rename("/a", "/b").await.unwrap();
        assert_eq!(fs.read_file("/b/x").await.unwrap(), "1");
        assert_eq!(fs.read_file("/b/y/z").await.unwrap(), "2");
        assert!(fs.access("/a").await.is_err());
    }

    #[tokio::test]
    async fn test_copy_file() {
        let fs = MemFs::new();
        fs.write_file("/src", "data").await.unwrap();
        fs.copy_file("/src", "/dst").await.unwrap();
        assert_eq!(fs.read_file("/dst").await.unwrap(), "data");
        assert_eq!(fs.read_file("/src").await.unwrap(), "data");
    }

    #[tokio::test]
    async fn test_resolve_path() {
        let fs = MemFs::new();
        assert_eq!(fs.resolve_path("/home/user", "f"), "/home/user/f");
        assert_eq!(fs.resolve_path("/home/user", "../x"), "/home/x");
        assert_eq!(fs.resolve_path("/home/user", "/abs"), "/abs");
    }

    #[tokio::test]
    async fn test_write_over_directory_fails() {
        let fs = MemFs::new();
        fs.mkdir("/d", &MkdirOptions::default()).await.unwrap();
        assert_eq!(fs.write_file("/d", "x").await.unwrap_err().code(), "EISDIR");
    }
}
