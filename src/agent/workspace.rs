use std::path::{Path, PathBuf};

use crate::errors::WorkspaceError;

pub const SCRIPT_PREFIX: &str = "script_";
pub const SCRIPT_EXTENSION: &str = "py";

/// A generated script that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedScript {
    pub path: PathBuf,
    pub file_name: String,
}

/// Directory where generated scripts accumulate.
///
/// Files are never cleaned up.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` to a freshly named script file, creating the directory
    /// (and parents) if missing.
    pub async fn persist(&self, content: &str) -> Result<PersistedScript, WorkspaceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| WorkspaceError::DirectoryCreateFailed {
                path: self.dir.clone(),
                source,
            })?;

        self.write_script(new_script_name(), content).await
    }

    /// Write `content` to `file_name` inside an existing workspace directory.
    async fn write_script(
        &self,
        file_name: String,
        content: &str,
    ) -> Result<PersistedScript, WorkspaceError> {
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, content.as_bytes())
            .await
            .map_err(|source| WorkspaceError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "script persisted");
        Ok(PersistedScript { path, file_name })
    }
}

/// `script_` + 8 random hex characters + `.py`.
pub fn new_script_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}.{}", SCRIPT_PREFIX, &id[..8], SCRIPT_EXTENSION)
}

/// Whether `name` has the shape produced by `new_script_name`.
pub fn is_script_name(name: &str) -> bool {
    let Some(stem) = name
        .strip_prefix(SCRIPT_PREFIX)
        .and_then(|rest| rest.strip_suffix(SCRIPT_EXTENSION))
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return false;
    };
    stem.len() == 8
        && stem
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_script_name_shape() {
        for _ in 0..50 {
            let name = new_script_name();
            assert!(is_script_name(&name), "bad name: {}", name);
        }
    }

    #[test]
    fn test_new_script_names_differ() {
        assert_ne!(new_script_name(), new_script_name());
    }

    #[test]
    fn test_is_script_name_rejects_other_shapes() {
        assert!(is_script_name("script_0123abcd.py"));
        assert!(!is_script_name("script_0123ABCD.py"));
        assert!(!is_script_name("script_0123abc.py"));
        assert!(!is_script_name("script_0123abcde.py"));
        assert!(!is_script_name("script_0123abcd.rs"));
        assert!(!is_script_name("run_0123abcd.py"));
        assert!(!is_script_name("script_0123abcdpy"));
    }

    #[tokio::test]
    async fn test_persist_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(tmp.path().join("nested").join("workspace"));

        let script = workspace.persist("print(\"hi\")\n").await.unwrap();

        assert!(is_script_name(&script.file_name));
        assert_eq!(script.path, workspace.dir().join(&script.file_name));
        let written = std::fs::read_to_string(&script.path).unwrap();
        assert_eq!(written, "print(\"hi\")\n");
    }

    #[tokio::test]
    async fn test_persist_writes_utf8() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(tmp.path());
        let content = "print(\"こんにちは、世界\")";
        let script = workspace.persist(content).await.unwrap();
        assert_eq!(std::fs::read_to_string(&script.path).unwrap(), content);
    }

    #[tokio::test]
    async fn test_persist_twice_makes_two_files() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(tmp.path());
        let a = workspace.persist("a = 1").await.unwrap();
        let b = workspace.persist("b = 2").await.unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_persist_fails_when_dir_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("workspace");
        std::fs::write(&blocker, "not a dir").unwrap();

        let err = Workspace::new(&blocker).persist("x = 1").await.unwrap_err();
        match err {
            WorkspaceError::DirectoryCreateFailed { path, .. } => assert_eq!(path, blocker),
            other => panic!("Expected DirectoryCreateFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_fails_when_target_is_a_directory() {
        let tmp = TempDir::new().unwrap();
        let workspace = Workspace::new(tmp.path());
        let taken = tmp.path().join("script_0123abcd.py");
        std::fs::create_dir(&taken).unwrap();

        let err = workspace
            .write_script("script_0123abcd.py".to_string(), "x = 1")
            .await
            .unwrap_err();
        match err {
            WorkspaceError::WriteFailed { path, .. } => assert_eq!(path, taken),
            other => panic!("Expected WriteFailed, got {:?}", other),
        }
        assert!(taken.is_dir());
    }
}
