//! Size-capped reads and atomic writes of workspace files.

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::errors::ConflictError;

/// Join a workspace-relative path onto `root`, refusing anything that could
/// point outside it.
pub fn workspace_path(root: &Path, rel: &str) -> Result<PathBuf, ConflictError> {
    let rel_path = Path::new(rel);
    let escapes = rel.is_empty()
        || rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ConflictError::InvalidParams(format!(
            "path must be relative to the workspace root: '{}'",
            rel
        )));
    }
    Ok(root.join(rel_path))
}

/// Read a workspace file as UTF-8, refusing files above `max_bytes`.
pub async fn read_capped(root: &Path, rel: &str, max_bytes: u64) -> Result<String, ConflictError> {
    let full = workspace_path(root, rel)?;
    let meta = tokio::fs::metadata(&full)
        .await
        .map_err(|_| ConflictError::FileNotFound(rel.to_string()))?;
    if !meta.is_file() {
        return Err(ConflictError::FileNotFound(rel.to_string()));
    }
    if meta.len() > max_bytes {
        return Err(ConflictError::FileTooLarge {
            path: rel.to_string(),
            size: meta.len(),
            limit: max_bytes,
        });
    }
    let bytes = tokio::fs::read(&full)
        .await
        .map_err(|_| ConflictError::FileNotFound(rel.to_string()))?;
    String::from_utf8(bytes).map_err(|_| ConflictError::BinaryFile(rel.to_string()))
}

/// Replace a file's content in one step.
///
/// The content goes to a temporary sibling that is renamed over the target,
/// so readers see either the old or the new file. Permissions are carried
/// over from the existing file. The write and fsync run on the blocking pool.
pub async fn write_atomic(path: PathBuf, content: String) -> Result<(), ConflictError> {
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &content))
        .await
        .map_err(|e| ConflictError::IoError(io::Error::new(io::ErrorKind::Other, e)))?
}

fn write_atomic_blocking(path: &Path, content: &str) -> Result<(), ConflictError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| ConflictError::IoError(e.error))?;
    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_path_rejects_escapes() {
        let root = Path::new("/repo");
        assert!(workspace_path(root, "src/lib.rs").is_ok());
        assert!(workspace_path(root, "./a.txt").is_ok());
        assert!(workspace_path(root, "../etc/passwd").is_err());
        assert!(workspace_path(root, "/etc/passwd").is_err());
        assert!(workspace_path(root, "").is_err());
    }

    #[tokio::test]
    async fn test_read_capped_enforces_limit() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "0123456789").unwrap();

        let err = read_capped(dir.path(), "big.txt", 5).await.unwrap_err();
        assert!(matches!(err, ConflictError::FileTooLarge { size: 10, limit: 5, .. }));

        let ok = read_capped(dir.path(), "big.txt", 10).await.unwrap();
        assert_eq!(ok, "0123456789");
    }

    #[tokio::test]
    async fn test_read_capped_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_capped(dir.path(), "nope.txt", 100).await.unwrap_err();
        assert!(matches!(err, ConflictError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_read_capped_rejects_non_utf8() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G', 0x00, 0xff]).unwrap();
        let err = read_capped(dir.path(), "logo.png", 100).await.unwrap_err();
        assert!(matches!(err, ConflictError::BinaryFile(ref p) if p == "logo.png"));
        assert_eq!(err.code(), "BINARY_FILE");
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "old\n").unwrap();

        write_atomic(path.clone(), "new\n".to_string()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");

        let err = write_atomic(dir.path().join("missing/b.txt"), "x".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ConflictError::IoError(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        write_atomic(path.clone(), "new".into()).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
