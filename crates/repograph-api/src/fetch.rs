use repograph_core::{RepoGraphError, Result};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Clones `url` (optionally a specific branch) under `dest_root` and
/// returns the checkout path. Each fetch gets its own directory so
/// concurrent jobs never collide.
pub fn fetch_repository(url: &str, branch: Option<&str>, dest_root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dest_root)?;

    let repo_name = url
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("repo");
    let dest = dest_root.join(format!("{}-{}", repo_name, Uuid::new_v4().simple()));

    info!("cloning {} (branch: {:?}) into {}", url, branch, dest.display());

    let mut builder = git2::build::RepoBuilder::new();
    if let Some(branch) = branch {
        builder.branch(branch);
    }
    builder
        .clone(url, &dest)
        .map_err(|e| RepoGraphError::FetchFailed(format!("{}: {}", url, e.message())))?;

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_remote_is_a_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = fetch_repository(
            "file:///nonexistent/definitely-not-a-repo",
            None,
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, RepoGraphError::FetchFailed(_)));
    }
}
