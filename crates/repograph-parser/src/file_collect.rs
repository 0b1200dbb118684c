use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use repograph_core::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directories and artifacts that never contain first-party source.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/target/**",
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/vendor/**",
    "**/venv/**",
    "**/.venv/**",
    "**/__pycache__/**",
    "**/.pytest_cache/**",
    "**/coverage/**",
];

/// Extensions that are binary or otherwise never parseable.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "svg", "pdf", "zip", "tar", "gz", "bz2", "xz", "7z",
    "exe", "dll", "so", "dylib", "a", "o", "class", "jar", "pyc", "pyo", "wasm", "bin", "dat",
    "db", "sqlite", "woff", "woff2", "ttf", "eot", "mp3", "mp4", "avi", "mov", "lock",
];

#[derive(Debug, Clone)]
pub struct FileCollectionConfig {
    pub exclude_patterns: Vec<String>,
}

impl Default for FileCollectionConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: vec![],
        }
    }
}

/// Walks the repository tree and returns candidate source files with their
/// sizes. Hidden dotfiles, conventional ignore directories and binary
/// extensions are skipped here; language filtering happens at the caller.
pub fn collect_source_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    collect_source_files_with_config(dir, &FileCollectionConfig::default())
}

pub fn collect_source_files_with_config(
    dir: &Path,
    config: &FileCollectionConfig,
) -> Result<Vec<(PathBuf, u64)>> {
    let mut combined: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    combined.extend(config.exclude_patterns.clone());
    let exclude_set = build_globset(&combined);

    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .ignore(true)
        .build();

    let mut paths = Vec::new();
    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("walker error: {}", e);
                continue;
            }
        };

        let path = dent.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ref set) = exclude_set {
            if set.is_match(path) {
                continue;
            }
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if BINARY_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                continue;
            }
        }

        let size = dent.metadata().map(|m| m.len()).unwrap_or(0);
        paths.push((path.to_path_buf(), size));
    }

    debug!("collected {} candidate files from {:?}", paths.len(), dir);
    Ok(paths)
}

fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut any = false;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                any = true;
            }
            Err(e) => warn!("invalid exclude pattern {:?}: {}", pattern, e),
        }
    }
    if !any {
        return None;
    }
    builder.build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn skips_hidden_and_binary_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.py"), "def f(): pass\n").unwrap();
        fs::write(dir.path().join(".secret.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("logo.png"), [0u8, 1, 2]).unwrap();
        fs::create_dir_all(dir.path().join("__pycache__")).unwrap();
        fs::write(dir.path().join("__pycache__/main.pyc"), [0u8]).unwrap();

        let files = collect_source_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["main.py"]);
    }
}
