//! The deletion plan and the `prep` entry point.

use crate::rules::PruneOptions;
use crate::walker;

use anyhow::{ensure, Result};
use std::path::{Path, PathBuf};

/// Aggregated, read-only result of a scan describing what would be deleted.
#[derive(Debug)]
pub struct Plan {
    /// The dependency directory that was scanned
    pub module_path: PathBuf,
    /// Matched files, sorted lexicographically
    pub files: Vec<PathBuf>,
    /// Directories left empty once the files are removed, deepest first
    pub dirs: Vec<PathBuf>,
    pub file_count: usize,
    pub dir_count: usize,
    /// Summed byte size of all matched files
    pub size: u64,
    /// Whether a custom rule file at the dependency root replaced the defaults
    pub using_custom_prune: bool,
    /// Path of that rule file, when present
    pub prune_path: Option<PathBuf>,
}

impl Plan {
    pub(crate) fn new(
        module_path: PathBuf,
        files: Vec<PathBuf>,
        dirs: Vec<PathBuf>,
        size: u64,
        using_custom_prune: bool,
        prune_path: Option<PathBuf>,
    ) -> Self {
        Plan {
            module_path,
            file_count: files.len(),
            dir_count: dirs.len(),
            files,
            dirs,
            size,
            using_custom_prune,
            prune_path,
        }
    }
}

/// Resolve the effective dependency directory and build the deletion plan.
/// `options.directory`, when non-empty, overrides the default of
/// `<cwd>/node_modules`; a relative override is taken relative to `cwd`.
/// Fails when the resolved directory does not exist.
pub fn prep(cwd: &Path, options: &PruneOptions) -> Result<Plan> {
    let module_path = if options.directory.is_empty() {
        cwd.join("node_modules")
    } else {
        let dir = PathBuf::from(&options.directory);
        if dir.is_absolute() {
            dir
        } else {
            cwd.join(dir)
        }
    };

    ensure!(
        module_path.is_dir(),
        "No dependency directory at {}",
        module_path.display()
    );

    walker::walk(&module_path, options)
}
