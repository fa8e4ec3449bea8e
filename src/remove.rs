//! Batched deletion of a plan's files and directories.
//!
//! Files go first, as one parallel batch. Directories are grouped by depth
//! and removed deepest group first, so every directory is empty by the time
//! its own removal runs. Errors are logged and counted, never retried; there
//! is no rollback.

use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Remove all files in parallel. Returns the number of failed removals.
pub fn remove_files(files: &[PathBuf]) -> usize {
    files
        .par_iter()
        .map(|path| match fs::remove_file(path) {
            Ok(()) => 0,
            Err(err) if err.kind() == ErrorKind::NotFound => 0,
            Err(err) => {
                eprintln!("Error removing {}: {err}", path.display());
                1
            }
        })
        .sum()
}

/// Remove emptied directories, deepest depth group first, each group in
/// parallel. Returns the number of failed removals. A directory that turned
/// out non-empty (e.g. because one of its files failed to delete) is logged
/// and left in place.
pub fn remove_dirs(dirs: &[PathBuf]) -> usize {
    let mut by_depth: Vec<(usize, &PathBuf)> = dirs
        .iter()
        .map(|d| (d.components().count(), d))
        .collect();
    by_depth.sort_by(|a, b| b.0.cmp(&a.0));

    let mut errors = 0;
    for group in by_depth.chunk_by(|a, b| a.0 == b.0) {
        errors += group
            .par_iter()
            .map(|(_, path)| match fs::remove_dir(path) {
                Ok(()) => 0,
                Err(err) if err.kind() == ErrorKind::NotFound => 0,
                Err(err) => {
                    eprintln!("Error removing {}: {err}", path.display());
                    1
                }
            })
            .sum::<usize>();
    }
    errors
}
