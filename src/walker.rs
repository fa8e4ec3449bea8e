//! Dependency tree traversal and plan assembly.
//!
//! The walker discovers package directories at the dependency root on a
//! producer thread, streams them over a bounded channel, and scans each
//! package in parallel. Every package scan recurses with `read_dir`, carries
//! the active rule scope, sums matched file sizes, and works out bottom-up
//! which directories will be left empty once matched files are removed.

use crate::plan::Plan;
use crate::rules::{self, PruneOptions, RuleSet, CUSTOM_RULE_FILE};

use anyhow::Result;
use crossbeam_channel::{bounded, Sender};
use humansize::{format_size, DECIMAL};
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Partial result from scanning one top-level package (or scope group)
#[derive(Debug, Default)]
struct PackageScan {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
    size: u64,
}

/// Walk a dependency directory and assemble the deletion plan.
pub fn walk(root: &Path, opts: &PruneOptions) -> Result<Plan> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

    // A custom rule file at the dependency root replaces the defaults for the
    // whole tree
    let custom_path = root.join(CUSTOM_RULE_FILE);
    let mut using_custom_prune = false;
    let mut prune_path = None;
    let base_rules = if custom_path.is_file() {
        match RuleSet::load_custom(&custom_path) {
            Ok(rules) => {
                using_custom_prune = true;
                prune_path = Some(custom_path);
                rules
            }
            Err(err) => {
                eprintln!("Warning: {err:#}, falling back to default rules");
                RuleSet::default_rules()?
            }
        }
    } else {
        RuleSet::default_rules()?
    };

    let progress = Arc::new(ProgressBar::new_spinner());
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} packages scanned")
            .expect("static template"),
    );
    progress.enable_steady_tick(std::time::Duration::from_millis(100));

    // Stream top-level entries (package dirs and @scope groups) to the
    // scanning pool
    let (sender, receiver) = bounded::<PathBuf>(100);
    let root_clone = root.clone();
    let producer_handle = thread::spawn(move || discover_packages(&root_clone, sender));

    let progress_clone = Arc::clone(&progress);
    let results: Vec<PackageScan> = receiver
        .into_iter()
        .par_bridge()
        .map(|package_dir| {
            let scan = scan_unit(&package_dir, &base_rules, opts);
            progress_clone.inc(1);
            scan
        })
        .collect();

    producer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Package discovery thread panicked"))??;

    progress.finish_and_clear();

    // Merge partial results into one plan with a deterministic order
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    let mut size = 0u64;
    for result in results {
        files.extend(result.files);
        dirs.extend(result.dirs);
        size += result.size;
    }
    files.sort();
    // Deepest first, so directories can be removed before their parents
    dirs.sort_by(|a, b| {
        let depth = |p: &PathBuf| p.components().count();
        depth(b).cmp(&depth(a)).then_with(|| a.cmp(b))
    });

    Ok(Plan::new(root, files, dirs, size, using_custom_prune, prune_path))
}

/// Enumerate the immediate children of the dependency root and send package
/// directories down the channel.
fn discover_packages(root: &Path, sender: Sender<PathBuf>) -> Result<()> {
    let walker = WalkBuilder::new(root)
        .max_depth(Some(1))
        .hidden(false)
        // The tree being pruned is an install artifact; ignore files inside it
        // have no say over what gets scanned
        .git_ignore(false)
        .ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build();

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("Warning: Failed to access entry during discovery: {err}");
                continue;
            }
        };
        if entry.path() == root {
            continue;
        }
        if entry.file_type().is_some_and(|ft| ft.is_dir())
            && sender.send(entry.into_path()).is_err()
        {
            // Receiver dropped, stop discovering
            break;
        }
    }

    Ok(())
}

/// Scan one top-level unit: either a package directory or an `@scope` group
/// whose children are packages.
fn scan_unit(dir: &Path, inherited: &RuleSet, opts: &PruneOptions) -> PackageScan {
    let mut out = PackageScan::default();
    let is_scope = dir
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('@'));
    if is_scope {
        scan_group(dir, inherited, opts, &mut out);
    } else {
        scan_package(dir, inherited, opts, &mut out);
    }
    out
}

/// Scan a directory whose children are packages (an `@scope` group or a
/// nested `node_modules`). Returns true when the whole group will be empty
/// after pruning.
fn scan_group(dir: &Path, inherited: &RuleSet, opts: &PruneOptions, out: &mut PackageScan) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("Warning: Failed to read {}: {err}", dir.display());
            return false;
        }
    };

    let mut empty = true;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("Warning: Failed to read entry in {}: {err}", dir.display());
                empty = false;
                continue;
            }
        };
        let path = entry.path();
        let metadata = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(err) => {
                eprintln!("Warning: Could not stat {}: {err}", path.display());
                empty = false;
                continue;
            }
        };

        // Symlinks (e.g. under .bin) are never followed or pruned
        if metadata.is_symlink() || !metadata.is_dir() {
            empty = false;
            continue;
        }

        let is_scope = entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with('@'));
        let child_empty = if is_scope {
            // scan_group records the scope dir itself when it ends up empty
            scan_group(&path, inherited, opts, out)
        } else {
            scan_package(&path, inherited, opts, out)
        };
        empty &= child_empty;
    }

    if empty {
        out.dirs.push(dir.to_path_buf());
    }
    empty
}

/// Scan a single package directory. A `prune.toml` at the package root opens
/// a new rule scope for this subtree only. Returns true when the package
/// directory will be empty after pruning (in which case it is added to the
/// plan's directory list).
fn scan_package(
    package_dir: &Path,
    inherited: &RuleSet,
    opts: &PruneOptions,
    out: &mut PackageScan,
) -> bool {
    let rules = load_scope(package_dir, inherited);
    let empty = scan_dir(package_dir, Path::new(""), &rules, opts, out);
    if empty {
        out.dirs.push(package_dir.to_path_buf());
    }
    empty
}

/// Load the rule scope for a directory: its own prune.toml when present and
/// readable, otherwise the inherited set.
fn load_scope(dir: &Path, inherited: &RuleSet) -> RuleSet {
    let custom_path = dir.join(CUSTOM_RULE_FILE);
    if !custom_path.is_file() {
        return inherited.clone();
    }
    match RuleSet::load_custom(&custom_path) {
        Ok(rules) => rules,
        Err(err) => {
            eprintln!("Warning: {err:#}, keeping inherited rules");
            inherited.clone()
        }
    }
}

/// Recursively scan a directory within one rule scope. `rel` is the path
/// relative to the scope root, used for component matching. Returns true when
/// the directory will be empty once matched files are removed; such
/// directories are added to the plan. Unreadable entries are warned about and
/// skipped, never fatal.
fn scan_dir(
    abs: &Path,
    rel: &Path,
    rules: &RuleSet,
    opts: &PruneOptions,
    out: &mut PackageScan,
) -> bool {
    let entries = match fs::read_dir(abs) {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("Warning: Failed to read {}: {err}", abs.display());
            return false;
        }
    };

    let mut empty = true;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("Warning: Failed to read entry in {}: {err}", abs.display());
                empty = false;
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name();
        let metadata = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(err) => {
                eprintln!("Warning: Could not stat {}: {err}", path.display());
                empty = false;
                continue;
            }
        };

        // Never follow, count, or delete symlinks
        if metadata.is_symlink() {
            empty = false;
            continue;
        }

        if metadata.is_dir() {
            // A nested install tree: its children are packages with their own
            // rule scopes, and the enclosing package's name must not leak into
            // component matching
            if name == "node_modules" {
                if !scan_group(&path, rules, opts, out) {
                    empty = false;
                }
                continue;
            }

            let sub_empty = if path.join(CUSTOM_RULE_FILE).is_file() {
                let scoped = load_scope(&path, rules);
                scan_dir(&path, Path::new(""), &scoped, opts, out)
            } else {
                scan_dir(&path, &rel.join(&name), rules, opts, out)
            };
            if sub_empty {
                out.dirs.push(path);
            } else {
                empty = false;
            }
        } else if rules::is_prunable(&rel.join(&name), rules, opts) {
            let size = metadata.len();
            if opts.verbose {
                println!("  {} ({})", path.display(), format_size(size, DECIMAL));
            }
            out.size += size;
            out.files.push(path);
        } else {
            empty = false;
        }
    }

    empty
}
