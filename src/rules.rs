//! Prune rule loading and matching.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// File name of a custom prune-rule file. One at the dependency root replaces
/// the defaults for the whole tree; one inside a package directory replaces
/// the active set for that package subtree only.
pub const CUSTOM_RULE_FILE: &str = "prune.toml";

/// Where a rule set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Default,
    Custom,
}

/// What a pattern applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Directory-name pattern: every file under a matching path component is prunable
    Dir,
    /// File-name pattern: exact name or simple glob matched against the file name
    File,
}

/// A single prune rule
#[derive(Debug, Clone)]
pub struct PruneRule {
    pub pattern: String,
    pub kind: RuleKind,
}

/// The set of prune rules active for some subtree of the dependency tree
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<PruneRule>,
    pub source: RuleSource,
}

/// On-disk shape of a rule file (both the embedded defaults and custom
/// prune.toml files use it)
#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    dirs: Vec<String>,
    #[serde(default)]
    files: Vec<String>,
}

// Embed the default rules directly in the binary at compile time
const DEFAULT_RULES_TOML: &str = include_str!("../rules.toml");

impl RuleSet {
    fn from_file(file: RuleFile, source: RuleSource) -> Self {
        let mut rules = Vec::with_capacity(file.dirs.len() + file.files.len());
        for pattern in file.dirs {
            rules.push(PruneRule {
                pattern,
                kind: RuleKind::Dir,
            });
        }
        for pattern in file.files {
            rules.push(PruneRule {
                pattern,
                kind: RuleKind::File,
            });
        }
        RuleSet { rules, source }
    }

    /// Parse the embedded default rule set
    pub fn default_rules() -> Result<Self> {
        let file: RuleFile =
            toml::from_str(DEFAULT_RULES_TOML).context("Failed to parse embedded default rules")?;
        Ok(Self::from_file(file, RuleSource::Default))
    }

    /// Load a custom rule set from a prune.toml file
    pub fn load_custom(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read custom rule file {}", path.display()))?;
        let file: RuleFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse custom rule file {}", path.display()))?;
        Ok(Self::from_file(file, RuleSource::Custom))
    }

    pub fn rules(&self) -> &[PruneRule] {
        &self.rules
    }

    /// Does a file rule name this file exactly? An exact entry wins over the
    /// license guard, so a custom rule file can force license removal.
    fn names_file_exactly(&self, file_name: &str) -> bool {
        self.rules
            .iter()
            .any(|r| r.kind == RuleKind::File && r.pattern == file_name)
    }

    fn file_matches(&self, file_name: &str) -> bool {
        self.rules
            .iter()
            .filter(|r| r.kind == RuleKind::File)
            .any(|r| matches_component(file_name, &r.pattern))
    }

    fn dir_matches(&self, component: &str) -> bool {
        self.rules
            .iter()
            .filter(|r| r.kind == RuleKind::Dir)
            .any(|r| matches_component(component, &r.pattern))
    }
}

/// Check whether a file name is a license file. Matched case-insensitively so
/// `LICENSE`, `license.md` and `Licence-MIT` are all recognized.
pub fn is_license_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    matches!(lower.as_str(), "license" | "licence" | "copying" | "copyright")
        || lower.starts_with("license.")
        || lower.starts_with("licence.")
        || lower.starts_with("license-")
        || lower.starts_with("licence-")
}

/// Options controlling what is considered prunable
#[derive(Debug, Clone, Default)]
pub struct PruneOptions {
    /// Prune license files too
    pub prune_license: bool,
    /// Target directory override; empty means `<cwd>/node_modules`
    pub directory: String,
    /// Print each matched file during the scan
    pub verbose: bool,
}

/// Decide whether a file is prunable. `rel_path` is the entry's path relative
/// to the root of the active rule scope (normally the package directory), so a
/// package's own name never takes part in directory matching. Pure function
/// over the rule set and path.
pub fn is_prunable(rel_path: &Path, rules: &RuleSet, opts: &PruneOptions) -> bool {
    let file_name = match rel_path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };

    // The rule file itself is never pruned
    if file_name == CUSTOM_RULE_FILE {
        return false;
    }

    if rules.names_file_exactly(file_name) {
        return true;
    }

    // License files are a separate classification: only prunable on request,
    // even though globs like *.md would otherwise catch LICENSE.md
    if is_license_name(file_name) {
        return opts.prune_license;
    }

    if rules.file_matches(file_name) {
        return true;
    }

    // Component-based matching: a file under any directory whose name matches
    // a dir rule is prunable (e.g. everything below test/)
    rel_path.components().any(|c| {
        if let std::path::Component::Normal(os_str) = c {
            os_str.to_str().is_some_and(|s| rules.dir_matches(s))
        } else {
            false
        }
    })
}

/// Match a single path component against a pattern with simple wildcards:
/// exact, `*suffix`, `prefix*`, or `a*b`.
fn matches_component(component: &str, pattern: &str) -> bool {
    if pattern == component {
        return true;
    }

    if !pattern.contains('*') {
        return false;
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return component.ends_with(suffix);
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return component.starts_with(prefix);
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 2 {
        return component.starts_with(parts[0]) && component.ends_with(parts[1]);
    }

    // More complex patterns would need a full glob matcher
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn defaults() -> RuleSet {
        RuleSet::default_rules().expect("embedded default rules should parse")
    }

    #[test]
    fn default_rules_parse() {
        let rules = defaults();
        assert_eq!(rules.source, RuleSource::Default);
        assert!(rules.rules().iter().any(|r| r.pattern == "test"));
        assert!(rules.rules().iter().any(|r| r.pattern == "*.md"));
    }

    #[test]
    fn matches_files_under_prunable_dirs() {
        let rules = defaults();
        let opts = PruneOptions::default();
        assert!(is_prunable(Path::new("test/a.test.js"), &rules, &opts));
        assert!(is_prunable(
            Path::new("test/fixtures/data.bin"),
            &rules,
            &opts
        ));
        assert!(is_prunable(Path::new("docs/api.html"), &rules, &opts));
        assert!(!is_prunable(Path::new("index.js"), &rules, &opts));
        assert!(!is_prunable(Path::new("lib/util.js"), &rules, &opts));
    }

    #[test]
    fn matches_file_name_globs() {
        let rules = defaults();
        let opts = PruneOptions::default();
        assert!(is_prunable(Path::new("README.md"), &rules, &opts));
        assert!(is_prunable(Path::new("lib/index.d.ts"), &rules, &opts));
        assert!(is_prunable(Path::new("dist/bundle.js.map"), &rules, &opts));
        assert!(!is_prunable(Path::new("lib/contest.js"), &rules, &opts));
    }

    #[test]
    fn does_not_match_dir_name_substrings() {
        let rules = defaults();
        let opts = PruneOptions::default();
        // "test" must match a whole component, not a fragment of one
        assert!(!is_prunable(Path::new("contest/entry.js"), &rules, &opts));
        assert!(!is_prunable(Path::new("protest.js"), &rules, &opts));
    }

    #[test]
    fn license_files_gated_by_option() {
        let rules = defaults();
        let off = PruneOptions::default();
        let on = PruneOptions {
            prune_license: true,
            ..Default::default()
        };
        for name in ["LICENSE", "LICENCE", "license.md", "LICENSE-MIT", "COPYING"] {
            assert!(!is_prunable(Path::new(name), &rules, &off), "{name}");
            assert!(is_prunable(Path::new(name), &rules, &on), "{name}");
        }
        // LICENSE.md is caught by the license guard before the *.md glob
        assert!(!is_prunable(Path::new("LICENSE.md"), &rules, &off));
    }

    #[test]
    fn exact_custom_entry_overrides_license_guard() {
        let rules = RuleSet::from_file(
            RuleFile {
                dirs: vec![],
                files: vec!["LICENSE".to_string()],
            },
            RuleSource::Custom,
        );
        let opts = PruneOptions::default();
        assert!(is_prunable(Path::new("LICENSE"), &rules, &opts));
        assert!(!is_prunable(Path::new("LICENCE"), &rules, &opts));
    }

    #[test]
    fn rule_file_itself_never_matches() {
        let rules = RuleSet::from_file(
            RuleFile {
                dirs: vec![],
                files: vec!["*.toml".to_string()],
            },
            RuleSource::Custom,
        );
        let opts = PruneOptions::default();
        assert!(!is_prunable(Path::new(CUSTOM_RULE_FILE), &rules, &opts));
        assert!(is_prunable(Path::new("other.toml"), &rules, &opts));
    }

    #[test]
    fn component_wildcards() {
        assert!(matches_component("yarn-error.log", "yarn-*"));
        assert!(matches_component("a.test.js", "*.test.js"));
        assert!(matches_component("Gulpfile.js", "Gulp*.js"));
        assert!(!matches_component("file.mts", "*.ts"));
        assert!(!matches_component("notes.txt", "*.md"));
    }
}
