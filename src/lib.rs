//! modprune - prune unnecessary files from an installed dependency tree.
//!
//! Scans a `node_modules` directory, matches files against prune rules
//! (default heuristics plus optional custom `prune.toml` rule files), and
//! aggregates everything into a single deletion plan: matched files, the
//! directories they leave empty, and a total byte count. Deletion itself is
//! a thin collaborator over that plan and is final; there is no rollback.
//!
//! Rules are heuristics for files that play no part in runtime behavior;
//! no verification beyond the rule set is performed.

pub mod plan;
pub mod remove;
pub mod rules;
pub mod walker;

// Re-export commonly used items
pub use plan::{prep, Plan};
pub use remove::{remove_dirs, remove_files};
pub use rules::{is_prunable, PruneOptions, PruneRule, RuleKind, RuleSet, CUSTOM_RULE_FILE};
pub use walker::walk;
