use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dialoguer::Confirm;
use humansize::{format_size, DECIMAL};
use std::env;

use modprune::{prep, remove_dirs, remove_files, PruneOptions};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Prune unnecessary files (tests, docs, CI config) from node_modules",
    long_about = None
)]
struct Args {
    /// Skip confirmation and run
    #[arg(long, short)]
    force: bool,

    /// Prune license files too
    #[arg(long, short = 'l')]
    prune_license: bool,

    /// Directory to prune (default: node_modules under the current directory)
    #[arg(long = "dir", short = 'd', default_value = "")]
    directory: String,

    /// List each matched file during the scan
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let options = PruneOptions {
        prune_license: args.prune_license,
        directory: args.directory,
        verbose: args.verbose,
    };

    println!("Scanning node_modules…\n");

    let cwd = env::current_dir().context("Failed to determine current directory")?;
    let plan = prep(&cwd, &options)?;

    println!("Pruning {}", plan.module_path.display());
    if plan.using_custom_prune {
        if let Some(prune_path) = &plan.prune_path {
            println!("Using custom prune: {}", prune_path.display());
        }
    }

    let summary = format!(
        "Delete {} files ({}) and {} folders",
        plan.file_count,
        format_size(plan.size, DECIMAL),
        plan.dir_count
    );

    let do_delete = if args.force {
        println!("{summary}");
        true
    } else {
        Confirm::new()
            .with_prompt(&summary)
            .default(false)
            .interact()
            .context("Failed to read confirmation")?
    };

    if !do_delete {
        println!("Ok, nothing has changed");
        return Ok(());
    }

    println!("\nRemoving files…");
    let file_errors = remove_files(&plan.files);
    println!("{} Files removed\n", "✔".green());

    println!("Removing directories…");
    let dir_errors = remove_dirs(&plan.dirs);
    println!("{} Directories removed", "✔".green());

    let errors = file_errors + dir_errors;
    if errors > 0 {
        eprintln!("{}", format!("{errors} paths could not be removed").red());
    }

    Ok(())
}
