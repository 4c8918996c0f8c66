//! Run command implementation for the runbook CLI.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;

use runbook_core::{Blacklist, Notebook, NotebookOptions};

use crate::colors;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the notebook (.ipynb file)
    pub notebook: String,

    /// Run only cells carrying every one of these tags
    #[arg(long)]
    pub tag: Vec<String>,

    /// Run cells before the first match of this tag
    #[arg(long, conflicts_with = "tag")]
    pub before: Option<String>,

    /// Run cells after the last match of this tag
    #[arg(long, conflicts_with_all = ["tag", "before"])]
    pub after: Option<String>,

    /// Also run the boundary cell of --before/--after
    #[arg(long)]
    pub include: bool,

    /// Select nothing instead of failing when a tag matches no cells
    #[arg(long)]
    pub no_strict: bool,

    /// Additional tags to exclude from this run
    #[arg(long)]
    pub blacklist: Vec<String>,

    /// Tags to run even when blacklisted
    #[arg(long)]
    pub allow: Vec<String>,

    /// Disable all blacklist filtering, including the default
    #[arg(long, conflicts_with = "blacklist")]
    pub no_blacklist: bool,

    /// Directory to execute cells in (default: the notebook's directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Skip the automatic __init__ run
    #[arg(long)]
    pub no_init: bool,

    /// Ignore markdown headings when deriving tags
    #[arg(long)]
    pub no_md_tags: bool,
}

/// Load the notebook and execute the requested selection.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    let options = NotebookOptions {
        dir: args.dir.clone(),
        auto_init: !args.no_init,
        markdown_tags: !args.no_md_tags,
        always_include: args.allow.iter().cloned().collect(),
        ..NotebookOptions::default()
    };

    let mut notebook = Notebook::load_with(&args.notebook, options)?;

    if notebook.cells().is_empty() {
        println!(
            "{}No code cells found in notebook.{}",
            colors::YELLOW,
            colors::RESET
        );
        return Ok(());
    }

    let blacklist = if args.no_blacklist {
        Blacklist::Disabled
    } else if args.blacklist.is_empty() {
        Blacklist::Default
    } else {
        Blacklist::Extend(args.blacklist.clone())
    };
    let strict = !args.no_strict;

    if let Some(before) = &args.before {
        notebook.run_before(before.as_str(), args.include, strict, blacklist)?;
    } else if let Some(after) = &args.after {
        notebook.run_after(after.as_str(), args.include, strict, blacklist)?;
    } else if !args.tag.is_empty() {
        notebook.run_tag(args.tag.clone(), strict, blacklist)?;
    } else {
        notebook.run_all(blacklist)?;
    }

    println!(
        "{}Completed{} {} cells in {:.2}s",
        colors::GREEN,
        colors::RESET,
        notebook.exec_count(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
