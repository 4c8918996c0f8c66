//! Summary and tag-listing commands.

use runbook_core::{Notebook, NotebookOptions};

use crate::colors;

/// Print the heading structure with cell counts.
pub fn summary(path: &str) -> anyhow::Result<()> {
    let notebook = load_readonly(path)?;
    println!(
        "{}Notebook{} {}",
        colors::BOLD,
        colors::RESET,
        notebook.path().display()
    );
    print!("{}", notebook.summary());
    println!("{} cells total", notebook.cells().len());
    Ok(())
}

/// List every cell with its tags.
pub fn tags(path: &str) -> anyhow::Result<()> {
    let notebook = load_readonly(path)?;
    for cell in notebook.cells() {
        let tags: Vec<String> = cell.tags().iter().map(|t| t.to_string()).collect();
        println!(
            "{}{}{}  {}",
            colors::CYAN,
            cell.label(),
            colors::RESET,
            tags.join(", ")
        );
    }
    Ok(())
}

/// Load without running `__init__`; inspection should not execute cells.
fn load_readonly(path: &str) -> anyhow::Result<Notebook> {
    let options = NotebookOptions {
        auto_init: false,
        ..NotebookOptions::default()
    };
    Ok(Notebook::load_with(path, options)?)
}
