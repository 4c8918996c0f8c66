//! Compiled notebook cells.
//!
//! A [`Cell`] pairs a code cell's original source with its compiled form:
//! an `mlua::Function` whose environment is the shared notebook namespace.
//! Compilation happens once per refresh; execution never re-parses.

use mlua::{Function, Lua, Table};

use crate::error::{Error, Result};
use crate::tags::{Heading, Tag};

/// One compiled, taggable, executable cell.
///
/// Created during a refresh pass and immutable afterwards. The whole list
/// is discarded and rebuilt on the next refresh.
#[derive(Debug, Clone)]
pub struct Cell {
    source: String,
    function: Function,
    index: usize,
    tags: Vec<Tag>,
    heading_path: Vec<Heading>,
}

impl Cell {
    /// Compile one code cell against the shared namespace.
    ///
    /// `index` is the 1-based position among the notebook's code cells; it
    /// names the chunk so interpreter tracebacks point back to the cell.
    pub(crate) fn compile(
        lua: &Lua,
        ns: &Table,
        source: String,
        index: usize,
        tags: Vec<Tag>,
        heading_path: Vec<Heading>,
    ) -> Result<Self> {
        let label = cell_label(index);
        let expanded = expand_shell_lines(&source);
        let function = lua
            .load(expanded)
            .set_name(label.as_str())
            .set_environment(ns.clone())
            .into_function()
            .map_err(|e| Error::Compile {
                cell: label,
                source: e,
            })?;

        Ok(Self {
            source,
            function,
            index,
            tags,
            heading_path,
        })
    }

    /// The original cell text, kept verbatim for diagnostics and display.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 1-based position among the notebook's code cells.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Diagnostic label, e.g. `cell #7`.
    pub fn label(&self) -> String {
        cell_label(self.index)
    }

    /// Tags attached to this cell, in derivation order. Never empty.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// The heading chain that was open when this cell was encountered.
    pub fn heading_path(&self) -> &[Heading] {
        &self.heading_path
    }

    /// Whether this cell carries the named tag.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.matches(name))
    }

    pub(crate) fn function(&self) -> &Function {
        &self.function
    }
}

fn cell_label(index: usize) -> String {
    format!("cell #{index}")
}

/// Expand shell-shorthand lines before compilation.
///
/// A line whose first non-blank character is `!` runs the remainder through
/// `os.execute`. The original source is untouched; only the compiled form
/// sees the expansion.
fn expand_shell_lines(source: &str) -> String {
    if !source.lines().any(|l| l.trim_start().starts_with('!')) {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len() + 32);
    for (i, line) in source.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let trimmed = line.trim_start();
        if let Some(command) = trimmed.strip_prefix('!') {
            out.push_str(&line[..line.len() - trimmed.len()]);
            out.push_str("os.execute(\"");
            out.push_str(&escape_lua(command.trim()));
            out.push_str("\")");
        } else {
            out.push_str(line);
        }
    }
    out
}

fn escape_lua(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
