//! The notebook façade: load, refresh, select, execute.

use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use mlua::{FromLua, IntoLua, Lua, Table};

use runbook_format::{CellKind, RawNotebook};

use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::execute;
use crate::select::{self, Blacklist, TagQuery};
use crate::tags::{Heading, TagState, extract_tags};

/// Tag run automatically (non-strictly) by `restart` when auto-init is on.
pub const INIT_TAG: &str = "__init__";

/// Tag run best-effort when the notebook is dropped.
pub const TEARDOWN_TAG: &str = "__del__";

/// Tag excluded by the default blacklist.
pub const SKIP_TAG: &str = "__skip__";

/// Configuration for loading a notebook.
#[derive(Debug, Clone)]
pub struct NotebookOptions {
    /// Directory cells execute relative to; defaults to the notebook's
    /// parent directory.
    pub dir: Option<PathBuf>,

    /// Run the [`INIT_TAG`] tag on restart.
    pub auto_init: bool,

    /// Derive tags from markdown headings.
    pub markdown_tags: bool,

    /// Close an open block tag when a heading is reached.
    pub close_blocks_at_headings: bool,

    /// First-line comment marker introducing cell tags. Must start with
    /// `--` so marker lines stay Lua comments.
    pub tag_marker: String,

    /// Default blacklist applied to every run unless disabled per call.
    pub blacklist: HashSet<String>,

    /// Tags never blacklisted, even when a blacklist names them.
    pub always_include: HashSet<String>,
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            dir: None,
            auto_init: true,
            markdown_tags: true,
            close_blocks_at_headings: true,
            tag_marker: "--#".to_string(),
            blacklist: HashSet::from([SKIP_TAG.to_string()]),
            always_include: HashSet::new(),
        }
    }
}

/// A loaded notebook: an ordered list of compiled cells plus the shared
/// execution namespace they run against.
///
/// All `run_*` operations return `&mut Self` so calls can be chained; the
/// namespace persists across them until [`restart`](Notebook::restart).
#[derive(Debug)]
pub struct Notebook {
    path: PathBuf,
    dir: Option<PathBuf>,
    options: NotebookOptions,
    lua: Lua,
    ns: Table,
    cells: Vec<Cell>,
    exec_count: u32,
}

impl Notebook {
    /// Load a notebook with default options.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, NotebookOptions::default())
    }

    /// Load a notebook with a fresh interpreter and namespace.
    pub fn load_with(path: impl AsRef<Path>, options: NotebookOptions) -> Result<Self> {
        let lua = Lua::new();
        let ns = fresh_namespace(&lua)?;
        Self::load_shared(path, options, lua, ns)
    }

    /// Load a notebook into an existing interpreter and namespace table.
    ///
    /// This is how several notebooks share one namespace: pass the `lua`
    /// and `namespace` handles of an already loaded notebook.
    pub fn load_shared(
        path: impl AsRef<Path>,
        options: NotebookOptions,
        lua: Lua,
        ns: Table,
    ) -> Result<Self> {
        if !options.tag_marker.starts_with("--") {
            return Err(Error::Config(format!(
                "tag marker {:?} is not a Lua comment",
                options.tag_marker
            )));
        }

        let path = path.as_ref().to_path_buf();
        let dir = match &options.dir {
            Some(dir) => Some(dir.clone()),
            None => path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf),
        };

        let mut notebook = Self {
            path,
            dir,
            options,
            lua,
            ns,
            cells: Vec::new(),
            exec_count: 0,
        };
        notebook.refresh()?;

        let ns = notebook.ns.clone();
        notebook.restart_with(ns)?;
        Ok(notebook)
    }

    /// Reload the notebook from disk and rebuild the compiled cells.
    ///
    /// The new cell list is built completely before being installed; on any
    /// read, parse, or compile failure the previously loaded cells stay
    /// visible. The namespace is untouched.
    pub fn refresh(&mut self) -> Result<&mut Self> {
        let raw = runbook_format::read_notebook(&self.path)?;
        let cells = self.build_cells(&raw)?;
        tracing::debug!(
            "refreshed {} ({} cells)",
            self.path.display(),
            cells.len()
        );
        self.cells = cells;
        Ok(self)
    }

    /// Reset the namespace to a fresh empty mapping.
    ///
    /// Every compiled cell is re-bound to the new namespace, the execution
    /// counter restarts, and the [`INIT_TAG`] tag runs non-strictly when
    /// auto-init is on.
    pub fn restart(&mut self) -> Result<&mut Self> {
        let ns = fresh_namespace(&self.lua)?;
        self.restart_with(ns)
    }

    /// Reset the namespace to a caller-supplied table.
    ///
    /// The table must belong to this notebook's interpreter.
    pub fn restart_with(&mut self, ns: Table) -> Result<&mut Self> {
        for cell in &self.cells {
            cell.function().set_environment(ns.clone())?;
        }
        self.ns = ns;
        self.exec_count = 0;

        if self.options.auto_init {
            self.run_tag(INIT_TAG, false, Blacklist::Default)?;
        }
        Ok(self)
    }

    /// Run every cell, minus blacklist exclusions, in document order.
    pub fn run_all(&mut self, blacklist: Blacklist) -> Result<&mut Self> {
        let selection: Vec<usize> = (0..self.cells.len()).collect();
        self.run_selection(selection, &blacklist)
    }

    /// Run every cell matching the tag query.
    ///
    /// A query of several tags matches cells carrying all of them. With
    /// `strict`, a query matching nothing is a [`Error::TagNotFound`];
    /// otherwise it runs nothing.
    pub fn run_tag(
        &mut self,
        tag: impl Into<TagQuery>,
        strict: bool,
        blacklist: Blacklist,
    ) -> Result<&mut Self> {
        let query = tag.into();
        let selection = select::by_tag(&self.cells, &query);
        if selection.is_empty() && strict {
            return Err(Error::TagNotFound(query.to_string()));
        }
        self.run_selection(selection, &blacklist)
    }

    /// Run every cell before the first match of the tag query.
    ///
    /// `include` runs the matching cell as well.
    pub fn run_before(
        &mut self,
        tag: impl Into<TagQuery>,
        include: bool,
        strict: bool,
        blacklist: Blacklist,
    ) -> Result<&mut Self> {
        let query = tag.into();
        match select::before(&self.cells, &query, include) {
            Some(range) => self.run_selection(range.collect(), &blacklist),
            None if strict => Err(Error::TagNotFound(query.to_string())),
            None => Ok(self),
        }
    }

    /// Run every cell after the last match of the tag query.
    ///
    /// `include` runs the matching cell as well.
    pub fn run_after(
        &mut self,
        tag: impl Into<TagQuery>,
        include: bool,
        strict: bool,
        blacklist: Blacklist,
    ) -> Result<&mut Self> {
        let query = tag.into();
        match select::after(&self.cells, &query, include) {
            Some(range) => self.run_selection(range.collect(), &blacklist),
            None if strict => Err(Error::TagNotFound(query.to_string())),
            None => Ok(self),
        }
    }

    /// Read one variable from the namespace.
    pub fn var<T: FromLua>(&self, name: &str) -> Result<T> {
        Ok(self.ns.get(name)?)
    }

    /// Write one variable into the namespace.
    pub fn set_var(&mut self, name: &str, value: impl IntoLua) -> Result<&mut Self> {
        self.ns.set(name, value)?;
        Ok(self)
    }

    /// Read several variables from the namespace at once.
    pub fn vars(&self, names: &[&str]) -> Result<Vec<mlua::Value>> {
        names.iter().map(|name| Ok(self.ns.get(*name)?)).collect()
    }

    /// Write several variables into the namespace.
    pub fn set_vars<K, V>(&mut self, vars: impl IntoIterator<Item = (K, V)>) -> Result<&mut Self>
    where
        K: IntoLua,
        V: IntoLua,
    {
        for (name, value) in vars {
            self.ns.set(name, value)?;
        }
        Ok(self)
    }

    /// Heading hierarchy with cell counts.
    ///
    /// Consecutive cells sharing a heading path are grouped; each group
    /// prints its innermost heading followed by the cell count.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let mut current: Option<&[Heading]> = None;
        let mut count = 0usize;

        for cell in &self.cells {
            if current != Some(cell.heading_path()) {
                flush_group(&mut out, current, count);
                current = Some(cell.heading_path());
                count = 0;
                if let Some(heading) = cell.heading_path().last() {
                    let indent = "  ".repeat(heading.level.saturating_sub(1) as usize);
                    let _ = writeln!(out, "{indent}{}", heading.qualified());
                }
            }
            count += 1;
        }
        flush_group(&mut out, current, count);
        out
    }

    /// The notebook file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory cells execute relative to, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// The compiled cells, in document order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cells executed since the last restart.
    pub fn exec_count(&self) -> u32 {
        self.exec_count
    }

    /// The shared execution namespace.
    pub fn namespace(&self) -> &Table {
        &self.ns
    }

    /// The interpreter handle.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    fn build_cells(&self, raw: &RawNotebook) -> Result<Vec<Cell>> {
        let mut state = TagState::new(self.options.close_blocks_at_headings);
        let mut cells = Vec::new();

        for cell in &raw.cells {
            match cell.cell_type {
                CellKind::Markdown if self.options.markdown_tags => {
                    state.observe_markdown(&cell.source.text());
                }
                CellKind::Code => {
                    let source = cell.source.text();
                    if source.is_empty() {
                        continue;
                    }
                    let tags = extract_tags(
                        &mut state,
                        &cell.metadata.tags,
                        &source,
                        &self.options.tag_marker,
                    );
                    cells.push(Cell::compile(
                        &self.lua,
                        &self.ns,
                        source,
                        cells.len() + 1,
                        tags,
                        state.heading_path().to_vec(),
                    )?);
                }
                _ => {}
            }
        }
        Ok(cells)
    }

    fn run_selection(&mut self, selection: Vec<usize>, blacklist: &Blacklist) -> Result<&mut Self> {
        let effective = select::effective_blacklist(
            &self.options.blacklist,
            &self.options.always_include,
            blacklist,
        );
        let selection = select::apply_blacklist(&self.cells, selection, &effective);
        execute::run_cells(
            &self.cells,
            &selection,
            self.dir.as_deref(),
            &mut self.exec_count,
        )?;
        Ok(self)
    }
}

impl fmt::Display for Notebook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Notebook({}): {} cells, exec count {}",
            self.path.display(),
            self.cells.len(),
            self.exec_count
        )
    }
}

impl Drop for Notebook {
    fn drop(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        // Teardown is fire-and-forget; there is nowhere to propagate from
        // a destructor, but a failure must not vanish silently.
        if let Err(err) = self.run_tag(TEARDOWN_TAG, false, Blacklist::Default) {
            tracing::warn!("teardown run failed: {err}");
        }
    }
}

/// A fresh namespace table with read access to the Lua standard library.
///
/// Writes go to the table; reads of missing names fall back to the
/// interpreter globals through the metatable.
pub fn fresh_namespace(lua: &Lua) -> Result<Table> {
    let ns = lua.create_table()?;
    let meta = lua.create_table()?;
    meta.set("__index", lua.globals())?;
    ns.set_metatable(Some(meta));
    Ok(ns)
}

fn flush_group(out: &mut String, path: Option<&[Heading]>, count: usize) {
    let Some(path) = path else {
        return;
    };
    if count == 0 {
        return;
    }
    let indent = "  ".repeat(path.last().map(|h| h.level as usize).unwrap_or(0));
    let _ = writeln!(out, "{indent}({count} cells)");
}
