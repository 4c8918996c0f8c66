//! Core engine for runbook notebooks.
//!
//! This crate provides:
//! - Tag derivation (cell metadata, markdown headings, in-source markers)
//! - One-pass notebook loading into compiled Lua cells
//! - Document-order cell selection with blacklist filtering
//! - Directory-relative execution against a persistent namespace
//!
//! The notebook file format lives in `runbook-format`; the interpreter is
//! `mlua`, re-exported here so callers can build namespace values.

pub mod cell;
pub mod error;
mod execute;
pub mod notebook;
pub mod select;
pub mod tags;

pub use cell::Cell;
pub use error::{Error, Result};
pub use notebook::{
    INIT_TAG, Notebook, NotebookOptions, SKIP_TAG, TEARDOWN_TAG, fresh_namespace,
};
pub use select::{Blacklist, TagQuery};
pub use tags::{Heading, Tag, TagState};

pub use mlua;
