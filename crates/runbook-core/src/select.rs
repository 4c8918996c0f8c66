//! Cell selection and blacklist filtering.
//!
//! Selection always preserves document order and considers each cell
//! exactly once. Tie-break rule for boundary lookups: [`before`] anchors at
//! the *first* matching cell (forward scan), [`after`] anchors at the
//! *last* matching cell (backward scan). The two scans are independent, so
//! a repeated tag may give them different boundary cells.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;

use crate::cell::Cell;

/// A tag lookup: one or more tag names, matched conjunctively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery(Vec<String>);

impl TagQuery {
    pub fn new(tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(tags.into_iter().map(Into::into).collect())
    }

    /// Whether a cell carries every tag in the query.
    pub fn is_match(&self, cell: &Cell) -> bool {
        self.0.iter().all(|tag| cell.has_tag(tag))
    }

    /// The queried tag names.
    pub fn tags(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for TagQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("+"))
    }
}

impl From<&str> for TagQuery {
    fn from(tag: &str) -> Self {
        Self(vec![tag.to_string()])
    }
}

impl From<String> for TagQuery {
    fn from(tag: String) -> Self {
        Self(vec![tag])
    }
}

impl From<Vec<String>> for TagQuery {
    fn from(tags: Vec<String>) -> Self {
        Self(tags)
    }
}

impl From<&[&str]> for TagQuery {
    fn from(tags: &[&str]) -> Self {
        Self(tags.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TagQuery {
    fn from(tags: [&str; N]) -> Self {
        Self(tags.iter().map(|t| t.to_string()).collect())
    }
}

/// Per-call blacklist argument for the `run_*` operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Blacklist {
    /// Apply only the notebook's default blacklist.
    #[default]
    Default,

    /// Suppress all blacklist filtering, including the default set.
    Disabled,

    /// Filter these tags in addition to the default blacklist.
    Extend(Vec<String>),
}

impl From<&str> for Blacklist {
    fn from(tag: &str) -> Self {
        Blacklist::Extend(vec![tag.to_string()])
    }
}

impl From<Vec<String>> for Blacklist {
    fn from(tags: Vec<String>) -> Self {
        Blacklist::Extend(tags)
    }
}

/// Indices of cells matching every tag in the query, in document order.
pub(crate) fn by_tag(cells: &[Cell], query: &TagQuery) -> Vec<usize> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| query.is_match(cell))
        .map(|(i, _)| i)
        .collect()
}

/// The range of cells before the first match of the query.
///
/// `include` extends the range by one to cover the match itself. `None`
/// when nothing matches.
pub(crate) fn before(cells: &[Cell], query: &TagQuery, include: bool) -> Option<Range<usize>> {
    let first = cells.iter().position(|cell| query.is_match(cell))?;
    Some(0..first + usize::from(include))
}

/// The range of cells after the last match of the query.
///
/// `include` starts the range at the match itself rather than just past it.
/// `None` when nothing matches.
pub(crate) fn after(cells: &[Cell], query: &TagQuery, include: bool) -> Option<Range<usize>> {
    let last = cells.iter().rposition(|cell| query.is_match(cell))?;
    let start = if include { last } else { last + 1 };
    Some(start..cells.len())
}

/// The merged set of tags to exclude, or `None` when filtering is disabled.
///
/// Effective blacklist = (per-call ∪ default) − always-include.
pub(crate) fn effective_blacklist(
    default: &HashSet<String>,
    always_include: &HashSet<String>,
    per_call: &Blacklist,
) -> Option<HashSet<String>> {
    let mut set = match per_call {
        Blacklist::Disabled => return None,
        Blacklist::Default => default.clone(),
        Blacklist::Extend(tags) => {
            let mut set = default.clone();
            set.extend(tags.iter().cloned());
            set
        }
    };
    for tag in always_include {
        set.remove(tag);
    }
    Some(set)
}

/// Drop selected cells carrying a blacklisted tag.
pub(crate) fn apply_blacklist(
    cells: &[Cell],
    selection: Vec<usize>,
    blacklist: &Option<HashSet<String>>,
) -> Vec<usize> {
    let Some(blacklist) = blacklist else {
        return selection;
    };
    selection
        .into_iter()
        .filter(|&i| {
            !cells[i]
                .tags()
                .iter()
                .any(|tag| tag.name().is_some_and(|name| blacklist.contains(name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::tags::Tag;
    use mlua::Lua;

    /// Build one cell per tag list, all compiled from a no-op source.
    fn make_cells(lua: &Lua, tag_lists: &[&[&str]]) -> Vec<Cell> {
        let ns = lua.create_table().unwrap();
        tag_lists
            .iter()
            .enumerate()
            .map(|(i, tags)| {
                let tags = if tags.is_empty() {
                    vec![Tag::Untagged]
                } else {
                    tags.iter().map(|t| Tag::Named(t.to_string())).collect()
                };
                Cell::compile(lua, &ns, "x = 1".to_string(), i + 1, tags, Vec::new()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_by_tag_preserves_document_order() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&["a"], &["b"], &["a", "b"], &[]]);

        assert_eq!(by_tag(&cells, &"a".into()), vec![0, 2]);
        assert_eq!(by_tag(&cells, &"b".into()), vec![1, 2]);
    }

    #[test]
    fn test_by_tag_conjunction() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&["a"], &["b"], &["a", "b"]]);

        assert_eq!(by_tag(&cells, &["a", "b"].into()), vec![2]);
        assert!(by_tag(&cells, &["a", "missing"].into()).is_empty());
    }

    #[test]
    fn test_untagged_never_matches() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&[]]);
        assert!(by_tag(&cells, &"(untagged)".into()).is_empty());
    }

    #[test]
    fn test_before_anchors_at_first_match() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&["a"], &["x"], &["b"], &["x"], &["c"]]);

        assert_eq!(before(&cells, &"x".into(), false), Some(0..1));
        assert_eq!(before(&cells, &"x".into(), true), Some(0..2));
        assert_eq!(before(&cells, &"missing".into(), false), None);
    }

    #[test]
    fn test_before_first_cell_match_selects_nothing() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&["x"], &["a"]]);
        assert_eq!(before(&cells, &"x".into(), false), Some(0..0));
    }

    #[test]
    fn test_after_anchors_at_last_match() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&["a"], &["x"], &["b"], &["x"], &["c"]]);

        assert_eq!(after(&cells, &"x".into(), true), Some(3..5));
        assert_eq!(after(&cells, &"x".into(), false), Some(4..5));
        assert_eq!(after(&cells, &"missing".into(), true), None);
    }

    #[test]
    fn test_after_last_cell_match_selects_nothing() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&["a"], &["x"]]);
        assert_eq!(after(&cells, &"x".into(), false), Some(2..2));
    }

    #[test]
    fn test_effective_blacklist_merges_and_overrides() {
        let default: HashSet<String> = ["__skip__".to_string()].into();
        let none: HashSet<String> = HashSet::new();

        assert_eq!(
            effective_blacklist(&default, &none, &Blacklist::Default),
            Some(default.clone())
        );
        assert_eq!(effective_blacklist(&default, &none, &Blacklist::Disabled), None);

        let extended =
            effective_blacklist(&default, &none, &Blacklist::Extend(vec!["slow".to_string()]))
                .unwrap();
        assert!(extended.contains("__skip__"));
        assert!(extended.contains("slow"));

        let include: HashSet<String> = ["__skip__".to_string()].into();
        let overridden = effective_blacklist(&default, &include, &Blacklist::Default).unwrap();
        assert!(overridden.is_empty());
    }

    #[test]
    fn test_apply_blacklist_drops_tagged_cells() {
        let lua = Lua::new();
        let cells = make_cells(&lua, &[&["a"], &["a", "__skip__"], &[]]);
        let blacklist: Option<HashSet<String>> = Some(["__skip__".to_string()].into());

        assert_eq!(apply_blacklist(&cells, vec![0, 1, 2], &blacklist), vec![0, 2]);
        assert_eq!(apply_blacklist(&cells, vec![0, 1, 2], &None), vec![0, 1, 2]);
    }
}
