//! Tag derivation for notebook cells.
//!
//! Tags come from three independent sources: explicit cell metadata, the
//! markdown heading hierarchy, and a first-line comment marker with block
//! scoping. [`TagState`] is the load-time state machine threaded through one
//! refresh pass; it owns the heading stack and the open block tag.

use std::fmt;

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag as MdTag, TagEnd};

/// A label attached to a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Named tag from metadata, a heading, or an in-source marker.
    Named(String),

    /// Sentinel for cells with no derived tags. Keeps the cell enumerable
    /// but never matches a lookup.
    Untagged,
}

impl Tag {
    /// Whether this tag matches a queried name.
    pub fn matches(&self, name: &str) -> bool {
        matches!(self, Tag::Named(tag) if tag == name)
    }

    /// The tag name, if named.
    pub fn name(&self) -> Option<&str> {
        match self {
            Tag::Named(tag) => Some(tag),
            Tag::Untagged => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Named(tag) => f.write_str(tag),
            Tag::Untagged => f.write_str("(untagged)"),
        }
    }
}

/// One markdown heading: level and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

impl Heading {
    /// The level-qualified tag form, e.g. `## Data`.
    pub fn qualified(&self) -> String {
        format!("{} {}", "#".repeat(self.level as usize), self.text)
    }
}

/// Load-time tagging state threaded through one refresh pass.
///
/// The heading stack holds the chain of currently open headings, strictly
/// increasing in level from bottom to top. At most one block tag is open at
/// a time.
#[derive(Debug)]
pub struct TagState {
    headings: Vec<Heading>,
    block_tag: Option<String>,
    close_blocks_at_headings: bool,
}

impl TagState {
    pub fn new(close_blocks_at_headings: bool) -> Self {
        Self {
            headings: Vec::new(),
            block_tag: None,
            close_blocks_at_headings,
        }
    }

    /// Record a heading, replacing any open heading at its level or deeper.
    ///
    /// Skipped levels are accepted as-is; the stack only maintains strictly
    /// increasing order among the entries it holds.
    pub fn observe_heading(&mut self, level: u8, text: &str) {
        self.headings.retain(|h| h.level < level);
        self.headings.push(Heading {
            level,
            text: text.to_string(),
        });
        if self.close_blocks_at_headings {
            self.block_tag = None;
        }
    }

    /// Feed every heading of a markdown cell through the stack.
    pub fn observe_markdown(&mut self, source: &str) {
        for (level, text) in headings(source) {
            self.observe_heading(level, &text);
        }
    }

    /// The chain of ancestor headings open for the cell being processed.
    pub fn heading_path(&self) -> &[Heading] {
        &self.headings
    }

    /// The currently open block tag, if any.
    pub fn block_tag(&self) -> Option<&str> {
        self.block_tag.as_deref()
    }
}

/// Derive the tag list for one code cell, updating the block state.
///
/// Only the first line of the source is inspected for the marker
/// convention; later lines never contribute tags. An empty result is
/// replaced by the [`Tag::Untagged`] sentinel so cells are never tag-less.
pub fn extract_tags(
    state: &mut TagState,
    metadata_tags: &[String],
    source: &str,
    marker: &str,
) -> Vec<Tag> {
    let mut tags: Vec<Tag> = metadata_tags.iter().cloned().map(Tag::Named).collect();

    // A heading can be referred to by its bare text or its markdown form.
    for heading in &state.headings {
        tags.push(Tag::Named(heading.text.clone()));
        tags.push(Tag::Named(heading.qualified()));
    }

    if let Some(block) = &state.block_tag {
        tags.push(Tag::Named(block.clone()));
    }

    let first_line = source.lines().next().unwrap_or("");
    if let Some(rest) = first_line.strip_prefix(marker) {
        if let Some(name) = rest.strip_prefix("block ") {
            let name = name.trim();
            if !name.is_empty() {
                state.block_tag = Some(name.to_string());
                tags.push(Tag::Named(name.to_string()));
            }
        } else if rest.starts_with("lastblock") {
            state.block_tag = None;
        } else {
            for token in rest.trim_start_matches('#').split_whitespace() {
                tags.push(Tag::Named(token.to_string()));
            }
        }
    }

    if tags.is_empty() {
        tags.push(Tag::Untagged);
    }
    tags
}

/// Extract `(level, text)` heading pairs from markdown source.
///
/// Heading text is the concatenation of the text and inline-code events
/// inside the heading; other inline markup is dropped.
pub fn headings(source: &str) -> Vec<(u8, String)> {
    let mut out = Vec::new();
    let mut current: Option<(u8, String)> = None;

    for event in Parser::new(source) {
        match event {
            Event::Start(MdTag::Heading { level, .. }) => {
                current = Some((heading_level(level), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = current.take() {
                    out.push(heading);
                }
            }
            _ => {}
        }
    }
    out
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
