//! Rich-text flattening, word counting, and breadcrumb labels.
//!
//! Flattening walks a block's fragment tree and yields the human-readable
//! text tokens in document order. It is a best-effort extractor: unknown or
//! malformed fragments contribute nothing instead of failing, and it never
//! calls back into the host.

mod wordcount;

use tracing::{debug, instrument};

use blockpath_shared::{
    AppConfig, Block, BlockpathError, Fragment, Link, LinkUrl, ListItem, Macro, Result,
};

pub use wordcount::count_words;

/// Token emitted for a macro that points at another block or page.
pub const REFERENCE_TOKEN: &str = "reference";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Knobs for flattening, counting, and labelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Lowercase substrings of a macro name that mark it as a reference.
    pub reference_markers: Vec<String>,
    /// Characters treated as punctuation on top of the built-in set.
    pub extra_punctuation: Vec<char>,
    /// Label for a block whose title has no text.
    pub placeholder_label: String,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            reference_markers: vec!["reference".into()],
            extra_punctuation: vec!['·'],
            placeholder_label: "…".into(),
        }
    }
}

impl TextOptions {
    /// Build options from the `[text]` and `[display]` config sections.
    ///
    /// Fails if an `extra_punctuation` entry is not exactly one character.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let extra_punctuation = config
            .text
            .extra_punctuation
            .iter()
            .map(|entry| {
                let mut chars = entry.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(ch),
                    _ => Err(BlockpathError::validation(format!(
                        "text.extra_punctuation entries must be single characters, got {entry:?}"
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            reference_markers: config
                .text
                .reference_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            extra_punctuation,
            placeholder_label: config.display.placeholder_label.clone(),
        })
    }

    fn is_reference_macro(&self, m: &Macro) -> bool {
        let name = m.name.to_lowercase();
        self.reference_markers
            .iter()
            .any(|marker| !marker.is_empty() && name.contains(marker.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Flatten one fragment into its text tokens, in document order.
///
/// Empty strings are never emitted; callers join with their own separator.
pub fn flatten(fragment: &Fragment, opts: &TextOptions) -> Vec<String> {
    let mut out = Vec::new();
    flatten_into(fragment, opts, &mut out);
    out
}

/// Flatten a block: `title`, then `body`, then each resolved child in order.
pub fn flatten_block(block: &Block, opts: &TextOptions) -> Vec<String> {
    let mut out = Vec::new();
    flatten_block_into(block, opts, &mut out);
    out
}

/// Flatten every top-level block of a page, in order.
pub fn flatten_page(tree: &[Block], opts: &TextOptions) -> Vec<String> {
    let mut out = Vec::new();
    for block in tree {
        flatten_block_into(block, opts, &mut out);
    }
    out
}

fn flatten_block_into(block: &Block, opts: &TextOptions, out: &mut Vec<String>) {
    for fragment in block.title.iter().chain(&block.body) {
        flatten_into(fragment, opts, out);
    }
    for child in block.resolved_children() {
        flatten_block_into(child, opts, out);
    }
}

fn flatten_into(fragment: &Fragment, opts: &TextOptions, out: &mut Vec<String>) {
    match fragment {
        Fragment::Plain(text) | Fragment::Code(Some(text)) => push_text(out, text),
        Fragment::Code(None) => {}
        Fragment::Link(link) => flatten_link(link, opts, out),
        Fragment::Macro(m) => {
            if opts.is_reference_macro(m) {
                push_text(out, REFERENCE_TOKEN);
            }
        }
        Fragment::Paragraph(children) => {
            for child in children {
                flatten_into(child, opts, out);
            }
        }
        Fragment::List(items) => flatten_list(items, opts, out),
        Fragment::Unknown { .. } => {}
    }
}

fn flatten_link(link: &Link, opts: &TextOptions, out: &mut Vec<String>) {
    // Embedded files (images, pdfs) have no readable text.
    if matches!(link.url, LinkUrl::File(_)) {
        return;
    }
    if let Some(first) = link.label.first() {
        flatten_into(first, opts, out);
        return;
    }
    match &link.url {
        LinkUrl::Search(target) => push_text(out, target),
        _ => push_text(out, &link.full_text),
    }
}

fn flatten_list(items: &[ListItem], opts: &TextOptions, out: &mut Vec<String>) {
    for item in items {
        for fragment in &item.content {
            flatten_into(fragment, opts, out);
        }
        flatten_list(&item.items, opts, out);
    }
}

fn push_text(out: &mut Vec<String>, text: &str) {
    if !text.is_empty() {
        out.push(text.to_string());
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Word count of a whole page: flatten, join with spaces, count.
#[instrument(skip_all, fields(blocks = tree.len()))]
pub fn page_word_count(tree: &[Block], opts: &TextOptions) -> usize {
    let joined = flatten_page(tree, opts).join(" ");
    let words = count_words(&joined, &opts.extra_punctuation);
    debug!(chars = joined.len(), words, "page word count");
    words
}

/// Breadcrumb label for a block: its title text, or the placeholder.
pub fn block_label(block: &Block, opts: &TextOptions) -> String {
    let mut tokens = Vec::new();
    for fragment in &block.title {
        flatten_into(fragment, opts, &mut tokens);
    }
    let label = tokens.concat();
    let label = label.trim();

    if label.is_empty() {
        opts.placeholder_label.clone()
    } else {
        label.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
