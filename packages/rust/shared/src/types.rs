//! Content model for outliner pages: pages, blocks, rich-text fragments, and
//! the immutable snapshots the trackers hand to the resolvers.
//!
//! The host serves everything as JSON. Pages and blocks deserialize with plain
//! `serde` derives; fragments go through a lenient decoder because the host
//! encodes them as `[tag, payload]` pairs whose set of tags grows over time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Database id of a block. Unique within one loaded tree, not across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database id of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// Root container of a block tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Internal database id.
    pub id: PageId,
    /// Durable identifier.
    pub uuid: Uuid,
    /// Unique lookup name (the host lowercases it).
    pub name: String,
    /// Name as the user typed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

impl Page {
    /// Label used when the page heads a breadcrumb trail.
    pub fn display_name(&self) -> &str {
        self.original_name.as_deref().unwrap_or(&self.name)
    }
}

/// The `page` field of a block: just enough to look the page up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: PageId,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A node in a page's content tree. There is no parent pointer; ancestry is
/// recovered by searching from the page root.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Block {
    /// Snapshot-local id.
    pub id: BlockId,
    /// Durable id, stable across reloads and used for navigation.
    pub uuid: Uuid,
    /// Raw markup source. Kept for diagnostics, never parsed here.
    #[serde(default)]
    pub content: String,
    /// Owning page, when the host includes it.
    #[serde(default)]
    pub page: Option<PageRef>,
    /// Single-line heading text.
    #[serde(default, deserialize_with = "de_fragments")]
    pub title: Vec<Fragment>,
    /// Extended content below the heading.
    #[serde(default, deserialize_with = "de_fragments")]
    pub body: Vec<Fragment>,
    /// Ordered children; display order is preserved everywhere.
    #[serde(default, deserialize_with = "de_children")]
    pub children: Vec<BlockChild>,
}

impl Block {
    /// Children that are embedded blocks, in order. Unresolved references
    /// are skipped, never dereferenced.
    pub fn resolved_children(&self) -> impl Iterator<Item = &Block> {
        self.children.iter().filter_map(BlockChild::as_block)
    }
}

/// One entry in [`Block::children`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BlockChild {
    /// A `["uuid", "<uuid>"]` pointer the host did not expand.
    Unresolved(String, String),
    /// An embedded child block.
    Block(Block),
}

impl BlockChild {
    /// The embedded block, if this child was resolved.
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(block) => Some(block),
            Self::Unresolved(..) => None,
        }
    }
}

fn de_children<'de, D>(deserializer: D) -> std::result::Result<Vec<BlockChild>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<BlockChild>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// One unit of rich text inside a block title or body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Literal text.
    Plain(String),
    /// A hyperlink or page reference.
    Link(Link),
    /// A templated directive such as `{{embed ...}}`.
    Macro(Macro),
    /// Inline or block code. `None` when the host sent a non-string payload.
    Code(Option<String>),
    /// A wrapping block of fragments.
    Paragraph(Vec<Fragment>),
    /// A (possibly nested) list.
    List(Vec<ListItem>),
    /// A tag this crate does not know, or a payload that did not decode.
    Unknown { tag: String },
}

/// Payload of [`Fragment::Link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: LinkUrl,
    /// Display override; empty when the link shows its own text.
    pub label: Vec<Fragment>,
    /// The link exactly as written in the source.
    pub full_text: String,
}

/// Target of a link, tagged the way the host tags it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkUrl {
    /// An embedded local file (asset).
    File(String),
    /// A reference-style link whose visible text is the search target.
    Search(String),
    /// Any other scheme; only the tag is kept.
    Other(String),
}

/// Payload of [`Fragment::Macro`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub arguments: Vec<String>,
}

/// One item of a [`Fragment::List`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub content: Vec<Fragment>,
    pub items: Vec<ListItem>,
}

impl Fragment {
    /// Shorthand for a [`Fragment::Plain`].
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    /// Decode one `[tag, payload]` pair. Never fails: anything unreadable
    /// becomes [`Fragment::Unknown`].
    pub fn from_value(value: &Value) -> Self {
        let (tag, payload) = match value.as_array().map(Vec::as_slice) {
            Some([Value::String(tag), payload]) => (tag.as_str(), payload),
            Some([Value::String(tag), ..]) => return Self::unknown(tag),
            _ => return Self::unknown(""),
        };

        match tag {
            "Plain" => match payload.as_str() {
                Some(text) => Self::Plain(text.to_string()),
                None => Self::unknown(tag),
            },
            "Code" => Self::Code(payload.as_str().map(str::to_string)),
            "Link" => Link::from_value(payload).map_or_else(|| Self::unknown(tag), Self::Link),
            "Macro" => Macro::from_value(payload).map_or_else(|| Self::unknown(tag), Self::Macro),
            "Paragraph" => Self::Paragraph(fragments_from_value(payload)),
            "List" => Self::List(list_items_from_value(payload)),
            other => Self::unknown(other),
        }
    }

    fn unknown(tag: &str) -> Self {
        Self::Unknown {
            tag: tag.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for Fragment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl Link {
    fn from_value(payload: &Value) -> Option<Self> {
        let obj = payload.as_object()?;
        let url = obj
            .get("url")
            .map_or_else(|| LinkUrl::Other(String::new()), LinkUrl::from_value);
        let label = obj.get("label").map(fragments_from_value).unwrap_or_default();
        let full_text = obj
            .get("full_text")
            .or_else(|| obj.get("fullText"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            url,
            label,
            full_text,
        })
    }
}

impl LinkUrl {
    fn from_value(value: &Value) -> Self {
        let Some([Value::String(tag), rest @ ..]) = value.as_array().map(Vec::as_slice) else {
            return Self::Other(String::new());
        };
        let target = rest
            .first()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match tag.as_str() {
            "File" => Self::File(target),
            "Search" => Self::Search(target),
            other => Self::Other(other.to_string()),
        }
    }
}

impl Macro {
    fn from_value(payload: &Value) -> Option<Self> {
        let obj = payload.as_object()?;
        let name = obj.get("name")?.as_str()?.to_string();
        let arguments = obj
            .get("arguments")
            .and_then(Value::as_array)
            .map(|args| {
                args.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self { name, arguments })
    }
}

/// Decode a fragment sequence. Non-arrays decode to an empty sequence.
pub fn fragments_from_value(value: &Value) -> Vec<Fragment> {
    value
        .as_array()
        .map(|items| items.iter().map(Fragment::from_value).collect())
        .unwrap_or_default()
}

fn list_items_from_value(value: &Value) -> Vec<ListItem> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| ListItem {
            content: obj.get("content").map(fragments_from_value).unwrap_or_default(),
            items: obj.get("items").map(list_items_from_value).unwrap_or_default(),
        })
        .collect()
}

fn de_fragments<'de, D>(deserializer: D) -> std::result::Result<Vec<Fragment>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(fragments_from_value).unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An immutable copy of one page's block tree, captured at one instant.
///
/// Edits never mutate a snapshot; the tracker captures a new one instead.
#[derive(Debug, Clone)]
pub struct Snapshot {
    page: Page,
    tree: Vec<Block>,
    focus: Option<Block>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Capture a snapshot now. `focus` is the block being edited, if any.
    pub fn capture(page: Page, tree: Vec<Block>, focus: Option<Block>) -> Self {
        Self {
            page,
            tree,
            focus,
            captured_at: Utc::now(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Top-level blocks of the page, in display order.
    pub fn tree(&self) -> &[Block] {
        &self.tree
    }

    /// The block that had edit focus when the snapshot was taken.
    pub fn focus(&self) -> Option<&Block> {
        self.focus.as_ref()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Total number of resolved blocks in the tree.
    pub fn block_count(&self) -> usize {
        fn count(block: &Block) -> usize {
            1 + block.resolved_children().map(count).sum::<usize>()
        }
        self.tree.iter().map(count).sum()
    }
}
