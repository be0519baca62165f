//! Breadcrumb composition: page, ancestors, then the focused block.

use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;
use url::Url;
use uuid::Uuid;

use blockpath_shared::{Block, Page, Snapshot};
use blockpath_text::{TextOptions, block_label};

use crate::ancestry::{AncestorChain, resolve_ancestors};

/// Where a crumb navigates to when clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CrumbTarget {
    /// A page, by its unique (lowercase) name.
    Page(String),
    /// A block, by durable id.
    Block(Uuid),
}

/// One breadcrumb segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub label: String,
    /// Host route fragment, e.g. `#/page/rust%20notes`.
    pub href: String,
    pub identifier: Uuid,
    target: CrumbTarget,
}

impl Crumb {
    fn page(page: &Page) -> Self {
        Self {
            label: page.display_name().to_string(),
            href: route(&page.name),
            identifier: page.uuid,
            target: CrumbTarget::Page(page.name.clone()),
        }
    }

    fn block(block: &Block, opts: &TextOptions) -> Self {
        Self {
            label: block_label(block, opts),
            href: route(&block.uuid.to_string()),
            identifier: block.uuid,
            target: CrumbTarget::Block(block.uuid),
        }
    }

    /// The click target of this crumb.
    pub fn target(&self) -> &CrumbTarget {
        &self.target
    }
}

/// Build a `#/page/<name>` route.
///
/// Characters that are not valid in a path are percent-encoded. `/` is kept,
/// so namespaced pages such as `a/b` route to `#/page/a/b`. Pieces that are
/// exactly `.` or `..` cannot be expressed in a path and are dropped.
fn route(name: &str) -> String {
    static BASE: LazyLock<Url> =
        LazyLock::new(|| Url::parse("http://route.invalid/").expect("valid base url"));

    let mut url = BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push("page").extend(name.split('/'));
    }
    format!("#{}", url.path())
}

/// The full breadcrumb for one block: `[page, ancestors..., block]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Breadcrumbs(Vec<Crumb>);

impl Breadcrumbs {
    /// Compose crumbs for `target` from its resolved ancestor chain.
    pub fn from_chain(chain: &AncestorChain<'_>, target: &Block, opts: &TextOptions) -> Self {
        let mut crumbs = Vec::with_capacity(chain.depth() + 2);
        crumbs.push(Crumb::page(chain.page));
        crumbs.extend(chain.ancestors.iter().map(|block| Crumb::block(block, opts)));
        crumbs.push(Crumb::block(target, opts));
        Self(crumbs)
    }

    /// Breadcrumbs for the snapshot's focused block.
    ///
    /// `None` when the snapshot has no focus or the focused block is not in
    /// the captured tree.
    pub fn for_snapshot(snapshot: &Snapshot, opts: &TextOptions) -> Option<Self> {
        let focus = snapshot.focus()?;
        let chain = resolve_ancestors(snapshot.page(), snapshot.tree(), focus.id)?;
        Some(Self::from_chain(&chain, focus, opts))
    }

    pub fn crumbs(&self) -> &[Crumb] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Join the labels with `separator`.
    pub fn render(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(|crumb| crumb.label.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl fmt::Display for Breadcrumbs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(" / "))
    }
}
