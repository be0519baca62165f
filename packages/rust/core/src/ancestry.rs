//! Ancestor-path resolution.
//!
//! Blocks carry no parent pointer, so the path from the page root down to a
//! block is recovered by a depth-first search over the snapshot's tree.

use tracing::debug;

use blockpath_shared::{Block, BlockId, Page};

/// Root-to-parent path of a block: the page, then each ancestor block.
///
/// The block itself is not part of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct AncestorChain<'a> {
    pub page: &'a Page,
    /// Ancestor blocks, outermost first.
    pub ancestors: Vec<&'a Block>,
}

impl<'a> AncestorChain<'a> {
    /// The immediate parent block, or `None` for a top-level block.
    pub fn parent(&self) -> Option<&'a Block> {
        self.ancestors.last().copied()
    }

    /// Number of blocks between the page and the target.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

/// Find the ancestors of `target` in `tree` (the top-level blocks of `page`).
///
/// Returns `None` if the id is not in the tree; a missing block is a normal
/// outcome (the user navigated away, or is editing through another view).
/// If an id occurs more than once, the first occurrence in document order wins.
pub fn resolve_ancestors<'a>(
    page: &'a Page,
    tree: &'a [Block],
    target: BlockId,
) -> Option<AncestorChain<'a>> {
    let roots: Vec<&Block> = tree.iter().collect();
    let mut path = Vec::new();

    if search_level(&roots, target, &mut path) {
        Some(AncestorChain {
            page,
            ancestors: path,
        })
    } else {
        debug!(%target, page = %page.name, "block not present in page tree");
        None
    }
}

/// Look a block up by id anywhere in `tree`, in document order.
pub fn find_block(tree: &[Block], id: BlockId) -> Option<&Block> {
    tree.iter().find_map(|block| {
        if block.id == id {
            Some(block)
        } else {
            block
                .resolved_children()
                .find_map(|child| find_block(std::slice::from_ref(child), id))
        }
    })
}

/// Check the siblings first, then descend into each in order. `path` holds
/// the chain to the current level and is restored on backtrack.
fn search_level<'a>(level: &[&'a Block], target: BlockId, path: &mut Vec<&'a Block>) -> bool {
    if level.iter().any(|block| block.id == target) {
        return true;
    }

    for &block in level {
        let children: Vec<&Block> = block.resolved_children().collect();
        if children.is_empty() {
            continue;
        }

        path.push(block);
        if search_level(&children, target, path) {
            return true;
        }
        path.pop();
    }

    false
}
