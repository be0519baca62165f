//! Snapshot fetching through the host API.
//!
//! Each fetch is a short chain of reads (focused block, its page, the page
//! tree). Any step answering "nothing" ends the chain with `Ok(None)`.

use tracing::{debug, instrument};

use uuid::Uuid;

use blockpath_host::EditorApi;
use blockpath_shared::{Block, Result, Snapshot};

/// What a tracker fetch should capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    /// The page around the block currently in edit focus.
    Focus,
    /// A page by name, with no focused block.
    Page(String),
}

/// Fetch a snapshot for `target`.
pub async fn fetch_snapshot<A: EditorApi>(
    api: &A,
    target: &FetchTarget,
) -> Result<Option<Snapshot>> {
    match target {
        FetchTarget::Focus => fetch_focus_snapshot(api).await,
        FetchTarget::Page(name) => fetch_page_snapshot(api, name).await,
    }
}

/// Snapshot of the page containing the focused block.
#[instrument(skip_all)]
pub async fn fetch_focus_snapshot<A: EditorApi>(api: &A) -> Result<Option<Snapshot>> {
    let Some(block) = api.get_current_block().await? else {
        debug!("no block in edit focus");
        return Ok(None);
    };
    snapshot_around(api, block).await
}

/// Snapshot of the page containing the block with durable id `uuid`.
#[instrument(skip(api))]
pub async fn fetch_block_snapshot<A: EditorApi>(api: &A, uuid: Uuid) -> Result<Option<Snapshot>> {
    let Some(block) = api.get_block(uuid).await? else {
        debug!("block not found");
        return Ok(None);
    };
    snapshot_around(api, block).await
}

async fn snapshot_around<A: EditorApi>(api: &A, block: Block) -> Result<Option<Snapshot>> {
    let Some(page_ref) = block.page else {
        debug!(block = %block.id, "focused block has no page");
        return Ok(None);
    };
    let Some(page) = api.get_page(page_ref.id).await? else {
        debug!(page = %page_ref.id, "page of focused block not found");
        return Ok(None);
    };
    let Some(tree) = api.get_page_blocks_tree(&page.name).await? else {
        debug!(page = %page.name, "page has no block tree");
        return Ok(None);
    };

    debug!(page = %page.name, block = %block.id, "captured focus snapshot");
    Ok(Some(Snapshot::capture(page, tree, Some(block))))
}

/// Snapshot of a page by name.
#[instrument(skip(api))]
pub async fn fetch_page_snapshot<A: EditorApi>(api: &A, name: &str) -> Result<Option<Snapshot>> {
    let Some(page) = api.get_page_by_name(name).await? else {
        debug!("page not found");
        return Ok(None);
    };
    let Some(tree) = api.get_page_blocks_tree(&page.name).await? else {
        debug!("page has no block tree");
        return Ok(None);
    };

    Ok(Some(Snapshot::capture(page, tree, None)))
}
