//! Scripted [`EditorApi`] for tracker and fetch tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::{Instant, sleep};
use uuid::Uuid;

use blockpath_host::EditorApi;
use blockpath_shared::{Block, BlockpathError, Page, PageId, Result};

struct FakePage {
    page: Page,
    tree: Vec<Block>,
    /// Latency of the tree read.
    delay: Duration,
}

#[derive(Default)]
pub(crate) struct FakeEditor {
    pages: HashMap<String, FakePage>,
    current: Mutex<Option<Block>>,
    calls: Mutex<Vec<(&'static str, Instant)>>,
    failing: AtomicBool,
}

pub(crate) fn uuid_for(id: u64) -> String {
    format!("6500a1b2-0000-4000-8000-{id:012}")
}

/// A block on page `page_id` with a single plain-text title.
pub(crate) fn block_json(id: u64, page_id: u64, title: &str, children: Vec<Value>) -> Value {
    json!({
        "id": id,
        "uuid": uuid_for(id),
        "page": {"id": page_id},
        "title": [["Plain", title]],
        "children": children
    })
}

pub(crate) fn block(id: u64, page_id: u64, title: &str) -> Block {
    serde_json::from_value(block_json(id, page_id, title, vec![])).expect("valid block")
}

impl FakeEditor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a page; its tree reads take `delay`.
    pub(crate) fn with_page(mut self, id: u64, name: &str, tree: Value, delay: Duration) -> Self {
        let page: Page = serde_json::from_value(json!({
            "id": id,
            "uuid": uuid_for(id),
            "name": name.to_lowercase(),
            "originalName": name
        }))
        .expect("valid page");
        let tree = serde_json::from_value(tree).expect("valid tree");
        self.pages
            .insert(page.name.clone(), FakePage { page, tree, delay });
        self
    }

    pub(crate) fn set_current(&self, block: Option<Block>) {
        *self.current.lock().unwrap() = block;
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Instants at which `method` was called.
    pub(crate) fn calls(&self, method: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, at)| *at)
            .collect()
    }

    fn record(&self, method: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push((method, Instant::now()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(BlockpathError::Network(format!("{method}: connection refused")));
        }
        Ok(())
    }
}

impl EditorApi for FakeEditor {
    async fn get_current_block(&self) -> Result<Option<Block>> {
        self.record("getCurrentBlock")?;
        Ok(self.current.lock().unwrap().clone())
    }

    async fn get_block(&self, uuid: Uuid) -> Result<Option<Block>> {
        self.record("getBlock")?;
        let current = self.current.lock().unwrap().clone();
        Ok(current.filter(|b| b.uuid == uuid))
    }

    async fn get_page(&self, id: PageId) -> Result<Option<Page>> {
        self.record("getPage")?;
        Ok(self
            .pages
            .values()
            .find(|p| p.page.id == id)
            .map(|p| p.page.clone()))
    }

    async fn get_page_by_name(&self, name: &str) -> Result<Option<Page>> {
        self.record("getPageByName")?;
        Ok(self
            .pages
            .get(&name.to_lowercase())
            .map(|p| p.page.clone()))
    }

    async fn get_page_blocks_tree(&self, page_name: &str) -> Result<Option<Vec<Block>>> {
        self.record("getPageBlocksTree")?;
        let Some(entry) = self.pages.get(page_name) else {
            return Ok(None);
        };
        sleep(entry.delay).await;
        Ok(Some(entry.tree.clone()))
    }
}
