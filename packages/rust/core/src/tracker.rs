//! Content trackers: keep a display surface in sync with the editor.
//!
//! A [`ContentTracker`] listens to editor events, fetches snapshots through
//! the host API, computes a value from each snapshot (a [`Derivation`]), and
//! publishes it to a [`DisplaySurface`]. Fetches run concurrently in a
//! [`JoinSet`]; every fetch is tagged with the generation counter current at
//! issuance and a result is only applied if no newer fetch or invalidation has
//! happened since. Superseded fetches are left to finish and then discarded.
//!
//! Timing:
//! - content changes (re)arm a debounce timer; one refetch fires after the
//!   last change in a burst.
//! - a blur starts a grace timer; the display is cleared when it expires,
//!   unless a new focus arrived first.

use std::fmt;
use std::future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant};
use tracing::{debug, info, instrument, warn};

use blockpath_host::EditorApi;
use blockpath_shared::{Result, Snapshot, TrackerConfig};
use blockpath_text::{TextOptions, page_word_count};

use crate::breadcrumb::Breadcrumbs;
use crate::fetch::{FetchTarget, fetch_snapshot};

/// Buffer size of each tracker's event channel.
const EVENT_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Events and phases
// ---------------------------------------------------------------------------

/// Editor events the trackers react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// A block gained edit focus.
    Focus,
    /// The edited block lost focus.
    Blur,
    /// The content of the edited block changed (typing).
    Change,
    /// The user opened another page.
    Navigate { page: String },
    /// The tracker's surface was shown or hidden.
    Visibility { visible: bool },
}

/// Lifecycle of a tracker, observable through [`ContentTracker::phase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerPhase {
    /// Nothing fetched or nothing to show.
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// The surface reflects a snapshot of `page`.
    Settled { page: String },
    /// The display was cleared because focus or page moved away.
    Invalidated,
}

impl fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Fetching => f.write_str("fetching"),
            Self::Settled { page } => write!(f, "settled ({page})"),
            Self::Invalidated => f.write_str("invalidated"),
        }
    }
}

// ---------------------------------------------------------------------------
// Derivations and surfaces
// ---------------------------------------------------------------------------

/// The value a tracker computes from each snapshot.
pub trait Derivation: Send + 'static {
    type Output: Clone + fmt::Debug + Send + 'static;

    /// Short name used in logs.
    const NAME: &'static str;

    /// `None` means there is nothing to display for this snapshot.
    fn derive(&self, snapshot: &Snapshot) -> Option<Self::Output>;
}

/// Breadcrumbs for the focused block.
#[derive(Debug, Clone, Default)]
pub struct BreadcrumbDerivation {
    opts: TextOptions,
}

impl BreadcrumbDerivation {
    pub fn new(opts: TextOptions) -> Self {
        Self { opts }
    }
}

impl Derivation for BreadcrumbDerivation {
    type Output = Breadcrumbs;
    const NAME: &'static str = "breadcrumb";

    fn derive(&self, snapshot: &Snapshot) -> Option<Breadcrumbs> {
        Breadcrumbs::for_snapshot(snapshot, &self.opts)
    }
}

/// Word count of the whole page.
#[derive(Debug, Clone, Default)]
pub struct WordCountDerivation {
    opts: TextOptions,
}

impl WordCountDerivation {
    pub fn new(opts: TextOptions) -> Self {
        Self { opts }
    }
}

impl Derivation for WordCountDerivation {
    type Output = usize;
    const NAME: &'static str = "word-count";

    fn derive(&self, snapshot: &Snapshot) -> Option<usize> {
        Some(page_word_count(snapshot.tree(), &self.opts))
    }
}

/// Where a tracker publishes its values.
pub trait DisplaySurface<T>: Send + 'static {
    fn show(&mut self, value: &T);
    fn clear(&mut self);
}

/// What a [`ChannelSurface`] forwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceUpdate<T> {
    Show(T),
    Clear,
}

/// A surface that forwards updates over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSurface<T> {
    tx: mpsc::UnboundedSender<SurfaceUpdate<T>>,
}

/// Create a [`ChannelSurface`] and the receiver of its updates.
pub fn channel_surface<T>() -> (ChannelSurface<T>, mpsc::UnboundedReceiver<SurfaceUpdate<T>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSurface { tx }, rx)
}

impl<T: Clone + Send + 'static> DisplaySurface<T> for ChannelSurface<T> {
    fn show(&mut self, value: &T) {
        // A dropped receiver only means nobody is watching any more.
        let _ = self.tx.send(SurfaceUpdate::Show(value.clone()));
    }

    fn clear(&mut self) {
        let _ = self.tx.send(SurfaceUpdate::Clear);
    }
}

// ---------------------------------------------------------------------------
// Event fan-out
// ---------------------------------------------------------------------------

/// Fans one event stream out to any number of trackers.
///
/// Dropping the hub closes every subscriber, which stops the trackers.
#[derive(Debug, Default)]
pub struct EventHub {
    subscribers: Vec<mpsc::Sender<EditorEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new event receiver for one tracker.
    pub fn subscribe(&mut self) -> mpsc::Receiver<EditorEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber.
    pub async fn publish(&mut self, event: EditorEvent) {
        let mut closed = Vec::new();
        for (index, tx) in self.subscribers.iter().enumerate() {
            if tx.send(event.clone()).await.is_err() {
                closed.push(index);
            }
        }
        for index in closed.into_iter().rev() {
            debug!(index, "tracker stopped, dropping subscriber");
            self.subscribers.remove(index);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

// ---------------------------------------------------------------------------
// ContentTracker
// ---------------------------------------------------------------------------

type FetchOutcome = (u64, Result<Option<Snapshot>>);

/// One loop iteration's cause.
enum Step {
    Event(EditorEvent),
    Fetched(std::result::Result<FetchOutcome, JoinError>),
    Refetch,
    BlurExpired,
}

/// Keeps one [`DisplaySurface`] in sync with the editor.
pub struct ContentTracker<A, D, S> {
    api: Arc<A>,
    derivation: D,
    surface: S,
    config: TrackerConfig,
    /// Bumped by every fetch and every invalidation.
    generation: u64,
    phase: watch::Sender<TrackerPhase>,
    fetches: JoinSet<FetchOutcome>,
    /// What the last fetch captured; refetches repeat it.
    last_target: Option<FetchTarget>,
    refetch_at: Option<Instant>,
    clear_at: Option<Instant>,
    visible: bool,
    showing: bool,
}

impl<A, D, S> ContentTracker<A, D, S>
where
    A: EditorApi + 'static,
    D: Derivation,
    S: DisplaySurface<D::Output>,
{
    pub fn new(api: Arc<A>, derivation: D, surface: S, config: TrackerConfig) -> Self {
        let (phase, _) = watch::channel(TrackerPhase::Idle);
        Self {
            api,
            derivation,
            surface,
            config,
            generation: 0,
            phase,
            fetches: JoinSet::new(),
            last_target: None,
            refetch_at: None,
            clear_at: None,
            visible: true,
            showing: false,
        }
    }

    /// Observe phase transitions.
    pub fn phase(&self) -> watch::Receiver<TrackerPhase> {
        self.phase.subscribe()
    }

    /// Process events until the event stream closes, then wait for fetches
    /// still in flight.
    #[instrument(skip_all, fields(tracker = D::NAME))]
    pub async fn run(mut self, mut events: mpsc::Receiver<EditorEvent>) {
        info!("tracker started");

        loop {
            let step = tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(event) => Step::Event(event),
                    None => break,
                },
                Some(joined) = self.fetches.join_next() => Step::Fetched(joined),
                () = wait_until(self.refetch_at) => Step::Refetch,
                () = wait_until(self.clear_at) => Step::BlurExpired,
            };

            match step {
                Step::Event(event) => self.on_event(event),
                Step::Fetched(joined) => self.on_fetched(joined),
                Step::Refetch => {
                    self.refetch_at = None;
                    if let Some(target) = self.last_target.clone() {
                        debug!("debounce elapsed, refetching");
                        self.begin_fetch(target);
                    }
                }
                Step::BlurExpired => {
                    self.clear_at = None;
                    debug!("blur grace elapsed");
                    self.invalidate();
                }
            }
        }

        // Let in-flight fetches land so the newest result is still published.
        while let Some(joined) = self.fetches.join_next().await {
            self.on_fetched(joined);
        }
        info!("event stream closed, tracker stopped");
    }

    fn on_event(&mut self, event: EditorEvent) {
        if let EditorEvent::Visibility { visible } = event {
            self.visible = visible;
            if !visible {
                debug!("surface hidden");
                self.invalidate();
            }
            return;
        }

        if !self.visible {
            debug!(?event, "surface hidden, ignoring event");
            return;
        }

        match event {
            EditorEvent::Focus => {
                self.clear_at = None;
                self.refetch_at = None;
                self.begin_fetch(FetchTarget::Focus);
            }
            EditorEvent::Blur => {
                self.clear_at = Some(Instant::now() + self.config.blur_grace);
            }
            EditorEvent::Change => match &*self.phase.borrow() {
                TrackerPhase::Settled { .. } | TrackerPhase::Fetching => {
                    self.refetch_at = Some(Instant::now() + self.config.debounce);
                }
                phase => debug!(%phase, "change with nothing to refresh"),
            },
            EditorEvent::Navigate { page } => {
                self.invalidate();
                self.begin_fetch(FetchTarget::Page(page));
            }
            EditorEvent::Visibility { .. } => {}
        }
    }

    fn begin_fetch(&mut self, target: FetchTarget) {
        self.generation += 1;
        let tag = self.generation;
        let api = Arc::clone(&self.api);

        debug!(generation = tag, ?target, "fetch issued");
        self.last_target = Some(target.clone());
        self.fetches.spawn(async move {
            let result = fetch_snapshot(api.as_ref(), &target).await;
            (tag, result)
        });
        self.set_phase(TrackerPhase::Fetching);
    }

    fn on_fetched(&mut self, joined: std::result::Result<FetchOutcome, JoinError>) {
        let (tag, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "fetch task failed");
                if self.fetches.is_empty() && *self.phase.borrow() == TrackerPhase::Fetching {
                    self.set_phase(TrackerPhase::Idle);
                }
                return;
            }
        };

        if tag != self.generation {
            debug!(generation = tag, current = self.generation, "discarding stale fetch");
            return;
        }

        match result {
            Ok(Some(snapshot)) => {
                match self.derivation.derive(&snapshot) {
                    Some(value) => {
                        debug!(?value, "publishing");
                        self.surface.show(&value);
                        self.showing = true;
                    }
                    None => {
                        debug!("nothing to display for snapshot");
                        self.clear_display();
                    }
                }
                self.set_phase(TrackerPhase::Settled {
                    page: snapshot.page().name.clone(),
                });
            }
            Ok(None) => {
                debug!("host returned nothing");
                self.clear_display();
                self.set_phase(TrackerPhase::Idle);
            }
            Err(e) => {
                warn!(error = %e, "fetch failed");
                self.clear_display();
                self.set_phase(TrackerPhase::Idle);
            }
        }
    }

    /// Drop everything in flight and clear the surface.
    fn invalidate(&mut self) {
        self.generation += 1;
        self.refetch_at = None;
        self.clear_at = None;
        self.clear_display();
        self.set_phase(TrackerPhase::Invalidated);
    }

    fn clear_display(&mut self) {
        if self.showing {
            self.surface.clear();
            self.showing = false;
        }
    }

    fn set_phase(&self, phase: TrackerPhase) {
        self.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                *current = phase;
                true
            }
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeEditor, block, block_json};
    use blockpath_shared::Page;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::sleep;

    const SLOW: Duration = Duration::from_millis(500);
    const FAST: Duration = Duration::from_millis(50);

    /// Page "Alpha" (id 10, slow tree reads) and "Beta" (id 20, fast).
    fn editor() -> Arc<FakeEditor> {
        Arc::new(
            FakeEditor::new()
                .with_page(
                    10,
                    "Alpha",
                    json!([block_json(
                        1,
                        10,
                        "alpha root",
                        vec![block_json(2, 10, "alpha child node", vec![])],
                    )]),
                    SLOW,
                )
                .with_page(
                    20,
                    "Beta",
                    json!([block_json(3, 20, "beta one two three", vec![])]),
                    FAST,
                ),
        )
    }

    struct Harness<T> {
        events: mpsc::Sender<EditorEvent>,
        updates: UnboundedReceiver<SurfaceUpdate<T>>,
        phase: watch::Receiver<TrackerPhase>,
    }

    impl<T> Harness<T> {
        async fn send(&self, event: EditorEvent) {
            self.events.send(event).await.expect("tracker running");
            // Let the tracker pick the event up.
            sleep(Duration::from_millis(1)).await;
        }

        fn drain(&mut self) -> Vec<SurfaceUpdate<T>> {
            let mut out = Vec::new();
            while let Ok(update) = self.updates.try_recv() {
                out.push(update);
            }
            out
        }
    }

    fn spawn<D: Derivation>(api: Arc<FakeEditor>, derivation: D) -> Harness<D::Output> {
        let (surface, updates) = channel_surface();
        let config = TrackerConfig {
            debounce: Duration::from_millis(1000),
            blur_grace: Duration::from_millis(100),
        };
        let tracker = ContentTracker::new(api, derivation, surface, config);
        let phase = tracker.phase();
        let (events, rx) = mpsc::channel(16);
        tokio::spawn(tracker.run(rx));
        Harness {
            events,
            updates,
            phase,
        }
    }

    fn breadcrumbs(api: Arc<FakeEditor>) -> Harness<Breadcrumbs> {
        spawn(api, BreadcrumbDerivation::default())
    }

    fn rendered(update: &SurfaceUpdate<Breadcrumbs>) -> Option<String> {
        match update {
            SurfaceUpdate::Show(crumbs) => Some(crumbs.render(" / ")),
            SurfaceUpdate::Clear => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn focus_publishes_breadcrumbs() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut h = breadcrumbs(api);

        h.send(EditorEvent::Focus).await;
        assert_eq!(*h.phase.borrow(), TrackerPhase::Fetching);

        sleep(FAST * 2).await;
        let updates = h.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(rendered(&updates[0]).as_deref(), Some("Beta / beta one two three"));
        assert_eq!(
            *h.phase.borrow(),
            TrackerPhase::Settled {
                page: "beta".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_focus_result_never_overwrites_newer_one() {
        let api = editor();
        let mut h = breadcrumbs(Arc::clone(&api));

        api.set_current(Some(block(2, 10, "alpha child node")));
        h.send(EditorEvent::Focus).await;
        sleep(Duration::from_millis(10)).await;

        api.set_current(Some(block(3, 20, "beta one two three")));
        h.send(EditorEvent::Focus).await;

        // Alpha's tree read finishes long after Beta's.
        sleep(SLOW * 2).await;
        let shown: Vec<_> = h.drain().iter().filter_map(rendered).collect();
        assert_eq!(shown, vec!["Beta / beta one two three".to_string()]);
        assert_eq!(api.calls("getPageBlocksTree").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_navigation_result_is_discarded() {
        let api = editor();
        let mut h = spawn(Arc::clone(&api), WordCountDerivation::default());

        h.send(EditorEvent::Navigate {
            page: "Alpha".into(),
        })
        .await;
        h.send(EditorEvent::Navigate {
            page: "Beta".into(),
        })
        .await;

        sleep(SLOW * 2).await;
        // Beta has four words, Alpha five; Alpha's count never shows up.
        assert_eq!(h.drain(), vec![SurfaceUpdate::Show(4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn change_burst_triggers_one_debounced_refetch() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        h.drain();

        let mut last_change = Instant::now();
        for _ in 0..5 {
            h.events.send(EditorEvent::Change).await.unwrap();
            last_change = Instant::now();
            sleep(Duration::from_millis(20)).await;
        }

        sleep(Duration::from_secs(3)).await;
        let calls = api.calls("getCurrentBlock");
        assert_eq!(calls.len(), 2, "one fetch for focus, one after the burst");

        let waited = calls[1] - last_change;
        assert!(waited >= Duration::from_millis(1000), "fired after {waited:?}");
        assert!(waited < Duration::from_millis(1020), "fired after {waited:?}");

        let shown: Vec<_> = h.drain().iter().filter_map(rendered).collect();
        assert_eq!(shown.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn change_before_any_fetch_is_ignored() {
        let api = editor();
        let h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Change).await;
        sleep(Duration::from_secs(3)).await;
        assert!(api.calls("getCurrentBlock").is_empty());
        assert_eq!(*h.phase.borrow(), TrackerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn focus_cancels_pending_refetch() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        h.drain();

        let changed = Instant::now();
        h.send(EditorEvent::Change).await;
        sleep(Duration::from_millis(200)).await;
        h.send(EditorEvent::Focus).await;
        sleep(Duration::from_secs(3)).await;

        let calls = api.calls("getCurrentBlock");
        assert_eq!(calls.len(), 2, "no refetch after the second focus");
        assert!(calls[1] - changed < Duration::from_millis(1000));

        let shown: Vec<_> = h.drain().iter().filter_map(rendered).collect();
        assert_eq!(shown, vec!["Beta / beta one two three".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn navigate_cancels_pending_refetch() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        h.drain();

        h.send(EditorEvent::Change).await;
        sleep(Duration::from_millis(200)).await;
        h.send(EditorEvent::Navigate {
            page: "Beta".into(),
        })
        .await;
        sleep(Duration::from_secs(3)).await;

        assert_eq!(api.calls("getCurrentBlock").len(), 1);
        assert_eq!(api.calls("getPageByName").len(), 1);
        assert_eq!(h.drain(), vec![SurfaceUpdate::Clear]);
        assert_eq!(
            *h.phase.borrow(),
            TrackerPhase::Settled {
                page: "beta".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn change_while_fetching_rearms_debounce() {
        let api = editor();
        api.set_current(Some(block(2, 10, "alpha child node")));
        let mut h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Focus).await;
        sleep(Duration::from_millis(100)).await;
        assert_eq!(*h.phase.borrow(), TrackerPhase::Fetching);

        let changed = Instant::now();
        h.events.send(EditorEvent::Change).await.unwrap();
        sleep(Duration::from_secs(3)).await;

        let calls = api.calls("getCurrentBlock");
        assert_eq!(calls.len(), 2, "one fetch for focus, one after the change");
        let waited = calls[1] - changed;
        assert!(waited >= Duration::from_millis(1000), "fired after {waited:?}");
        assert!(waited < Duration::from_millis(1020), "fired after {waited:?}");

        let shown: Vec<_> = h.drain().iter().filter_map(rendered).collect();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0], "Alpha / alpha root / alpha child node");
        assert_eq!(shown[0], shown[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn blur_expiry_discards_fetch_in_flight() {
        let api = editor();
        api.set_current(Some(block(2, 10, "alpha child node")));
        let mut h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Focus).await;
        sleep(Duration::from_millis(10)).await;
        h.send(EditorEvent::Blur).await;

        // Grace runs out long before Alpha's tree read returns.
        sleep(Duration::from_millis(200)).await;
        assert_eq!(*h.phase.borrow(), TrackerPhase::Invalidated);
        assert_eq!(api.calls("getPageBlocksTree").len(), 1);

        sleep(SLOW * 2).await;
        assert_eq!(api.calls("getCurrentBlock").len(), 1);
        assert!(h.drain().is_empty(), "late result must not be published");
        assert_eq!(*h.phase.borrow(), TrackerPhase::Invalidated);
    }

    #[tokio::test(start_paused = true)]
    async fn refocus_within_grace_does_not_clear() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut h = breadcrumbs(api);

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        h.send(EditorEvent::Blur).await;
        sleep(Duration::from_millis(50)).await;
        h.send(EditorEvent::Focus).await;
        sleep(Duration::from_millis(500)).await;

        let updates = h.drain();
        assert!(!updates.contains(&SurfaceUpdate::Clear), "{updates:?}");
        assert_eq!(updates.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blur_clears_after_grace() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut h = breadcrumbs(api);

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        h.drain();

        h.send(EditorEvent::Blur).await;
        sleep(Duration::from_millis(50)).await;
        assert!(h.drain().is_empty(), "still within grace");

        sleep(Duration::from_millis(100)).await;
        assert_eq!(h.drain(), vec![SurfaceUpdate::Clear]);
        assert_eq!(*h.phase.borrow(), TrackerPhase::Invalidated);
    }

    #[tokio::test(start_paused = true)]
    async fn navigate_clears_breadcrumbs_and_counts_new_page() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut crumbs = breadcrumbs(Arc::clone(&api));
        let mut words = spawn(Arc::clone(&api), WordCountDerivation::default());

        crumbs.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        assert_eq!(crumbs.drain().len(), 1);

        let navigate = EditorEvent::Navigate {
            page: "Alpha".into(),
        };
        crumbs.send(navigate.clone()).await;
        words.send(navigate).await;
        sleep(SLOW * 2).await;

        // No focused block on the new page, so the breadcrumb stays clear.
        assert_eq!(crumbs.drain(), vec![SurfaceUpdate::Clear]);
        assert_eq!(words.drain(), vec![SurfaceUpdate::Show(5)]);
        assert_eq!(
            *words.phase.borrow(),
            TrackerPhase::Settled {
                page: "alpha".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn focused_block_missing_from_tree_shows_nothing() {
        let api = editor();
        // Claims to live on Beta but is not in Beta's tree.
        api.set_current(Some(block(77, 20, "ghost")));
        let mut h = breadcrumbs(api);

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        assert!(h.drain().is_empty());
        assert!(matches!(*h.phase.borrow(), TrackerPhase::Settled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_failure_returns_to_idle() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        api.set_failing(true);
        let mut h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        assert!(h.drain().is_empty());
        assert_eq!(*h.phase.borrow(), TrackerPhase::Idle);

        api.set_failing(false);
        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        assert_eq!(h.drain().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_surface_clears_and_ignores_events() {
        let api = editor();
        api.set_current(Some(block(3, 20, "beta one two three")));
        let mut h = breadcrumbs(Arc::clone(&api));

        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        h.drain();

        h.send(EditorEvent::Visibility { visible: false }).await;
        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        assert_eq!(h.drain(), vec![SurfaceUpdate::Clear]);
        assert_eq!(api.calls("getCurrentBlock").len(), 1);

        h.send(EditorEvent::Visibility { visible: true }).await;
        h.send(EditorEvent::Focus).await;
        sleep(FAST * 2).await;
        assert_eq!(h.drain().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_stream_publishes_the_last_fetch() {
        let api = editor();
        let (surface, mut updates) = channel_surface();
        let tracker = ContentTracker::new(
            api,
            WordCountDerivation::default(),
            surface,
            TrackerConfig::default(),
        );
        let (events, rx) = mpsc::channel(4);
        let handle = tokio::spawn(tracker.run(rx));

        events
            .send(EditorEvent::Navigate {
                page: "Alpha".into(),
            })
            .await
            .unwrap();
        drop(events);

        handle.await.unwrap();
        assert_eq!(updates.recv().await, Some(SurfaceUpdate::Show(5)));
    }

    #[tokio::test]
    async fn hub_fans_out_and_drops_closed_subscribers() {
        let mut hub = EventHub::new();
        let mut first = hub.subscribe();
        let second = hub.subscribe();
        drop(second);

        hub.publish(EditorEvent::Focus).await;
        assert_eq!(first.recv().await, Some(EditorEvent::Focus));
        assert_eq!(hub.subscriber_count(), 1);

        drop(hub);
        assert_eq!(first.recv().await, None);
    }

    #[test]
    fn word_count_derivation_counts_page() {
        let page: Page = serde_json::from_value(json!({
            "id": 1,
            "uuid": "6500a1b2-0000-4000-8000-000000000001",
            "name": "p"
        }))
        .unwrap();
        let tree = vec![block(1, 1, "see https://example.com/a/b now")];
        let snapshot = Snapshot::capture(page, tree, None);
        assert_eq!(WordCountDerivation::default().derive(&snapshot), Some(3));
    }

    #[test]
    fn phase_display() {
        assert_eq!(TrackerPhase::Idle.to_string(), "idle");
        assert_eq!(
            TrackerPhase::Settled {
                page: "inbox".into()
            }
            .to_string(),
            "settled (inbox)"
        );
    }
}
