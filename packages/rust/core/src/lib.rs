//! Ancestry resolution, breadcrumbs, and the content trackers for blockpath.
//!
//! This crate ties the content model, the text flattener, and the host API
//! together: snapshots are fetched through [`blockpath_host::EditorApi`],
//! resolved and flattened, and published to display surfaces by
//! [`tracker::ContentTracker`].

pub mod ancestry;
pub mod breadcrumb;
pub mod fetch;
pub mod tracker;

#[cfg(test)]
mod fake;

pub use ancestry::{AncestorChain, find_block, resolve_ancestors};
pub use breadcrumb::{Breadcrumbs, Crumb, CrumbTarget};
pub use fetch::{
    FetchTarget, fetch_block_snapshot, fetch_focus_snapshot, fetch_page_snapshot, fetch_snapshot,
};
pub use tracker::{
    BreadcrumbDerivation, ChannelSurface, ContentTracker, Derivation, DisplaySurface, EditorEvent,
    EventHub, SurfaceUpdate, TrackerPhase, WordCountDerivation, channel_surface,
};
