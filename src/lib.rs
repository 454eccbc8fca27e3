//! healerkit core: the content data layer behind the healer dungeon guide.
//!
//! Season -> dungeon -> boss encounter -> ability records live in the
//! [`catalog`] module (store, transactional season updates, read cache);
//! the [`analysis`] module derives healer-facing classification, priority,
//! and cooldown-planning data from those records. Display layers and
//! transport are collaborators that consume the value objects exposed
//! here; none of that lives in this crate.

pub mod analysis;
pub mod catalog;
pub mod cli;
