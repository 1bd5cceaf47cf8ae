//! Cart synchronization core.
//!
//! # Architecture
//!
//! The gateway is the single authoritative cart. The local pipeline is:
//!
//! ```text
//! gateway payload -> projection -> store -> UI
//! user action -> sequencer -> gateway -> (refetch) -> projection -> store
//! ```
//!
//! - [`projection`] - pure payload-to-snapshot mapping
//! - [`store`] - the one place the current snapshot lives, persisted in the
//!   session and replaced wholesale on every successful refetch
//! - [`sequencer`] - refetch-after-write mutation orchestration
//!
//! There is no optimistic data mutation anywhere: the displayed cart never
//! changes until a refetch lands, only the loading flag does. Every write to
//! the store is a full replacement, which is what makes read-modify-write
//! races impossible without locking.

pub mod projection;
pub mod sequencer;
pub mod store;
pub mod types;

pub use projection::{CartProjection, project_cart};
pub use sequencer::{CartSequencer, SequencerError};
pub use store::{CartStorage, CartStore, SessionCartStorage, StorageError};
pub use types::{CartLine, CartSnapshot};
