//! Copy-on-write spatial index of fort ids.
//!
//! [`SpatialTree`] is a persistent treap over `(lon, lat, id)` whose nodes carry the
//! bounding box of their subtree, so box searches prune whole branches and can stop
//! early. [`FortIndex`] wraps one tree behind a reader/writer lock and hands out
//! snapshots.

mod error;
mod index;
mod tree;

pub use error::Result;
pub use error::SpatialError;
pub use index::FortIndex;
pub use tree::BoundingBox;
pub use tree::SpatialTree;
