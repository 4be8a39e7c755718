//! Read side of the realtime tree: reserved-member stripping and the
//! department/document/subject accessors.

pub mod sanitize;
pub mod snapshot;

pub use sanitize::{sanitized, strip_reserved};
pub use snapshot::Snapshot;
