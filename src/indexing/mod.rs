//! Index Builder (§4.F): turns a scanned repository into committed store
//! rows, then keeps the store in sync as files change.

pub mod builder;
pub mod incremental;

pub use builder::{BuildReport, IndexBuilder};
pub use incremental::{ChangeKind, DetectedChange, IncrementalUpdater, UpdateReport};
