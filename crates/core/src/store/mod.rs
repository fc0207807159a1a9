//! State store: a thin, retrying wrapper over object-store primitives.
//!
//! The object store is the only shared mutable resource in the system;
//! everything above this module coordinates purely through it. The
//! [`ObjectStore`] trait is injected wherever storage is needed (never a
//! process-wide singleton) so tests swap in the in-memory fake from
//! [`crate::testing`].

mod retry;
mod s3;
mod traits;

pub use retry::{with_retry, RetryPolicy};
pub use s3::S3ObjectStore;
pub use traits::{KeyStream, ObjectStore, StoreError};
