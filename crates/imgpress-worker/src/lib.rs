//! Image registry and compression workflow coordinator
//!
//! [`ImageCoordinator`] owns the ordered list of images and the "is processing"
//! flag, and drives each image through `idle → compressing → done | error`
//! one at a time.

pub mod coordinator;
pub mod registry;

pub use coordinator::{BatchSummary, ImageCoordinator, IngestReport, RejectedFile};
pub use registry::ImageRegistry;
