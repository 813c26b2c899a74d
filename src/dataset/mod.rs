//! Dataset output
//!
//! Screenshots and metadata for each captured workflow, the rendered markdown
//! guides, the app URL cache and whole-dataset summaries.

pub mod docs;
pub mod index;
pub mod url_cache;
pub mod writer;

pub use docs::{step_title, DocsGenerator};
pub use index::{DatasetIndex, DatasetSummary, WorkflowEntry};
pub use url_cache::UrlCache;
pub use writer::{CapturedState, DatasetWriter, WorkflowMetadata};
