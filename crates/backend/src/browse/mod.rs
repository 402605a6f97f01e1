//! Browsing state layered over the services.
//!
//! - [`file_set`] - A query bound to a service with rows cached by index
//! - [`selection`] - Selected index ranges across file sets
//! - [`window`] - Lazy loading for scrolling lists
//! - [`file_ids`] - Cancellable background fetch of every matching file id
//! - [`hierarchy`] - Folder grouping by annotation values

pub mod file_ids;
pub mod file_set;
pub mod hierarchy;
pub mod selection;
pub mod window;

pub use file_ids::{FetchOutcome, FetchProgress, FileIdFetch, FileIdFetcher};
pub use file_set::{FileSet, PageParameters};
pub use hierarchy::{AnnotationHierarchy, FolderNode};
pub use selection::{FileSelection, FocusedItem};
pub use window::{WindowedFetcher, visible_window};
