//! Output module: everything that ends up on disk
//!
//! This module handles:
//! - Laying out a normalized page as a Markdown file with a provenance header
//! - Mapping canonical URLs to stable, collision-free file names
//! - Writing files atomically and skipping unchanged ones
//! - The run manifest and its printed summary

mod document;
mod manifest;
mod path;
mod summary;
mod writer;

pub use document::{display_title, strip_capture_timestamp, to_markdown};
pub use manifest::{FailedPage, ManifestWarning, RunManifest, RunStatus};
pub use path::{output_path, Allocation, PathAllocator};
pub use summary::print_summary;
pub use writer::{WriteOutcome, Writer};
