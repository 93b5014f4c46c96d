//! Destinations a pipeline pushes into
//!
//! - [`JsonFileSink`] writes timestamped snapshot files under a data root
//! - [`UploadClient`] sends a snapshot file to the website's upload endpoint

mod file;
mod upload;

pub use file::JsonFileSink;
pub use upload::UploadClient;
