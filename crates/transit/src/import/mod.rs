//! Acquisition of the original file from local, remote and stream inputs.

mod local;
mod remote;
mod stream;

use std::path::Path;

use async_trait::async_trait;
use transit_core::{find_destination, sanitize_file_name, split_file_name, FileHandle, TransitResult};

pub use local::LocalImporter;
pub use remote::RemoteImporter;
pub use stream::StreamImporter;

/// Brings a file into the target directory.
#[async_trait]
pub trait Importer: Send {
    /// Input kind, for logs
    fn kind(&self) -> &'static str;

    /// Write the file below `dir` and return a handle to it.
    ///
    /// Failed imports leave nothing behind in `dir`.
    async fn import(&mut self, dir: &Path, overwrite: bool) -> TransitResult<FileHandle>;
}

/// Destination for a raw, client-supplied file name
pub(crate) fn destination_for(dir: &Path, raw_name: &str, overwrite: bool) -> std::path::PathBuf {
    let (name, ext) = split_file_name(&sanitize_file_name(raw_name));
    find_destination(dir, &name, &ext, overwrite)
}
