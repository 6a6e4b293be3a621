mod error;
mod key;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use key::{BlobKey, Bucket};
pub use filesystem::FilesystemBlobStore;
pub use traits::{BlobStore, BoxReader};
