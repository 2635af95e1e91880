mod accept;
mod blob;
mod normalizer;
mod types;

pub use accept::AcceptPattern;
pub use blob::{chunked, BlobSource, BlobStore, ContentStream};
pub use normalizer::Normalizer;
pub(crate) use normalizer::report_rejection;
pub use types::{ManagedFile, RawBody, RawItem};
