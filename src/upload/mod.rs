mod compress;
mod orchestrator;
mod presign;
mod progress;
mod types;

pub use compress::ImageCompressor;
pub use orchestrator::{UploadBatch, UploadHandles, UploadOrchestrator};
pub use presign::PresignClient;
pub use progress::ProgressTracker;
pub use types::{
    FileStatus, PresignRequest, PresignedTarget, UploadProgressEntry, UploadProvider, UploadStatus,
};
