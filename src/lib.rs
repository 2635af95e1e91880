pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod files;
pub mod preview;
pub mod selection;
pub mod upload;
pub mod utils;

pub use app::DropzoneApp;
pub use config::WidgetConfig;
pub use error::{Result, UploaderError};
pub use events::{EventSink, UploaderEvent};
pub use files::ManagedFile;
