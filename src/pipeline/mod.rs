//! File managers and manifest generation driving the compile pipeline.

pub mod excel_manager;
pub mod include_manager;
pub mod meta;
pub mod progress;

pub use excel_manager::{ExcelFileManager, ExcelManagerOptions};
pub use include_manager::IncludeFileManager;
pub use meta::{MetaCalculator, META_SRC_FILE};
pub use progress::{ProgressEvent, ProgressReceiver, ProgressSender};
