//! Services that keep image handling and progress display out of the
//! submission flow itself.

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::ImagePreparer;
pub use progress::{
    time_taken_label, ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTicker,
};
