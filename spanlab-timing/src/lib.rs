pub mod cancel;
pub mod scheduler;
pub mod timer;

pub use cancel::{CancellationToken, TokenSource};
pub use scheduler::{Fired, Scheduler, SchedulerStats, TimerId};
pub use timer::{HighPrecisionTimer, ManualTimer, Timer};
