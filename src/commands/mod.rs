pub mod dispatcher;
pub mod frame;
pub mod timer;

pub use dispatcher::Dispatcher;
pub use frame::{parse_duration, parse_frame, PulseCommand};
pub use timer::{OverlapPolicy, Release, ReleaseTimers};
