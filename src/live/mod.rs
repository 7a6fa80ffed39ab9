pub mod history;
pub mod sampler;
pub mod session;

pub use history::RollingHistoryBuffer;
pub use sampler::FrameSampler;
pub use session::{LiveOptions, LiveOutcome, LiveSession, Pacing, StopSignal};
