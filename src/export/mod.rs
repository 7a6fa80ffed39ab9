pub mod sequence;

pub use sequence::{FrameSequence, FrameSequenceReader, FrameSequenceWriter, FORMAT_VERSION};
