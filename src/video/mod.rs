pub mod correct;
pub mod rotation;
pub mod source;

pub use correct::correct;
pub use rotation::{get_rotation, FfprobeReader, Rotation, RotationReader};
pub use source::{
    FrameSink, FrameSource, MediaBackend, OpenCvBackend, StreamInfo, VideoFileSink,
    VideoFileSource,
};
