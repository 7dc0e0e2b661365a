pub mod frame;

pub use frame::{frame_stream, AudioFrameBuffer, Frame, FrameStream, DEFAULT_FRAME_SIZE};
