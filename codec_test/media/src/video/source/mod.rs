//! Raw frame sources for codec tests.

pub mod square_clip;

pub use square_clip::SquareClip;

use super::frame::VideoFrame;
use crate::error::Result;

/// Finite supplier of raw frames
pub trait FrameSource {
    /// Produces the next frame of the clip.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::ClipExhausted` once every frame has been handed out.
    fn next_frame(&mut self) -> Result<VideoFrame>;

    /// Frames left before the clip is exhausted.
    fn remaining(&self) -> usize;
}
