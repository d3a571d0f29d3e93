//! Synthetic clip of coloured squares moving over a flat background.

use super::FrameSource;
use crate::common::constants::timing::VIDEO_PAYLOAD_FREQUENCY;
use crate::error::{MediaError, Result};
use crate::video::constants::yuv::{U_PLANE_INDEX, V_PLANE_INDEX, Y_PLANE_INDEX};
use crate::video::frame::VideoFrame;
use crate::video::settings::CodecSettings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SQUARE_COUNT: usize = 10;
const MAX_SPEED: i32 = 4;

const BACKGROUND_Y: u8 = 64;
const BACKGROUND_CHROMA: u8 = 128;

#[derive(Debug, Clone)]
struct Square {
    x: i32,
    y: i32,
    size: i32,
    dx: i32,
    dy: i32,
    color: [u8; 3],
}

impl Square {
    fn random(rng: &mut StdRng, width: i32, height: i32) -> Self {
        let min_dim = width.min(height);
        let min_size = (min_dim / 8).max(1);
        let max_size = (min_dim / 4).max(min_size);
        let size = rng.random_range(min_size..=max_size);

        let mut velocity = || {
            let speed = rng.random_range(1..=MAX_SPEED);
            if rng.random_bool(0.5) { speed } else { -speed }
        };
        let dx = velocity();
        let dy = velocity();

        Square {
            x: rng.random_range(0..=width - size),
            y: rng.random_range(0..=height - size),
            size,
            dx,
            dy,
            color: [
                rng.random_range(16..=235),
                rng.random_range(16..=240),
                rng.random_range(16..=240),
            ],
        }
    }

    /// Advances one frame, bouncing off the picture edges.
    fn step(&mut self, width: i32, height: i32) {
        (self.x, self.dx) = bounce(self.x + self.dx, self.dx, width - self.size);
        (self.y, self.dy) = bounce(self.y + self.dy, self.dy, height - self.size);
    }

    fn draw(&self, frame: &mut VideoFrame) {
        let width = frame.width() as usize;
        let (x, y, size) = (self.x as usize, self.y as usize, self.size as usize);
        let chroma_width = width.div_ceil(2);

        let planes = frame.planes_mut();
        fill_rect(
            planes[Y_PLANE_INDEX].data_mut(),
            width,
            (x, y),
            (x + size, y + size),
            self.color[0],
        );

        let from = (x / 2, y / 2);
        let to = ((x + size).div_ceil(2), (y + size).div_ceil(2));
        for (index, value) in [(U_PLANE_INDEX, self.color[1]), (V_PLANE_INDEX, self.color[2])] {
            fill_rect(planes[index].data_mut(), chroma_width, from, to, value);
        }
    }
}

fn bounce(position: i32, velocity: i32, limit: i32) -> (i32, i32) {
    if position < 0 {
        (0, -velocity)
    } else if position > limit {
        (limit, -velocity)
    } else {
        (position, velocity)
    }
}

fn fill_rect(
    data: &mut [u8],
    stride: usize,
    (x0, y0): (usize, usize),
    (x1, y1): (usize, usize),
    value: u8,
) {
    let x1 = x1.min(stride);
    for row in data.chunks_exact_mut(stride).take(y1).skip(y0) {
        row[x0.min(x1)..x1].fill(value);
    }
}

/// Deterministic finite clip of moving squares
///
/// The same seed always yields the same sequence of frames. Timestamps
/// advance on the 90 kHz RTP clock by one frame interval per frame.
pub struct SquareClip {
    width: u32,
    height: u32,
    frame_count: usize,
    produced: usize,
    timestamp_step: u32,
    max_framerate: u32,
    squares: Vec<Square>,
}

impl SquareClip {
    /// Creates a clip of `frame_count` frames of `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Config` for a zero dimension or frame rate.
    pub fn new(
        width: u32,
        height: u32,
        frame_count: usize,
        max_framerate: u32,
        seed: u64,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MediaError::Config(format!(
                "Invalid clip resolution {}x{}",
                width, height
            )));
        }
        if max_framerate == 0 {
            return Err(MediaError::Config(
                "Clip frame rate must be positive".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let squares = (0..SQUARE_COUNT)
            .map(|_| Square::random(&mut rng, width as i32, height as i32))
            .collect();

        Ok(SquareClip {
            width,
            height,
            frame_count,
            produced: 0,
            timestamp_step: VIDEO_PAYLOAD_FREQUENCY / max_framerate,
            max_framerate,
            squares,
        })
    }

    /// Creates a clip sized to the resolution and frame rate of `settings`.
    pub fn for_settings(settings: &CodecSettings, frame_count: usize, seed: u64) -> Result<Self> {
        Self::new(
            settings.width,
            settings.height,
            frame_count,
            settings.max_framerate,
            seed,
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl FrameSource for SquareClip {
    fn next_frame(&mut self) -> Result<VideoFrame> {
        if self.produced >= self.frame_count {
            return Err(MediaError::ClipExhausted {
                frames: self.frame_count,
            });
        }

        let index = self.produced as u32;
        let mut frame = VideoFrame::filled(
            self.width,
            self.height,
            BACKGROUND_Y,
            BACKGROUND_CHROMA,
            BACKGROUND_CHROMA,
        )
        .with_timestamp(index.wrapping_mul(self.timestamp_step))
        .with_render_time_ms(index as i64 * 1000 / self.max_framerate as i64);

        for square in &mut self.squares {
            square.draw(&mut frame);
            square.step(self.width as i32, self.height as i32);
        }

        self.produced += 1;
        Ok(frame)
    }

    fn remaining(&self) -> usize {
        self.frame_count - self.produced
    }
}
