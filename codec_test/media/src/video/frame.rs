//! Raw video frame representation.
//!
//! [`VideoFrame`] is an immutable I420 picture: a full-resolution luma plane
//! and two chroma planes subsampled 2x2 (rounded up for odd dimensions).

use super::constants::yuv::*;
use crate::error::{MediaError, Result};

/// One tightly packed sample plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Plane {
    /// Wraps `data` as a `width` x `height` plane.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Processing` if `data` is not exactly
    /// `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        if data.len() != width * height {
            return Err(MediaError::Processing(format!(
                "Plane {}x{} needs {} bytes, got {}",
                width,
                height,
                width * height,
                data.len()
            )));
        }
        Ok(Plane {
            data,
            width,
            height,
        })
    }

    /// Creates a plane with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Plane {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns row `y` of the plane.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Raw I420 video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    planes: [Plane; PLANE_COUNT],
    width: u32,
    height: u32,
    /// RTP timestamp (90 kHz clock)
    timestamp: u32,
    render_time_ms: i64,
}

impl VideoFrame {
    /// Builds an I420 frame from its three planes.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::DimensionMismatch` if any plane does not match
    /// the size implied by `width` x `height`.
    pub fn from_planes(
        width: u32,
        height: u32,
        y: Plane,
        u: Plane,
        v: Plane,
        timestamp: u32,
    ) -> Result<Self> {
        let (chroma_width, chroma_height) = chroma_size(width, height);

        let luma_ok = y.width() == width as usize && y.height() == height as usize;
        let chroma_ok = [&u, &v]
            .iter()
            .all(|p| p.width() == chroma_width && p.height() == chroma_height);

        if !luma_ok {
            return Err(MediaError::DimensionMismatch {
                expected: (width, height),
                actual: (y.width() as u32, y.height() as u32),
            });
        }
        if !chroma_ok {
            let bad = if u.width() != chroma_width || u.height() != chroma_height {
                &u
            } else {
                &v
            };
            return Err(MediaError::DimensionMismatch {
                expected: (chroma_width as u32, chroma_height as u32),
                actual: (bad.width() as u32, bad.height() as u32),
            });
        }

        Ok(VideoFrame {
            planes: [y, u, v],
            width,
            height,
            timestamp,
            render_time_ms: 0,
        })
    }

    /// Creates a uniformly coloured frame.
    pub fn filled(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        let (chroma_width, chroma_height) = chroma_size(width, height);
        VideoFrame {
            planes: [
                Plane::filled(width as usize, height as usize, y),
                Plane::filled(chroma_width, chroma_height, u),
                Plane::filled(chroma_width, chroma_height, v),
            ],
            width,
            height,
            timestamp: 0,
            render_time_ms: 0,
        }
    }

    /// Returns a copy carrying a different RTP timestamp.
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns a copy carrying a render time.
    pub fn with_render_time_ms(mut self, render_time_ms: i64) -> Self {
        self.render_time_ms = render_time_ms;
        self
    }

    /// Returns frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RTP timestamp of the frame
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn render_time_ms(&self) -> i64 {
        self.render_time_ms
    }

    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    pub fn y(&self) -> &Plane {
        &self.planes[Y_PLANE_INDEX]
    }

    pub fn u(&self) -> &Plane {
        &self.planes[U_PLANE_INDEX]
    }

    pub fn v(&self) -> &Plane {
        &self.planes[V_PLANE_INDEX]
    }

    pub fn planes(&self) -> &[Plane; PLANE_COUNT] {
        &self.planes
    }

    /// Total number of samples across all planes.
    pub fn sample_count(&self) -> usize {
        self.planes.iter().map(|p| p.data().len()).sum()
    }

    pub(crate) fn planes_mut(&mut self) -> &mut [Plane; PLANE_COUNT] {
        &mut self.planes
    }
}

/// Chroma plane dimensions for an I420 picture of the given size.
pub fn chroma_size(width: u32, height: u32) -> (usize, usize) {
    (width.div_ceil(2) as usize, height.div_ceil(2) as usize)
}
