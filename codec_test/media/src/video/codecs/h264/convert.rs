//! Copies between [`VideoFrame`] planes and FFmpeg frames.
//!
//! FFmpeg pads each line to its own stride, so planes are copied row by row.

use crate::error::{MediaError, Result};
use crate::video::constants::yuv::PLANE_COUNT;
use crate::video::frame::{Plane, VideoFrame, chroma_size};
use ffmpeg_next as ffmpeg;

/// Builds a YUV420P FFmpeg frame holding a copy of `frame`.
pub(crate) fn to_ffmpeg_frame(frame: &VideoFrame) -> ffmpeg::frame::Video {
    let mut yuv =
        ffmpeg::frame::Video::new(ffmpeg::format::Pixel::YUV420P, frame.width(), frame.height());

    for index in 0..PLANE_COUNT {
        let plane = frame.plane(index);
        let stride = yuv.stride(index);
        let data = yuv.data_mut(index);
        for y in 0..plane.height() {
            let start = y * stride;
            data[start..start + plane.width()].copy_from_slice(plane.row(y));
        }
    }
    yuv
}

/// Copies a decoded YUV420P FFmpeg frame into a [`VideoFrame`].
pub(crate) fn from_ffmpeg_frame(decoded: &ffmpeg::frame::Video, timestamp: u32) -> Result<VideoFrame> {
    if decoded.format() != ffmpeg::format::Pixel::YUV420P {
        return Err(MediaError::Codec(format!(
            "Unsupported decoded pixel format {:?}",
            decoded.format()
        )));
    }

    let (width, height) = (decoded.width(), decoded.height());
    let (chroma_width, chroma_height) = chroma_size(width, height);
    let dims = [
        (width as usize, height as usize),
        (chroma_width, chroma_height),
        (chroma_width, chroma_height),
    ];

    let mut planes = Vec::with_capacity(PLANE_COUNT);
    for (index, &(plane_width, plane_height)) in dims.iter().enumerate() {
        let stride = decoded.stride(index);
        let data = decoded.data(index);
        let mut samples = Vec::with_capacity(plane_width * plane_height);
        for y in 0..plane_height {
            let start = y * stride;
            let row = data.get(start..start + plane_width).ok_or_else(|| {
                MediaError::Codec(format!("Decoded plane {} is truncated", index))
            })?;
            samples.extend_from_slice(row);
        }
        planes.push(Plane::new(samples, plane_width, plane_height)?);
    }

    let mut planes = planes.into_iter();
    match (planes.next(), planes.next(), planes.next()) {
        (Some(y), Some(u), Some(v)) => VideoFrame::from_planes(width, height, y, u, v, timestamp),
        _ => Err(MediaError::Codec("Decoded frame is missing planes".to_string())),
    }
}
