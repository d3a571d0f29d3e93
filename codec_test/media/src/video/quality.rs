//! Peak signal-to-noise ratio between I420 pictures.
//!
//! The whole-frame figure pools the squared error of all three planes and
//! divides by the total sample count, so luma and each chroma plane
//! contribute in proportion to their size (4:1:1 for I420).

use super::constants::quality::MAX_PSNR_DB;
use super::constants::yuv::{MAX_SAMPLE_VALUE, PLANE_COUNT};
use super::frame::{Plane, VideoFrame};
use crate::error::{MediaError, Result};

/// Per-plane and aggregate PSNR of a reconstructed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsnrReport {
    /// Aggregate PSNR (dB)
    pub psnr: f64,
    /// PSNR of Y, U and V (dB)
    pub per_plane: [f64; PLANE_COUNT],
    /// Aggregate mean squared error
    pub mse: f64,
}

fn sum_squared_error(a: &Plane, b: &Plane) -> u64 {
    a.data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| {
            let diff = x as i32 - y as i32;
            (diff * diff) as u64
        })
        .sum()
}

fn sse_to_psnr(sse: u64, samples: usize) -> f64 {
    if sse == 0 || samples == 0 {
        return MAX_PSNR_DB;
    }
    let mse = sse as f64 / samples as f64;
    let psnr = 10.0 * (MAX_SAMPLE_VALUE * MAX_SAMPLE_VALUE / mse).log10();
    psnr.min(MAX_PSNR_DB)
}

fn check_dimensions(reference: &VideoFrame, distorted: &VideoFrame) -> Result<()> {
    if reference.width() != distorted.width() || reference.height() != distorted.height() {
        return Err(MediaError::DimensionMismatch {
            expected: (reference.width(), reference.height()),
            actual: (distorted.width(), distorted.height()),
        });
    }
    Ok(())
}

/// Whole-frame PSNR of `distorted` against `reference`.
///
/// Identical frames yield 128 dB.
///
/// # Errors
///
/// Returns `MediaError::DimensionMismatch` if the frames differ in size.
pub fn i420_psnr(reference: &VideoFrame, distorted: &VideoFrame) -> Result<f64> {
    Ok(psnr_report(reference, distorted)?.psnr)
}

/// PSNR of a single plane (0 = Y, 1 = U, 2 = V).
pub fn plane_psnr(reference: &VideoFrame, distorted: &VideoFrame, plane: usize) -> Result<f64> {
    check_dimensions(reference, distorted)?;
    if plane >= PLANE_COUNT {
        return Err(MediaError::Processing(format!(
            "Plane index {} out of range",
            plane
        )));
    }
    let a = reference.plane(plane);
    let b = distorted.plane(plane);
    Ok(sse_to_psnr(sum_squared_error(a, b), a.data().len()))
}

/// Per-plane and aggregate PSNR in one pass.
pub fn psnr_report(reference: &VideoFrame, distorted: &VideoFrame) -> Result<PsnrReport> {
    check_dimensions(reference, distorted)?;

    let mut per_plane = [0.0; PLANE_COUNT];
    let mut total_sse = 0u64;
    let mut total_samples = 0usize;

    for (index, (a, b)) in reference
        .planes()
        .iter()
        .zip(distorted.planes())
        .enumerate()
    {
        let sse = sum_squared_error(a, b);
        let samples = a.data().len();
        per_plane[index] = sse_to_psnr(sse, samples);
        total_sse += sse;
        total_samples += samples;
    }

    let mse = if total_samples == 0 {
        0.0
    } else {
        total_sse as f64 / total_samples as f64
    };

    Ok(PsnrReport {
        psnr: sse_to_psnr(total_sse, total_samples),
        per_plane,
        mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_frames_hit_cap() {
        let frame = VideoFrame::filled(16, 16, 100, 120, 140);
        assert_eq!(i420_psnr(&frame, &frame).unwrap(), MAX_PSNR_DB);
    }

    #[test]
    fn test_uniform_error_of_one() {
        let a = VideoFrame::filled(16, 16, 100, 100, 100);
        let b = VideoFrame::filled(16, 16, 101, 101, 101);

        // MSE = 1 -> 20 * log10(255)
        let expected = 20.0 * 255f64.log10();
        assert!((i420_psnr(&a, &b).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_chroma_weighted_by_sample_count() {
        let a = VideoFrame::filled(16, 16, 50, 50, 50);
        // Only luma differs, by 2: SSE = 256 * 4, samples = 384
        let b = VideoFrame::filled(16, 16, 52, 50, 50);
        let report = psnr_report(&a, &b).unwrap();

        let mse: f64 = 256.0 * 4.0 / 384.0;
        let expected = 10.0 * (255.0 * 255.0 / mse).log10();
        assert!((report.psnr - expected).abs() < 1e-9);
        assert!((report.mse - mse).abs() < 1e-12);
        assert_eq!(report.per_plane[1], MAX_PSNR_DB);
        assert!(report.per_plane[0] < report.psnr);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = VideoFrame::filled(16, 16, 0, 0, 0);
        let b = VideoFrame::filled(32, 16, 0, 0, 0);

        assert!(matches!(
            i420_psnr(&a, &b),
            Err(MediaError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_plane_psnr_index_out_of_range() {
        let a = VideoFrame::filled(4, 4, 0, 0, 0);
        assert!(plane_psnr(&a, &a, 3).is_err());
        assert_eq!(plane_psnr(&a, &a, 0).unwrap(), MAX_PSNR_DB);
    }
}
