//! Matrix-provider layer: grayscale planes, decoding, padding, convolution.
//!
//! Every transform backend works on a grayscale `Array2<f32>` plane with
//! intensities in [0, 255]. This module materializes that plane from an
//! in-memory [`ImageSource`], and supplies the primitive 2D-array operations
//! the backends share: zero padding, cropping, periodic convolution, and
//! display normalization.

pub mod fourier;

use ndarray::Array2;

use crate::error::{EngineError, EngineResult};

/// In-memory image source fed to the pipeline.
///
/// File decoding is a collaborator concern; callers hand the engine raw pixel
/// buffers (or an already-built matrix) instead.
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Single-channel 8-bit pixels, row-major.
    Luma8 {
        pixels: Vec<u8>,
        width: usize,
        height: usize,
    },
    /// Interleaved RGB 8-bit pixels, row-major.
    Rgb8 {
        pixels: Vec<u8>,
        width: usize,
        height: usize,
    },
    /// A prebuilt grayscale plane, intensities in [0, 255].
    Matrix(Array2<f32>),
}

/// Decode an image source into a grayscale plane with intensities in [0, 255].
///
/// RGB input is converted with BT.601 luma weights, matching the grayscale
/// conversion the original display pipeline used.
///
/// # Errors
///
/// Returns [`EngineError::Decode`] when the buffer length does not match the
/// declared dimensions, and [`EngineError::InvalidDimensions`] when either
/// dimension is zero.
pub fn decode(source: &ImageSource) -> EngineResult<Array2<f32>> {
    match source {
        ImageSource::Luma8 {
            pixels,
            width,
            height,
        } => {
            check_dims(*width, *height)?;
            if pixels.len() != width * height {
                return Err(EngineError::decode(format!(
                    "luma buffer length {} does not match {}x{}",
                    pixels.len(),
                    width,
                    height
                )));
            }
            let data: Vec<f32> = pixels.iter().map(|&p| f32::from(p)).collect();
            Array2::from_shape_vec((*height, *width), data)
                .map_err(|err| EngineError::decode(err.to_string()))
        }
        ImageSource::Rgb8 {
            pixels,
            width,
            height,
        } => {
            check_dims(*width, *height)?;
            if pixels.len() != width * height * 3 {
                return Err(EngineError::decode(format!(
                    "rgb buffer length {} does not match {}x{}x3",
                    pixels.len(),
                    width,
                    height
                )));
            }
            let data: Vec<f32> = pixels
                .chunks_exact(3)
                .map(|px| {
                    0.299 * f32::from(px[0]) + 0.587 * f32::from(px[1]) + 0.114 * f32::from(px[2])
                })
                .collect();
            Array2::from_shape_vec((*height, *width), data)
                .map_err(|err| EngineError::decode(err.to_string()))
        }
        ImageSource::Matrix(mat) => {
            let (h, w) = mat.dim();
            check_dims(w, h)?;
            Ok(mat.clone())
        }
    }
}

fn check_dims(width: usize, height: usize) -> EngineResult<()> {
    if width == 0 || height == 0 {
        return Err(EngineError::invalid_dimensions(
            width,
            height,
            "grayscale decode",
        ));
    }
    Ok(())
}

/// Smallest power of two >= `n`.
pub fn next_power_of_two(n: usize) -> usize {
    n.next_power_of_two().max(1)
}

/// Zero-pad a plane to `(rows, cols)`, anchored at the top-left corner.
pub fn pad_to(plane: &Array2<f32>, rows: usize, cols: usize) -> Array2<f32> {
    let (h, w) = plane.dim();
    debug_assert!(rows >= h && cols >= w);
    let mut out = Array2::zeros((rows, cols));
    for i in 0..h {
        for j in 0..w {
            out[[i, j]] = plane[[i, j]];
        }
    }
    out
}

/// Crop the top-left `(rows, cols)` region of a plane.
pub fn crop(plane: &Array2<f32>, rows: usize, cols: usize) -> Array2<f32> {
    let (h, w) = plane.dim();
    let rows = rows.min(h);
    let cols = cols.min(w);
    let mut out = Array2::zeros((rows, cols));
    for i in 0..rows {
        for j in 0..cols {
            out[[i, j]] = plane[[i, j]];
        }
    }
    out
}

/// Convolve a plane with an odd-sized kernel under circular (periodic)
/// boundary handling.
pub fn convolve_periodic(plane: &Array2<f32>, kernel: &Array2<f32>) -> Array2<f32> {
    let (h, w) = plane.dim();
    let (kh, kw) = kernel.dim();
    debug_assert!(kh % 2 == 1 && kw % 2 == 1, "kernel must be odd-sized");
    let (ch, cw) = (kh / 2, kw / 2);

    let mut out = Array2::zeros((h, w));
    for i in 0..h {
        for j in 0..w {
            let mut acc = 0.0f32;
            for ki in 0..kh {
                let si = (i + h + ki - ch) % h;
                for kj in 0..kw {
                    let sj = (j + w + kj - cw) % w;
                    acc += plane[[si, sj]] * kernel[[ki, kj]];
                }
            }
            out[[i, j]] = acc;
        }
    }
    out
}

/// Min-max normalize a plane to the full 8-bit display range.
///
/// A constant plane maps to all zeros.
pub fn normalize_to_display(plane: &Array2<f32>) -> Array2<u8> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in plane.iter() {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    let range = max - min;
    let (h, w) = plane.dim();
    let mut out = Array2::zeros((h, w));
    if !range.is_finite() || range <= f32::EPSILON {
        return out;
    }
    for i in 0..h {
        for j in 0..w {
            let v = plane[[i, j]];
            let scaled = if v.is_finite() {
                (v - min) / range * 255.0
            } else {
                0.0
            };
            out[[i, j]] = scaled.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Render a log-scaled view of non-negative magnitude data:
/// `log(1 + |v|)` followed by min-max display normalization.
pub fn log_display(plane: &Array2<f32>) -> Array2<u8> {
    let logged = plane.mapv(|v| (1.0 + v.abs()).ln());
    normalize_to_display(&logged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_luma() {
        let source = ImageSource::Luma8 {
            pixels: vec![0, 64, 128, 255],
            width: 2,
            height: 2,
        };
        let gray = decode(&source).unwrap();
        assert_eq!(gray.dim(), (2, 2));
        assert_eq!(gray[[0, 0]], 0.0);
        assert_eq!(gray[[1, 1]], 255.0);
    }

    #[test]
    fn test_decode_rgb_luma_weights() {
        let source = ImageSource::Rgb8 {
            pixels: vec![255, 0, 0, 0, 255, 0],
            width: 2,
            height: 1,
        };
        let gray = decode(&source).unwrap();
        assert!((gray[[0, 0]] - 0.299 * 255.0).abs() < 1e-3);
        assert!((gray[[0, 1]] - 0.587 * 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_rejects_wrong_buffer_length() {
        let source = ImageSource::Luma8 {
            pixels: vec![1, 2, 3],
            width: 2,
            height: 2,
        };
        assert!(matches!(
            decode(&source),
            Err(EngineError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_zero_dimension() {
        let source = ImageSource::Luma8 {
            pixels: vec![],
            width: 0,
            height: 4,
        };
        assert!(matches!(
            decode(&source),
            Err(EngineError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_pad_and_crop_roundtrip() {
        let plane = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let padded = pad_to(&plane, 4, 4);
        assert_eq!(padded.dim(), (4, 4));
        assert_eq!(padded[[1, 2]], 6.0);
        assert_eq!(padded[[3, 3]], 0.0);
        let cropped = crop(&padded, 2, 3);
        assert_eq!(cropped, plane);
    }

    #[test]
    fn test_convolve_identity_kernel() {
        let plane = Array2::from_shape_vec((3, 3), (1..=9).map(|v| v as f32).collect()).unwrap();
        let mut kernel = Array2::zeros((3, 3));
        kernel[[1, 1]] = 1.0;
        let out = convolve_periodic(&plane, &kernel);
        assert_eq!(out, plane);
    }

    #[test]
    fn test_normalize_constant_plane() {
        let plane = Array2::from_elem((2, 2), 7.0);
        let display = normalize_to_display(&plane);
        assert!(display.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_normalize_full_range() {
        let plane = Array2::from_shape_vec((1, 3), vec![0.0, 5.0, 10.0]).unwrap();
        let display = normalize_to_display(&plane);
        assert_eq!(display[[0, 0]], 0);
        assert_eq!(display[[0, 1]], 128);
        assert_eq!(display[[0, 2]], 255);
    }
}
