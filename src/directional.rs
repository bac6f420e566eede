//! Experimental directional filter bank.
//!
//! Splits a grayscale plane into a Gaussian low-pass residual and six
//! oriented responses (0° to 150° in 30° steps) computed by convolving the
//! high-pass residual with fixed 3x3 oriented ridge kernels. The inverse is a
//! plain pixel-wise sum of the responses plus the low-pass band: a lossy,
//! non-orthogonal approximation, not a true oriented dual-tree synthesis.

use ndarray::Array2;

use crate::matrix::convolve_periodic;
use crate::wavelet::packet::{apply_threshold, energy_of, ThresholdMode};

/// Orientation angles of the bank, in degrees.
pub const DIRECTION_ANGLES: [f32; 6] = [0.0, 30.0, 60.0, 90.0, 120.0, 150.0];

/// One oriented response band.
#[derive(Clone, Debug)]
pub struct DirectionBand {
    pub id: usize,
    pub label: String,
    pub angle_degrees: f32,
    pub data: Vec<f32>,
}

/// Decomposition output: six oriented bands plus the low-pass residual.
#[derive(Clone, Debug)]
pub struct DirectionalDecomposition {
    pub directions: Vec<DirectionBand>,
    pub lowpass: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

/// 5x5 binomial approximation of a Gaussian low-pass.
fn gaussian_kernel() -> Array2<f32> {
    let weights = [1.0f32, 4.0, 6.0, 4.0, 1.0];
    let mut kernel = Array2::zeros((5, 5));
    for i in 0..5 {
        for j in 0..5 {
            kernel[[i, j]] = weights[i] * weights[j] / 256.0;
        }
    }
    kernel
}

/// 3x3 oriented ridge kernel: a sampled second-derivative profile across the
/// line direction, zero-meaned so flat regions give no response.
fn oriented_kernel(angle_degrees: f32) -> Array2<f32> {
    let theta = angle_degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let mut kernel = Array2::zeros((3, 3));
    for i in 0..3 {
        for j in 0..3 {
            let dy = i as f32 - 1.0;
            let dx = j as f32 - 1.0;
            // Signed distance across the oriented line through the center.
            let v = dy * cos - dx * sin;
            kernel[[i, j]] = (1.0 - 2.0 * v * v) * (-v * v).exp();
        }
    }
    let mean = kernel.iter().sum::<f32>() / 9.0;
    kernel.mapv(|x| x - mean)
}

/// Decompose a grayscale plane into oriented bands plus a low-pass residual.
pub fn analyze(gray: &Array2<f32>) -> DirectionalDecomposition {
    let (height, width) = gray.dim();
    let lowpass = convolve_periodic(gray, &gaussian_kernel());
    let highpass = gray - &lowpass;

    let directions = DIRECTION_ANGLES
        .iter()
        .enumerate()
        .map(|(id, &angle)| {
            let response = convolve_periodic(&highpass, &oriented_kernel(angle));
            DirectionBand {
                id,
                label: format!("{}deg", angle as i32),
                angle_degrees: angle,
                data: response.into_raw_vec(),
            }
        })
        .collect();

    DirectionalDecomposition {
        directions,
        lowpass: lowpass.into_raw_vec(),
        width,
        height,
    }
}

/// Approximate inverse: pixel-wise sum of every direction response plus the
/// low-pass residual. Lossy by construction.
///
/// # Panics
///
/// Every buffer must cover the full `width * height` plane, as produced by
/// [`analyze`]. Panics on a mismatched low-pass or band buffer.
pub fn synthesize(directions: &[DirectionBand], lowpass: &[f32], width: usize, height: usize) -> Array2<f32> {
    assert_eq!(
        lowpass.len(),
        width * height,
        "low-pass buffer must match the plane size"
    );
    let mut out = lowpass.to_vec();
    for band in directions {
        assert_eq!(
            band.data.len(),
            width * height,
            "band {} buffer must match the plane size",
            band.label
        );
        for (acc, &v) in out.iter_mut().zip(band.data.iter()) {
            *acc += v;
        }
    }
    Array2::from_shape_vec((height, width), out).expect("band buffers share the plane size")
}

/// Zero unselected direction responses (an empty selection keeps all) and
/// optionally threshold the retained ones, sign-preserving.
pub fn filter_directions(
    directions: &[DirectionBand],
    selected: &[usize],
    threshold: Option<(ThresholdMode, f32)>,
) -> Vec<DirectionBand> {
    directions
        .iter()
        .map(|band| {
            let keep = selected.is_empty() || selected.contains(&band.id);
            let mut data = if keep {
                band.data.clone()
            } else {
                vec![0.0; band.data.len()]
            };
            if keep {
                if let Some((mode, lambda)) = threshold {
                    apply_threshold(&mut data, mode, lambda);
                }
            }
            DirectionBand {
                data,
                ..band.clone()
            }
        })
        .collect()
}

/// Energy per direction band (sum of squares of the raw responses).
pub fn direction_energies(directions: &[DirectionBand]) -> Vec<(String, f64)> {
    directions
        .iter()
        .map(|band| (band.label.clone(), energy_of(&band.data)))
        .collect()
}
