//! Orthogonal wavelet kernels: periodic 1D analysis/synthesis and the 2D
//! multi-level DWT over a flat row-major coefficient plane.
//!
//! The forward 1D pass is convolution-decimation with circular indexing; the
//! inverse is the transpose pass (upsample-convolve-accumulate with the same
//! filters, which is exact for orthonormal banks). The 2D transform runs a
//! row pass then a column pass per level, recursing into the LL quadrant, so
//! a level-`n` plane is laid out as nested quadrants with the coarsest LL in
//! the top-left corner.

pub mod packet;

use serde::{Deserialize, Serialize};

/// Supported wavelet families.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveletKind {
    Haar,
    Db2,
}

const HAAR_LO: [f32; 2] = [std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2];
const HAAR_HI: [f32; 2] = [std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2];

// Daubechies-4 scaling coefficients; the high-pass bank is the alternating
// flip h[k] = (-1)^k g[3-k].
const DB2_LO: [f32; 4] = [
    0.482_962_91,
    0.836_516_3,
    0.224_143_87,
    -0.129_409_52,
];
const DB2_HI: [f32; 4] = [
    -0.129_409_52,
    -0.224_143_87,
    0.836_516_3,
    -0.482_962_91,
];

impl WaveletKind {
    /// Resolve a wavelet identifier. Unknown identifiers fall back to Haar.
    pub fn from_id(id: &str) -> Self {
        match id {
            "db2" => WaveletKind::Db2,
            _ => WaveletKind::Haar,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            WaveletKind::Haar => "haar",
            WaveletKind::Db2 => "db2",
        }
    }

    fn filters(&self) -> (&'static [f32], &'static [f32]) {
        match self {
            WaveletKind::Haar => (&HAAR_LO, &HAAR_HI),
            WaveletKind::Db2 => (&DB2_LO, &DB2_HI),
        }
    }
}

/// Periodic convolution-decimation of an even-length signal into
/// approximation and detail halves of length `n/2`.
pub fn decompose_1d(signal: &[f32], kind: WaveletKind, approx: &mut [f32], detail: &mut [f32]) {
    let n = signal.len();
    debug_assert!(n >= 2 && n % 2 == 0, "signal length must be even");
    debug_assert_eq!(approx.len(), n / 2);
    debug_assert_eq!(detail.len(), n / 2);

    let (lo, hi) = kind.filters();
    for i in 0..n / 2 {
        let mut a = 0.0f32;
        let mut d = 0.0f32;
        for (k, (&l, &h)) in lo.iter().zip(hi.iter()).enumerate() {
            let idx = (2 * i + k) % n;
            a += l * signal[idx];
            d += h * signal[idx];
        }
        approx[i] = a;
        detail[i] = d;
    }
}

/// Transpose synthesis: upsample-convolve-accumulate of the approximation and
/// detail halves back into a length-`n` signal, circular boundary.
pub fn reconstruct_1d(approx: &[f32], detail: &[f32], kind: WaveletKind, output: &mut [f32]) {
    let n = output.len();
    debug_assert_eq!(approx.len(), n / 2);
    debug_assert_eq!(detail.len(), n / 2);

    let (lo, hi) = kind.filters();
    output.fill(0.0);
    for i in 0..n / 2 {
        for (k, (&l, &h)) in lo.iter().zip(hi.iter()).enumerate() {
            let idx = (2 * i + k) % n;
            output[idx] += l * approx[i] + h * detail[i];
        }
    }
}

/// Smallest multiple of `2^levels` that is >= `n`.
pub fn padded_extent(n: usize, levels: u32) -> usize {
    let block = 1usize << levels;
    n.div_ceil(block) * block
}

/// Clamp a requested decomposition depth to what the plane supports: at most
/// `floor(log2(min(width, height)))`, never below 1. Clamping before padding
/// keeps the padded extent proportionate to the image instead of inflating a
/// tiny plane to a huge power-of-two block.
pub fn clamp_levels(width: usize, height: usize, requested: u32) -> u32 {
    let min_dim = width.min(height).max(1);
    let cap = (usize::BITS - 1 - min_dim.leading_zeros()).max(1);
    requested.clamp(1, cap)
}

/// Multi-level forward 2D DWT over a flat row-major `width x height` buffer.
/// Dimensions must be multiples of `2^levels`.
pub fn dwt2d_forward(data: &mut [f32], width: usize, height: usize, levels: u32, kind: WaveletKind) {
    debug_assert_eq!(data.len(), width * height);
    let mut cur_w = width;
    let mut cur_h = height;
    for _ in 0..levels {
        transform_region(data, width, cur_w, cur_h, kind, Pass::Forward);
        cur_w /= 2;
        cur_h /= 2;
    }
}

/// Multi-level inverse 2D DWT, undoing levels from coarsest to finest.
pub fn dwt2d_inverse(data: &mut [f32], width: usize, height: usize, levels: u32, kind: WaveletKind) {
    debug_assert_eq!(data.len(), width * height);
    for level in (0..levels).rev() {
        let cur_w = width >> level;
        let cur_h = height >> level;
        transform_region(data, width, cur_w, cur_h, kind, Pass::Inverse);
    }
}

/// One analysis level over a standalone even-sized buffer, leaving the four
/// quadrants in place (LL top-left, HL top-right, LH bottom-left, HH
/// bottom-right). Used by the wavelet-packet tree, which recurses into every
/// quadrant instead of only LL.
pub(crate) fn single_level_forward(data: &mut [f32], width: usize, height: usize, kind: WaveletKind) {
    transform_region(data, width, width, height, kind, Pass::Forward);
}

/// Inverse of [`single_level_forward`].
pub(crate) fn single_level_inverse(data: &mut [f32], width: usize, height: usize, kind: WaveletKind) {
    transform_region(data, width, width, height, kind, Pass::Inverse);
}

#[derive(Clone, Copy)]
enum Pass {
    Forward,
    Inverse,
}

/// One analysis or synthesis level over the top-left `cur_w x cur_h` region
/// of a plane with row stride `stride`: row pass then column pass (reversed
/// for synthesis).
fn transform_region(
    data: &mut [f32],
    stride: usize,
    cur_w: usize,
    cur_h: usize,
    kind: WaveletKind,
    pass: Pass,
) {
    match pass {
        Pass::Forward => {
            rows_pass(data, stride, cur_w, cur_h, kind, pass);
            cols_pass(data, stride, cur_w, cur_h, kind, pass);
        }
        Pass::Inverse => {
            cols_pass(data, stride, cur_w, cur_h, kind, pass);
            rows_pass(data, stride, cur_w, cur_h, kind, pass);
        }
    }
}

fn rows_pass(
    data: &mut [f32],
    stride: usize,
    cur_w: usize,
    cur_h: usize,
    kind: WaveletKind,
    pass: Pass,
) {
    let half = cur_w / 2;
    let mut line = vec![0.0f32; cur_w];
    let mut approx = vec![0.0f32; half];
    let mut detail = vec![0.0f32; half];
    for r in 0..cur_h {
        let base = r * stride;
        match pass {
            Pass::Forward => {
                line.copy_from_slice(&data[base..base + cur_w]);
                decompose_1d(&line, kind, &mut approx, &mut detail);
                data[base..base + half].copy_from_slice(&approx);
                data[base + half..base + cur_w].copy_from_slice(&detail);
            }
            Pass::Inverse => {
                approx.copy_from_slice(&data[base..base + half]);
                detail.copy_from_slice(&data[base + half..base + cur_w]);
                reconstruct_1d(&approx, &detail, kind, &mut line);
                data[base..base + cur_w].copy_from_slice(&line);
            }
        }
    }
}

fn cols_pass(
    data: &mut [f32],
    stride: usize,
    cur_w: usize,
    cur_h: usize,
    kind: WaveletKind,
    pass: Pass,
) {
    let half = cur_h / 2;
    let mut col = vec![0.0f32; cur_h];
    let mut approx = vec![0.0f32; half];
    let mut detail = vec![0.0f32; half];
    for c in 0..cur_w {
        match pass {
            Pass::Forward => {
                for r in 0..cur_h {
                    col[r] = data[r * stride + c];
                }
                decompose_1d(&col, kind, &mut approx, &mut detail);
                for r in 0..half {
                    data[r * stride + c] = approx[r];
                    data[(r + half) * stride + c] = detail[r];
                }
            }
            Pass::Inverse => {
                for r in 0..half {
                    approx[r] = data[r * stride + c];
                    detail[r] = data[(r + half) * stride + c];
                }
                reconstruct_1d(&approx, &detail, kind, &mut col);
                for r in 0..cur_h {
                    data[r * stride + c] = col[r];
                }
            }
        }
    }
}
