//! Cosine backend: separable orthonormal DCT-II over the unpadded plane.
//!
//! The direct O(n^2) kernel keeps the plane at its original size (no
//! power-of-two padding), leaving the DC coefficient in the top-left corner.
//! Masks are therefore anchored at the origin, with radii measured against
//! the corner-to-corner diagonal.

use ndarray::Array2;

use crate::error::{EngineError, EngineResult};
use crate::mask::{build_mask, MaskAnchor};
use crate::matrix::{decode, log_display, normalize_to_display, ImageSource};
use crate::stats::{band_stats_real, default_bands, BandStats};

use super::{
    CosineState, DisplayOutput, FilterSpec, TransformBackend, TransformOptions, TransformState,
};

pub struct CosineBackend;

/// Orthonormal DCT-II of one signal.
fn dct_1d(input: &[f32], output: &mut [f32]) {
    let n = input.len();
    let scale0 = (1.0 / n as f32).sqrt();
    let scale = (2.0 / n as f32).sqrt();
    for (k, out) in output.iter_mut().enumerate() {
        let mut acc = 0.0f32;
        for (i, &x) in input.iter().enumerate() {
            acc += x * (std::f32::consts::PI * (2 * i + 1) as f32 * k as f32 / (2 * n) as f32).cos();
        }
        *out = acc * if k == 0 { scale0 } else { scale };
    }
}

/// Orthonormal DCT-III, the exact inverse of [`dct_1d`].
fn idct_1d(input: &[f32], output: &mut [f32]) {
    let n = input.len();
    let scale0 = (1.0 / n as f32).sqrt();
    let scale = (2.0 / n as f32).sqrt();
    for (i, out) in output.iter_mut().enumerate() {
        let mut acc = input[0] * scale0;
        for (k, &coeff) in input.iter().enumerate().skip(1) {
            acc += coeff
                * scale
                * (std::f32::consts::PI * (2 * i + 1) as f32 * k as f32 / (2 * n) as f32).cos();
        }
        *out = acc;
    }
}

/// Separable 2D DCT-II: rows then columns.
pub fn dct2d_forward(gray: &Array2<f32>) -> Array2<f32> {
    apply_separable(gray, dct_1d)
}

/// Separable 2D DCT-III.
pub fn dct2d_inverse(coefficients: &Array2<f32>) -> Array2<f32> {
    apply_separable(coefficients, idct_1d)
}

fn apply_separable(plane: &Array2<f32>, pass: fn(&[f32], &mut [f32])) -> Array2<f32> {
    let (h, w) = plane.dim();
    let mut data: Vec<f32> = plane.iter().copied().collect();

    let mut line = vec![0.0f32; w];
    let mut out_line = vec![0.0f32; w];
    for r in 0..h {
        line.copy_from_slice(&data[r * w..(r + 1) * w]);
        pass(&line, &mut out_line);
        data[r * w..(r + 1) * w].copy_from_slice(&out_line);
    }

    let mut col = vec![0.0f32; h];
    let mut out_col = vec![0.0f32; h];
    for c in 0..w {
        for r in 0..h {
            col[r] = data[r * w + c];
        }
        pass(&col, &mut out_col);
        for r in 0..h {
            data[r * w + c] = out_col[r];
        }
    }

    Array2::from_shape_vec((h, w), data).expect("separable pass preserves the shape")
}

fn expect_state(state: &TransformState) -> EngineResult<&CosineState> {
    match state {
        TransformState::Cosine(st) => Ok(st),
        TransformState::Disposed => Err(EngineError::state("state was disposed")),
        _ => Err(EngineError::state("expected a cosine coefficient state")),
    }
}

impl TransformBackend for CosineBackend {
    fn id(&self) -> &'static str {
        "cosine"
    }

    fn forward(
        &self,
        source: &ImageSource,
        _options: &TransformOptions,
    ) -> EngineResult<TransformState> {
        let gray = decode(source)?;
        let (h, w) = gray.dim();
        Ok(TransformState::Cosine(CosineState {
            coefficients: dct2d_forward(&gray),
            mask: None,
            original_size: (w, h),
        }))
    }

    fn apply_filter(
        &self,
        state: &TransformState,
        spec: &FilterSpec,
    ) -> EngineResult<TransformState> {
        let st = expect_state(state)?;
        let params = match spec.mask_params() {
            Some(params) => params,
            None => return Ok(TransformState::Cosine(st.clone())),
        };

        let (h, w) = st.coefficients.dim();
        let mask = build_mask(&params, w, h, MaskAnchor::Origin);
        let coefficients = &st.coefficients * &mask;
        Ok(TransformState::Cosine(CosineState {
            coefficients,
            mask: Some(mask),
            original_size: st.original_size,
        }))
    }

    fn inverse(&self, state: &TransformState) -> EngineResult<Array2<u8>> {
        let st = expect_state(state)?;
        Ok(normalize_to_display(&dct2d_inverse(&st.coefficients)))
    }

    fn display(&self, state: &TransformState) -> EngineResult<DisplayOutput> {
        let st = expect_state(state)?;
        let magnitude = st.coefficients.mapv(f32::abs);
        let mask_display = st
            .mask
            .as_ref()
            .map(|mask| mask.mapv(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8));
        Ok(DisplayOutput {
            display: log_display(&magnitude),
            mask_display,
        })
    }

    fn metrics(&self, state: &TransformState) -> EngineResult<BandStats> {
        let st = expect_state(state)?;
        Ok(band_stats_real(
            &st.coefficients,
            &default_bands(),
            MaskAnchor::Origin,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FilterMode;
    use crate::mask::MaskShape;

    fn gradient(h: usize, w: usize) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(i, j)| (i * 11 + j * 5) as f32 % 73.0)
    }

    #[test]
    fn test_dct_roundtrip() {
        let plane = gradient(12, 9);
        let restored = dct2d_inverse(&dct2d_forward(&plane));
        for (a, b) in plane.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-2, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_constant_plane_concentrates_in_dc() {
        let plane = Array2::from_elem((8, 8), 50.0);
        let coeffs = dct2d_forward(&plane);
        // Orthonormal DC gain is sqrt(n*m).
        assert!((coeffs[[0, 0]] - 50.0 * 8.0).abs() < 1e-2);
        for (idx, &v) in coeffs.indexed_iter() {
            if idx != (0, 0) {
                assert!(v.abs() < 1e-3, "{:?}: {}", idx, v);
            }
        }
    }

    #[test]
    fn test_orthonormal_energy_preserved() {
        let plane = gradient(8, 8);
        let coeffs = dct2d_forward(&plane);
        let spatial: f32 = plane.iter().map(|v| v * v).sum();
        let transformed: f32 = coeffs.iter().map(|v| v * v).sum();
        assert!((spatial - transformed).abs() < spatial * 1e-4);
    }

    #[test]
    fn test_no_padding_in_forward_state() {
        let backend = CosineBackend;
        let source = ImageSource::Matrix(gradient(10, 14));
        let state = backend.forward(&source, &TransformOptions::default()).unwrap();
        match &state {
            TransformState::Cosine(st) => {
                assert_eq!(st.coefficients.dim(), (10, 14));
                assert_eq!(st.original_size, (14, 10));
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_full_radius_lowpass_is_identity_up_to_metrics() {
        let backend = CosineBackend;
        let source = ImageSource::Matrix(gradient(16, 16));
        let state = backend.forward(&source, &TransformOptions::default()).unwrap();
        let spec = FilterSpec {
            mode: FilterMode::Lowpass,
            shape: MaskShape::Ideal,
            radius: 1.0,
            ..FilterSpec::default()
        };
        let filtered = backend
            .apply_filter(&state, &spec.normalized().unwrap())
            .unwrap();
        // An origin-anchored ideal low-pass at full radius covers the whole
        // coefficient plane, so every band ratio is unchanged.
        let before = backend.metrics(&state).unwrap();
        let after = backend.metrics(&filtered).unwrap();
        assert!((before.total_energy - after.total_energy).abs() < 1e-6);
        for (a, b) in before.bands.iter().zip(after.bands.iter()) {
            assert!((a.ratio - b.ratio).abs() < 1e-9);
        }
    }

    #[test]
    fn test_highpass_zeroes_dc() {
        let backend = CosineBackend;
        let source = ImageSource::Matrix(gradient(16, 16));
        let state = backend.forward(&source, &TransformOptions::default()).unwrap();
        let spec = FilterSpec {
            mode: FilterMode::Highpass,
            shape: MaskShape::Ideal,
            radius: 0.3,
            ..FilterSpec::default()
        };
        let filtered = backend
            .apply_filter(&state, &spec.normalized().unwrap())
            .unwrap();
        match &filtered {
            TransformState::Cosine(st) => assert_eq!(st.coefficients[[0, 0]], 0.0),
            other => panic!("unexpected state: {:?}", other),
        }
    }
}
