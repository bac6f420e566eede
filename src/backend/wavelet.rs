//! Wavelet backend: multi-level 2D DWT with structural and mask filters.
//!
//! The coefficient plane is padded to a multiple of `2^levels` per axis and
//! laid out as nested quadrants, coarsest LL in the top-left corner. Filters
//! come in two families: structural modes that address the layout directly
//! (keep-LL, scale details, threshold details) and mask modes applied to the
//! coefficient plane with an origin anchor, since the layout puts the
//! coarsest content at the corner.

use ndarray::Array2;

use crate::error::{EngineError, EngineResult};
use crate::mask::{build_mask, MaskAnchor};
use crate::matrix::{crop, decode, log_display, normalize_to_display, pad_to, ImageSource};
use crate::stats::{band_stats_real, default_bands, BandStats};
use crate::wavelet::packet::{apply_threshold, ThresholdMode};
use crate::wavelet::{clamp_levels, dwt2d_forward, dwt2d_inverse, padded_extent};

use super::{
    DisplayOutput, FilterMode, FilterSpec, TransformBackend, TransformOptions, TransformState,
    WaveletState,
};

const DEFAULT_LEVEL: u32 = 1;

pub struct WaveletBackend;

fn expect_state(state: &TransformState) -> EngineResult<&WaveletState> {
    match state {
        TransformState::Wavelet(st) => Ok(st),
        TransformState::Disposed => Err(EngineError::state("state was disposed")),
        _ => Err(EngineError::state("expected a wavelet coefficient state")),
    }
}

/// Run `f` over every coefficient outside the final LL quadrant.
fn for_each_detail(st: &WaveletState, data: &mut [f32], f: impl Fn(f32) -> f32) {
    let (pw, ph) = st.padded_size;
    let ll_w = pw >> st.levels;
    let ll_h = ph >> st.levels;
    for r in 0..ph {
        for c in 0..pw {
            if r >= ll_h || c >= ll_w {
                let idx = r * pw + c;
                data[idx] = f(data[idx]);
            }
        }
    }
}

impl TransformBackend for WaveletBackend {
    fn id(&self) -> &'static str {
        "wavelet"
    }

    fn options_fragment(&self, options: &TransformOptions) -> String {
        format!(
            ":{}:{}",
            options.wavelet_kind().id(),
            options.level_or(DEFAULT_LEVEL)
        )
    }

    fn forward(
        &self,
        source: &ImageSource,
        options: &TransformOptions,
    ) -> EngineResult<TransformState> {
        let gray = decode(source)?;
        let (h, w) = gray.dim();
        let wavelet = options.wavelet_kind();
        let levels = clamp_levels(w, h, options.level_or(DEFAULT_LEVEL));
        let pw = padded_extent(w, levels);
        let ph = padded_extent(h, levels);

        let mut coefficients = pad_to(&gray, ph, pw).into_raw_vec();
        dwt2d_forward(&mut coefficients, pw, ph, levels, wavelet);

        Ok(TransformState::Wavelet(WaveletState {
            coefficients,
            original_size: (w, h),
            padded_size: (pw, ph),
            levels,
            wavelet,
        }))
    }

    fn apply_filter(
        &self,
        state: &TransformState,
        spec: &FilterSpec,
    ) -> EngineResult<TransformState> {
        let st = expect_state(state)?;
        let mut coefficients = st.coefficients.clone();

        match spec.mode {
            FilterMode::LlOnly => {
                for_each_detail(st, &mut coefficients, |_| 0.0);
            }
            FilterMode::SuppressHigh => {
                let gain = spec.detail_gain;
                for_each_detail(st, &mut coefficients, |v| v * gain);
            }
            FilterMode::Threshold => {
                // The dedicated threshold knob takes precedence; the shared
                // lambda is the fallback when only a mode was set.
                let lambda = if spec.threshold > 0.0 {
                    spec.threshold
                } else {
                    spec.lambda
                };
                let mode = spec.threshold_mode.as_mode().unwrap_or(ThresholdMode::Hard);
                let (pw, ph) = st.padded_size;
                let ll_w = pw >> st.levels;
                let ll_h = ph >> st.levels;
                for r in 0..ph {
                    let row = &mut coefficients[r * pw..(r + 1) * pw];
                    if r < ll_h {
                        apply_threshold(&mut row[ll_w..], mode, lambda);
                    } else {
                        apply_threshold(row, mode, lambda);
                    }
                }
            }
            _ => {
                if let Some(params) = spec.mask_params() {
                    let (pw, ph) = st.padded_size;
                    let mask = build_mask(&params, pw, ph, MaskAnchor::Origin);
                    for (v, &m) in coefficients.iter_mut().zip(mask.iter()) {
                        *v *= m;
                    }
                }
            }
        }

        Ok(TransformState::Wavelet(WaveletState {
            coefficients,
            ..st.clone()
        }))
    }

    fn inverse(&self, state: &TransformState) -> EngineResult<Array2<u8>> {
        let st = expect_state(state)?;
        let (pw, ph) = st.padded_size;
        let mut data = st.coefficients.clone();
        dwt2d_inverse(&mut data, pw, ph, st.levels, st.wavelet);
        let plane = Array2::from_shape_vec((ph, pw), data)
            .map_err(|err| EngineError::state(err.to_string()))?;
        let (w, h) = st.original_size;
        Ok(normalize_to_display(&crop(&plane, h, w)))
    }

    fn display(&self, state: &TransformState) -> EngineResult<DisplayOutput> {
        let st = expect_state(state)?;
        let (pw, ph) = st.padded_size;
        let plane = Array2::from_shape_vec((ph, pw), st.coefficients.clone())
            .map_err(|err| EngineError::state(err.to_string()))?;
        Ok(DisplayOutput {
            display: log_display(&plane),
            mask_display: None,
        })
    }

    fn metrics(&self, state: &TransformState) -> EngineResult<BandStats> {
        let st = expect_state(state)?;
        let (pw, ph) = st.padded_size;
        let plane = Array2::from_shape_vec((ph, pw), st.coefficients.clone())
            .map_err(|err| EngineError::state(err.to_string()))?;
        Ok(band_stats_real(&plane, &default_bands(), MaskAnchor::Origin))
    }
}
