//! Fourier backend: padded 2D DFT with centered spectrum and mask filtering.

use ndarray::Array2;

use crate::error::{EngineError, EngineResult};
use crate::mask::{build_mask, MaskAnchor};
use crate::matrix::fourier::{forward_dft, inverse_dft};
use crate::matrix::{crop, decode, log_display, normalize_to_display, ImageSource};
use crate::stats::{band_stats_complex, default_bands, BandStats};

use super::{
    DisplayOutput, FilterSpec, FourierState, TransformBackend, TransformOptions, TransformState,
};

pub struct FourierBackend;

fn expect_state(state: &TransformState) -> EngineResult<&FourierState> {
    match state {
        TransformState::Fourier(st) => Ok(st),
        TransformState::Disposed => Err(EngineError::state("state was disposed")),
        _ => Err(EngineError::state("expected a Fourier spectrum state")),
    }
}

impl TransformBackend for FourierBackend {
    fn id(&self) -> &'static str {
        "fourier"
    }

    fn forward(
        &self,
        source: &ImageSource,
        _options: &TransformOptions,
    ) -> EngineResult<TransformState> {
        let gray = decode(source)?;
        let (h, w) = gray.dim();
        let (spectrum, padded_size) = forward_dft(&gray);
        Ok(TransformState::Fourier(FourierState {
            spectrum,
            mask: None,
            original_size: (w, h),
            padded_size,
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
            // Structural wavelet modes have no meaning on a spectrum; pass
            // the state through unchanged.
            None => return Ok(TransformState::Fourier(st.clone())),
        };

        let (ph, pw) = st.spectrum.dim();
        let mask = build_mask(&params, pw, ph, MaskAnchor::Centered);
        let mut spectrum = st.spectrum.clone();
        for (bin, &m) in spectrum.iter_mut().zip(mask.iter()) {
            *bin *= m;
        }
        Ok(TransformState::Fourier(FourierState {
            spectrum,
            mask: Some(mask),
            original_size: st.original_size,
            padded_size: st.padded_size,
        }))
    }

    fn inverse(&self, state: &TransformState) -> EngineResult<Array2<u8>> {
        let st = expect_state(state)?;
        let spatial = inverse_dft(&st.spectrum);
        let (w, h) = st.original_size;
        Ok(normalize_to_display(&crop(&spatial, h, w)))
    }

    fn display(&self, state: &TransformState) -> EngineResult<DisplayOutput> {
        let st = expect_state(state)?;
        let magnitude = st.spectrum.mapv(|c| c.norm());
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
        Ok(band_stats_complex(
            &st.spectrum,
            &default_bands(),
            MaskAnchor::Centered,
        ))
    }
}
