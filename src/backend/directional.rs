//! Directional backend: oriented band analysis with selection filtering.
//!
//! Runs at the source resolution with no padding. The inverse is the lossy
//! summation synthesis of the filter bank, so round trips are approximate by
//! design of the bank itself.

use ndarray::Array2;

use crate::directional::{analyze, direction_energies, filter_directions, synthesize};
use crate::error::{EngineError, EngineResult};
use crate::matrix::{decode, log_display, normalize_to_display, ImageSource};
use crate::stats::BandStats;
use crate::wavelet::packet::energy_of;

use super::{
    DirectionalState, DisplayOutput, FilterSpec, TransformBackend, TransformOptions,
    TransformState,
};

pub struct DirectionalBackend;

fn expect_state(state: &TransformState) -> EngineResult<&DirectionalState> {
    match state {
        TransformState::Directional(st) => Ok(st),
        TransformState::Disposed => Err(EngineError::state("state was disposed")),
        _ => Err(EngineError::state("expected a directional band state")),
    }
}

impl TransformBackend for DirectionalBackend {
    fn id(&self) -> &'static str {
        "directional"
    }

    fn forward(
        &self,
        source: &ImageSource,
        _options: &TransformOptions,
    ) -> EngineResult<TransformState> {
        let gray = decode(source)?;
        let (h, w) = gray.dim();
        Ok(TransformState::Directional(DirectionalState {
            decomposition: analyze(&gray),
            original_size: (w, h),
        }))
    }

    fn apply_filter(
        &self,
        state: &TransformState,
        spec: &FilterSpec,
    ) -> EngineResult<TransformState> {
        let st = expect_state(state)?;
        let threshold = spec
            .threshold_mode
            .as_mode()
            .map(|mode| (mode, spec.lambda));
        let mut decomposition = st.decomposition.clone();
        decomposition.directions = filter_directions(
            &st.decomposition.directions,
            &spec.selected_directions,
            threshold,
        );
        Ok(TransformState::Directional(DirectionalState {
            decomposition,
            original_size: st.original_size,
        }))
    }

    fn inverse(&self, state: &TransformState) -> EngineResult<Array2<u8>> {
        let st = expect_state(state)?;
        let dec = &st.decomposition;
        let restored = synthesize(&dec.directions, &dec.lowpass, dec.width, dec.height);
        Ok(normalize_to_display(&restored))
    }

    fn display(&self, state: &TransformState) -> EngineResult<DisplayOutput> {
        let st = expect_state(state)?;
        let dec = &st.decomposition;
        // Sum of response magnitudes across the bank.
        let mut plane = vec![0.0f32; dec.width * dec.height];
        for band in &dec.directions {
            for (acc, &v) in plane.iter_mut().zip(band.data.iter()) {
                *acc += v.abs();
            }
        }
        let plane = Array2::from_shape_vec((dec.height, dec.width), plane)
            .map_err(|err| EngineError::state(err.to_string()))?;
        Ok(DisplayOutput {
            display: log_display(&plane),
            mask_display: None,
        })
    }

    fn metrics(&self, state: &TransformState) -> EngineResult<BandStats> {
        let st = expect_state(state)?;
        let dec = &st.decomposition;
        let mut pairs = direction_energies(&dec.directions);
        pairs.push(("lowpass".to_string(), energy_of(&dec.lowpass)));
        Ok(BandStats::from_energies(pairs))
    }
}
