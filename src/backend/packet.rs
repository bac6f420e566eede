//! Wavelet-packet backend: complete quad-tree decomposition with leaf
//! selection and thresholding.
//!
//! Filtering addresses leaves by `/`-joined path prefixes rather than by
//! mask geometry; the display view is the flat mosaic of every leaf placed
//! at its full-depth quadrant position, and metrics report the propagated
//! energy reaching each tree depth.

use ndarray::Array2;

use crate::error::{EngineError, EngineResult};
use crate::matrix::{crop, decode, log_display, normalize_to_display, pad_to, ImageSource};
use crate::stats::{BandEnergy, BandStats};
use crate::wavelet::packet::{decompose, filter_leaves, propagated_energies, reconstruct, PacketNode};
use crate::wavelet::{clamp_levels, padded_extent};

use super::{
    DisplayOutput, FilterSpec, PacketState, TransformBackend, TransformOptions, TransformState,
};

const DEFAULT_LEVEL: u32 = 3;

pub struct PacketBackend;

fn expect_state(state: &TransformState) -> EngineResult<&PacketState> {
    match state {
        TransformState::WaveletPacket(st) => Ok(st),
        TransformState::Disposed => Err(EngineError::state("state was disposed")),
        _ => Err(EngineError::state("expected a wavelet-packet tree state")),
    }
}

fn leaf_total(nodes: &[PacketNode]) -> f64 {
    nodes.iter().filter(|n| n.is_leaf).map(|n| n.energy).sum()
}

/// Top-left corner of a node's quadrant in the full-depth mosaic.
fn leaf_origin(path: &str, width: usize, height: usize) -> (usize, usize) {
    let (mut r0, mut c0) = (0usize, 0usize);
    let (mut w, mut h) = (width, height);
    for label in path.split('/').filter(|s| !s.is_empty()) {
        let (hw, hh) = (w / 2, h / 2);
        match label {
            "LH" => r0 += hh,
            "HL" => c0 += hw,
            "HH" => {
                r0 += hh;
                c0 += hw;
            }
            _ => {}
        }
        w = hw;
        h = hh;
    }
    (r0, c0)
}

/// Flatten the tree's leaves into one padded coefficient plane.
fn leaf_mosaic(nodes: &[PacketNode], width: usize, height: usize) -> Array2<f32> {
    let mut plane = Array2::zeros((height, width));
    for node in nodes.iter().filter(|n| n.is_leaf) {
        let (r0, c0) = leaf_origin(&node.path, width, height);
        for r in 0..node.height {
            for c in 0..node.width {
                plane[[r0 + r, c0 + c]] = node.data[r * node.width + c];
            }
        }
    }
    plane
}

impl TransformBackend for PacketBackend {
    fn id(&self) -> &'static str {
        "wavelet-packet"
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

        let plane = pad_to(&gray, ph, pw).into_raw_vec();
        let nodes = decompose(&plane, pw, ph, levels, wavelet);
        let total_energy = leaf_total(&nodes);

        Ok(TransformState::WaveletPacket(PacketState {
            nodes,
            original_size: (w, h),
            padded_size: (pw, ph),
            levels,
            wavelet,
            total_energy,
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
        let nodes = filter_leaves(&st.nodes, &spec.selected_nodes, threshold);
        let total_energy = leaf_total(&nodes);
        Ok(TransformState::WaveletPacket(PacketState {
            nodes,
            total_energy,
            ..st.clone()
        }))
    }

    fn inverse(&self, state: &TransformState) -> EngineResult<Array2<u8>> {
        let st = expect_state(state)?;
        let (pw, ph) = st.padded_size;
        let data = reconstruct(&st.nodes, pw, ph, st.levels, st.wavelet);
        let plane = Array2::from_shape_vec((ph, pw), data)
            .map_err(|err| EngineError::state(err.to_string()))?;
        let (w, h) = st.original_size;
        Ok(normalize_to_display(&crop(&plane, h, w)))
    }

    fn display(&self, state: &TransformState) -> EngineResult<DisplayOutput> {
        let st = expect_state(state)?;
        let (pw, ph) = st.padded_size;
        Ok(DisplayOutput {
            display: log_display(&leaf_mosaic(&st.nodes, pw, ph)),
            mask_display: None,
        })
    }

    /// Propagated leaf energy per tree depth, each measured against the root
    /// total. An unfiltered orthonormal tree carries the full energy at every
    /// depth; filtering shows up as a uniform drop across the buckets.
    fn metrics(&self, state: &TransformState) -> EngineResult<BandStats> {
        let st = expect_state(state)?;
        let energies = propagated_energies(&st.nodes);
        let total = energies.first().copied().unwrap_or(0.0);

        let mut buckets = vec![0.0f64; st.levels as usize + 1];
        for (node, &energy) in st.nodes.iter().zip(energies.iter()) {
            buckets[node.level as usize] += energy;
        }

        let bands = buckets
            .into_iter()
            .enumerate()
            .map(|(level, energy)| BandEnergy {
                label: format!("level-{}", level),
                ratio: if total > 0.0 { energy / total } else { 0.0 },
                energy,
            })
            .collect();

        Ok(BandStats {
            bands,
            total_energy: total,
        })
    }
}
