//! Transform backends behind a uniform pipeline interface.
//!
//! Every backend implements [`TransformBackend`]: forward decomposition from
//! an image source, pure filtering over an immutable state, display and
//! metric views, and the inverse back to an 8-bit plane. States are plain
//! data ([`TransformState`]) so the engine can cache, share, and dispose them
//! without knowing which transform produced them.

pub mod cosine;
pub mod directional;
pub mod fourier;
pub mod packet;
pub mod wavelet;

use ndarray::Array2;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::directional::DirectionalDecomposition;
use crate::error::{EngineError, EngineResult};
use crate::mask::{MaskMode, MaskParams, MaskShape};
use crate::matrix::ImageSource;
use crate::stats::BandStats;
use crate::wavelet::packet::{PacketNode, ThresholdMode};
use crate::wavelet::WaveletKind;

/// The transform families the engine can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformType {
    Fourier,
    Cosine,
    Wavelet,
    WaveletPacket,
    Directional,
}

impl TransformType {
    /// Resolve a transform tag. Unknown tags are an error, not a fallback.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "fourier" => Some(TransformType::Fourier),
            "cosine" => Some(TransformType::Cosine),
            "wavelet" => Some(TransformType::Wavelet),
            "wavelet-packet" => Some(TransformType::WaveletPacket),
            "directional" => Some(TransformType::Directional),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            TransformType::Fourier => "fourier",
            TransformType::Cosine => "cosine",
            TransformType::Wavelet => "wavelet",
            TransformType::WaveletPacket => "wavelet-packet",
            TransformType::Directional => "directional",
        }
    }
}

/// Filter selection mode across all backends. Mask modes drive the Fourier
/// and cosine backends; the structural modes drive the wavelet family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    None,
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
    LlOnly,
    SuppressHigh,
    Threshold,
}

/// Coefficient thresholding selector carried by the filter spec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    None,
    Hard,
    Soft,
}

impl ThresholdKind {
    pub fn as_mode(&self) -> Option<ThresholdMode> {
        match self {
            ThresholdKind::None => None,
            ThresholdKind::Hard => Some(ThresholdMode::Hard),
            ThresholdKind::Soft => Some(ThresholdMode::Soft),
        }
    }
}

/// One filter request. Serialized in camelCase so the wire shape matches the
/// front-end payloads; the serialized form of a normalized spec doubles as
/// the cache-key fragment, so equal inputs always key alike.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSpec {
    pub mode: FilterMode,
    pub shape: MaskShape,
    pub radius: f32,
    pub bandwidth: f32,
    pub sigma: f32,
    pub threshold: f32,
    pub detail_gain: f32,
    pub threshold_mode: ThresholdKind,
    pub lambda: f32,
    pub selected_nodes: Vec<String>,
    pub selected_directions: Vec<usize>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec {
            mode: FilterMode::None,
            shape: MaskShape::Ideal,
            radius: 0.5,
            bandwidth: 0.2,
            sigma: 0.25,
            threshold: 0.0,
            detail_gain: 1.0,
            threshold_mode: ThresholdKind::None,
            lambda: 0.0,
            selected_nodes: Vec::new(),
            selected_directions: Vec::new(),
        }
    }
}

impl FilterSpec {
    /// Clamp parameters into their valid ranges and canonicalize selections.
    /// Returns `None` for the identity filter: the pipeline reuses the
    /// forward state untouched instead of copying it.
    pub fn normalized(&self) -> Option<FilterSpec> {
        if self.mode == FilterMode::None {
            return None;
        }
        let mut spec = self.clone();
        spec.radius = spec.radius.clamp(0.0, 1.0);
        spec.bandwidth = spec.bandwidth.clamp(0.0, 1.0);
        spec.sigma = spec.sigma.clamp(0.0, 1.0);
        spec.threshold = spec.threshold.max(0.0);
        spec.lambda = spec.lambda.max(0.0);
        spec.detail_gain = spec.detail_gain.max(0.0);
        spec.selected_nodes.sort();
        spec.selected_nodes.dedup();
        spec.selected_directions.sort_unstable();
        spec.selected_directions.dedup();
        Some(spec)
    }

    /// Canonical serialized form used in filtered-state cache keys.
    pub fn cache_fragment(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Mask parameters when the mode is mask-based, `None` otherwise.
    pub fn mask_params(&self) -> Option<MaskParams> {
        let mode = match self.mode {
            FilterMode::Lowpass => MaskMode::Lowpass,
            FilterMode::Highpass => MaskMode::Highpass,
            FilterMode::Bandpass => MaskMode::Bandpass,
            FilterMode::Bandstop => MaskMode::Bandstop,
            _ => return None,
        };
        Some(MaskParams {
            mode,
            shape: self.shape,
            radius: self.radius,
            bandwidth: self.bandwidth,
            sigma: self.sigma,
        })
    }
}

/// Per-request transform knobs. Unset fields fall back to backend defaults
/// (Haar, level 1 for the plain wavelet, level 3 for the packet tree).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub wavelet: Option<String>,
    pub level: Option<u32>,
}

impl TransformOptions {
    pub fn wavelet_kind(&self) -> WaveletKind {
        WaveletKind::from_id(self.wavelet.as_deref().unwrap_or("haar"))
    }

    pub fn level_or(&self, default: u32) -> u32 {
        self.level.unwrap_or(default)
    }
}

/// Fourier forward state: centered complex spectrum plus the mask last
/// applied to it (kept for display).
#[derive(Clone, Debug)]
pub struct FourierState {
    pub spectrum: Array2<Complex<f32>>,
    pub mask: Option<Array2<f32>>,
    /// `(width, height)` of the source plane.
    pub original_size: (usize, usize),
    /// `(width, height)` after power-of-two padding.
    pub padded_size: (usize, usize),
}

/// Cosine forward state: real coefficient plane, DC at the origin corner.
#[derive(Clone, Debug)]
pub struct CosineState {
    pub coefficients: Array2<f32>,
    pub mask: Option<Array2<f32>>,
    pub original_size: (usize, usize),
}

/// Wavelet forward state: flat nested-quadrant coefficient plane.
#[derive(Clone, Debug)]
pub struct WaveletState {
    pub coefficients: Vec<f32>,
    pub original_size: (usize, usize),
    pub padded_size: (usize, usize),
    pub levels: u32,
    pub wavelet: WaveletKind,
}

/// Wavelet-packet forward state: the complete quad-tree in preorder.
#[derive(Clone, Debug)]
pub struct PacketState {
    pub nodes: Vec<PacketNode>,
    pub original_size: (usize, usize),
    pub padded_size: (usize, usize),
    pub levels: u32,
    pub wavelet: WaveletKind,
    /// Sum of the current leaf energies.
    pub total_energy: f64,
}

/// Directional forward state: oriented bands plus the low-pass residual.
#[derive(Clone, Debug)]
pub struct DirectionalState {
    pub decomposition: DirectionalDecomposition,
    pub original_size: (usize, usize),
}

/// A cached decomposition. `Disposed` is the tombstone left behind after
/// explicit disposal; every backend operation on it fails cleanly, and
/// disposing twice is a no-op.
#[derive(Clone, Debug)]
pub enum TransformState {
    Fourier(FourierState),
    Cosine(CosineState),
    Wavelet(WaveletState),
    WaveletPacket(PacketState),
    Directional(DirectionalState),
    Disposed,
}

impl TransformState {
    /// Drop the coefficient buffers, leaving a tombstone. Idempotent.
    pub fn dispose(&mut self) {
        *self = TransformState::Disposed;
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, TransformState::Disposed)
    }

    /// Summary of the state's geometry, `None` once disposed.
    pub fn meta(&self) -> Option<StateMeta> {
        match self {
            TransformState::Fourier(st) => Some(StateMeta {
                transform: TransformType::Fourier.tag(),
                original_size: st.original_size,
                padded_size: Some(st.padded_size),
                levels: None,
                wavelet: None,
                total_energy: None,
            }),
            TransformState::Cosine(st) => Some(StateMeta {
                transform: TransformType::Cosine.tag(),
                original_size: st.original_size,
                padded_size: None,
                levels: None,
                wavelet: None,
                total_energy: None,
            }),
            TransformState::Wavelet(st) => Some(StateMeta {
                transform: TransformType::Wavelet.tag(),
                original_size: st.original_size,
                padded_size: Some(st.padded_size),
                levels: Some(st.levels),
                wavelet: Some(st.wavelet.id()),
                total_energy: None,
            }),
            TransformState::WaveletPacket(st) => Some(StateMeta {
                transform: TransformType::WaveletPacket.tag(),
                original_size: st.original_size,
                padded_size: Some(st.padded_size),
                levels: Some(st.levels),
                wavelet: Some(st.wavelet.id()),
                total_energy: Some(st.total_energy),
            }),
            TransformState::Directional(st) => Some(StateMeta {
                transform: TransformType::Directional.tag(),
                original_size: st.original_size,
                padded_size: None,
                levels: None,
                wavelet: None,
                total_energy: None,
            }),
            TransformState::Disposed => None,
        }
    }
}

/// Geometry summary returned alongside pipeline results.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StateMeta {
    pub transform: &'static str,
    pub original_size: (usize, usize),
    pub padded_size: Option<(usize, usize)>,
    pub levels: Option<u32>,
    pub wavelet: Option<&'static str>,
    /// Wavelet-packet only: sum of the current leaf energies.
    pub total_energy: Option<f64>,
}

/// Display rendering of a state: the main 8-bit view plus, for mask-based
/// backends, a rendering of the last applied mask.
#[derive(Clone, Debug)]
pub struct DisplayOutput {
    pub display: Array2<u8>,
    pub mask_display: Option<Array2<u8>>,
}

/// Uniform backend interface: forward, filter, display, metrics, inverse.
///
/// `apply_filter` is pure over the input state and is only invoked with a
/// normalized, non-identity spec; the engine handles the identity case by
/// reusing the forward state.
pub trait TransformBackend {
    fn id(&self) -> &'static str;

    /// Extra cache-key segment derived from the options; empty for backends
    /// whose forward pass ignores them.
    fn options_fragment(&self, _options: &TransformOptions) -> String {
        String::new()
    }

    fn forward(
        &self,
        source: &ImageSource,
        options: &TransformOptions,
    ) -> EngineResult<TransformState>;

    fn apply_filter(
        &self,
        state: &TransformState,
        spec: &FilterSpec,
    ) -> EngineResult<TransformState>;

    fn inverse(&self, state: &TransformState) -> EngineResult<Array2<u8>>;

    fn display(&self, state: &TransformState) -> EngineResult<DisplayOutput>;

    fn metrics(&self, state: &TransformState) -> EngineResult<BandStats>;

    /// Cache key of the unfiltered forward state.
    fn forward_key(&self, image_id: &str, options: &TransformOptions) -> String {
        let image = if image_id.is_empty() { "unknown" } else { image_id };
        format!("{}:{}{}", self.id(), image, self.options_fragment(options))
    }

    /// Cache key of a filtered state: the forward key plus the canonical
    /// serialized spec.
    fn filtered_key(
        &self,
        image_id: &str,
        options: &TransformOptions,
        spec: &FilterSpec,
    ) -> String {
        format!(
            "{}:{}",
            self.forward_key(image_id, options),
            spec.cache_fragment()
        )
    }
}

/// Static backend lookup by transform family.
pub fn backend_for(transform: TransformType) -> &'static dyn TransformBackend {
    match transform {
        TransformType::Fourier => &fourier::FourierBackend,
        TransformType::Cosine => &cosine::CosineBackend,
        TransformType::Wavelet => &wavelet::WaveletBackend,
        TransformType::WaveletPacket => &packet::PacketBackend,
        TransformType::Directional => &directional::DirectionalBackend,
    }
}

/// Backend lookup from a raw tag; unknown tags surface as
/// [`EngineError::UnsupportedTransform`].
pub fn backend_for_tag(tag: &str) -> EngineResult<&'static dyn TransformBackend> {
    TransformType::from_tag(tag)
        .map(backend_for)
        .ok_or_else(|| EngineError::unsupported_transform(tag))
}
