//! Frequency/coefficient-domain mask construction.
//!
//! Builds a same-size real-valued mask from a mode/shape/radius description.
//! Radius, bandwidth and sigma are fractions of the plane's characteristic
//! radius: half the minor dimension for centered masks (Fourier spectra, DC
//! at the midpoint) and the corner-to-corner diagonal for origin-anchored
//! masks (cosine coefficient planes, DC at the top-left corner).

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Where the mask's zero-distance point sits on the plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskAnchor {
    /// Distance measured from the plane midpoint (shifted spectra).
    Centered,
    /// Distance measured from the top-left corner (coefficient planes).
    Origin,
}

/// Binary or Gaussian mask profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskShape {
    Ideal,
    Gaussian,
}

/// Frequency-selection mode for mask-based filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskMode {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

/// Parameters for one mask build. All ratios are pre-clamped to [0, 1] by
/// filter-spec normalization.
#[derive(Clone, Copy, Debug)]
pub struct MaskParams {
    pub mode: MaskMode,
    pub shape: MaskShape,
    /// Cut-off (lowpass/highpass) or band center (bandpass/bandstop).
    pub radius: f32,
    /// Annulus width for bandpass/bandstop.
    pub bandwidth: f32,
    /// Gaussian spread for lowpass/highpass.
    pub sigma: f32,
}

/// Build a `(height, width)` mask with values in [0, 1].
pub fn build_mask(params: &MaskParams, width: usize, height: usize, anchor: MaskAnchor) -> Array2<f32> {
    let max_radius = match anchor {
        MaskAnchor::Centered => (width.min(height) as f32) / 2.0,
        MaskAnchor::Origin => {
            let w = width.saturating_sub(1) as f32;
            let h = height.saturating_sub(1) as f32;
            (w * w + h * h).sqrt()
        }
    };
    let max_radius = max_radius.max(1.0);

    let (cy, cx) = match anchor {
        MaskAnchor::Centered => ((height / 2) as f32, (width / 2) as f32),
        MaskAnchor::Origin => (0.0, 0.0),
    };

    Array2::from_shape_fn((height, width), |(i, j)| {
        let dy = i as f32 - cy;
        let dx = j as f32 - cx;
        let dist = (dx * dx + dy * dy).sqrt();
        mask_value(params, dist, max_radius)
    })
}

fn mask_value(params: &MaskParams, dist: f32, max_radius: f32) -> f32 {
    let cutoff = params.radius * max_radius;
    match (params.shape, params.mode) {
        (MaskShape::Ideal, MaskMode::Lowpass) => ideal(dist <= cutoff),
        (MaskShape::Ideal, MaskMode::Highpass) => ideal(dist > cutoff),
        (MaskShape::Ideal, MaskMode::Bandpass) => {
            let (inner, outer) = band_edges(params, max_radius);
            ideal(dist >= inner && dist <= outer)
        }
        (MaskShape::Ideal, MaskMode::Bandstop) => {
            let (inner, outer) = band_edges(params, max_radius);
            ideal(dist < inner || dist > outer)
        }
        (MaskShape::Gaussian, MaskMode::Lowpass) => gaussian(dist, params.sigma * max_radius),
        (MaskShape::Gaussian, MaskMode::Highpass) => {
            1.0 - gaussian(dist, params.sigma * max_radius)
        }
        (MaskShape::Gaussian, MaskMode::Bandpass) => {
            let (inner, outer) = band_edges(params, max_radius);
            (gaussian(dist, outer) - gaussian(dist, inner)).clamp(0.0, 1.0)
        }
        (MaskShape::Gaussian, MaskMode::Bandstop) => {
            let (inner, outer) = band_edges(params, max_radius);
            1.0 - (gaussian(dist, outer) - gaussian(dist, inner)).clamp(0.0, 1.0)
        }
    }
}

fn ideal(keep: bool) -> f32 {
    if keep {
        1.0
    } else {
        0.0
    }
}

fn gaussian(dist: f32, sigma: f32) -> f32 {
    // Degenerate spread keeps only the zero-distance point.
    if sigma <= f32::EPSILON {
        return if dist <= f32::EPSILON { 1.0 } else { 0.0 };
    }
    (-dist * dist / (2.0 * sigma * sigma)).exp()
}

fn band_edges(params: &MaskParams, max_radius: f32) -> (f32, f32) {
    let inner = (params.radius - params.bandwidth / 2.0).max(0.0) * max_radius;
    let outer = (params.radius + params.bandwidth / 2.0) * max_radius;
    (inner, outer)
}
