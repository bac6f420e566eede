//! Radial band-energy statistics.
//!
//! Partitions a spectrum or coefficient plane into annular bands whose edges
//! are fractions of the largest anchor-to-pixel distance, then reports per-band
//! energy and its ratio to the plane total. The pixel-to-band assignment map
//! depends only on the plane size, the band edges, and the anchor, so it is
//! memoized in a thread-local table keyed by those three.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ndarray::Array2;
use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::mask::MaskAnchor;

/// One radial band, edges as fractions of the plane's maximum radius.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandRange {
    pub min: f32,
    pub max: f32,
}

/// The low/mid/high split used when a caller supplies no bands of its own.
pub fn default_bands() -> Vec<BandRange> {
    vec![
        BandRange { min: 0.0, max: 0.3 },
        BandRange { min: 0.3, max: 0.7 },
        BandRange { min: 0.7, max: 1.0 },
    ]
}

/// Energy accumulated in one labeled band.
#[derive(Clone, Debug, Serialize)]
pub struct BandEnergy {
    pub label: String,
    pub energy: f64,
    pub ratio: f64,
}

/// Per-band energies plus the plane total the ratios are measured against.
#[derive(Clone, Debug, Serialize)]
pub struct BandStats {
    pub bands: Vec<BandEnergy>,
    pub total_energy: f64,
}

impl BandStats {
    /// Build stats from labeled raw energies, using their grand total as the
    /// ratio denominator. A zero total yields zero ratios.
    pub fn from_energies(pairs: Vec<(String, f64)>) -> Self {
        let total: f64 = pairs.iter().map(|(_, e)| e).sum();
        let bands = pairs
            .into_iter()
            .map(|(label, energy)| BandEnergy {
                label,
                ratio: if total > 0.0 { energy / total } else { 0.0 },
                energy,
            })
            .collect();
        BandStats {
            bands,
            total_energy: total,
        }
    }
}

/// Memoization key: plane size, anchor, and band edges quantized to 1e-4 so
/// logically equal inputs always hash alike.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct BandMapKey {
    width: usize,
    height: usize,
    anchor: MaskAnchor,
    edges: Vec<(i32, i32)>,
}

impl BandMapKey {
    fn new(width: usize, height: usize, bands: &[BandRange], anchor: MaskAnchor) -> Self {
        let quantize = |x: f32| (x * 10_000.0).round() as i32;
        BandMapKey {
            width,
            height,
            anchor,
            edges: bands
                .iter()
                .map(|b| (quantize(b.min), quantize(b.max)))
                .collect(),
        }
    }
}

thread_local! {
    static BAND_MAPS: RefCell<HashMap<BandMapKey, Rc<Vec<i16>>>> = RefCell::new(HashMap::new());
}

/// Per-pixel band index (-1 when no band covers the pixel), row-major,
/// memoized per (size, bands, anchor).
pub fn band_index_map(
    width: usize,
    height: usize,
    bands: &[BandRange],
    anchor: MaskAnchor,
) -> Rc<Vec<i16>> {
    let key = BandMapKey::new(width, height, bands, anchor);
    BAND_MAPS.with(|cache| {
        if let Some(map) = cache.borrow().get(&key) {
            return Rc::clone(map);
        }
        let map = Rc::new(build_band_map(width, height, bands, anchor));
        cache.borrow_mut().insert(key, Rc::clone(&map));
        map
    })
}

fn build_band_map(width: usize, height: usize, bands: &[BandRange], anchor: MaskAnchor) -> Vec<i16> {
    let (cy, cx) = match anchor {
        MaskAnchor::Centered => ((height / 2) as f32, (width / 2) as f32),
        MaskAnchor::Origin => (0.0, 0.0),
    };

    let mut distances = vec![0.0f32; width * height];
    let mut max_dist = 0.0f32;
    for i in 0..height {
        for j in 0..width {
            let dy = i as f32 - cy;
            let dx = j as f32 - cx;
            let d = (dx * dx + dy * dy).sqrt();
            distances[i * width + j] = d;
            max_dist = max_dist.max(d);
        }
    }
    let max_dist = max_dist.max(1.0);

    distances
        .into_iter()
        .map(|d| {
            let r = d / max_dist;
            bands
                .iter()
                .position(|b| r >= b.min && r <= b.max)
                .map_or(-1, |idx| idx as i16)
        })
        .collect()
}

/// Band-energy stats of a complex spectrum; energy is `re^2 + im^2` per bin.
pub fn band_stats_complex(
    spectrum: &Array2<Complex<f32>>,
    bands: &[BandRange],
    anchor: MaskAnchor,
) -> BandStats {
    let (height, width) = spectrum.dim();
    let map = band_index_map(width, height, bands, anchor);
    accumulate(
        spectrum.iter().map(|c| f64::from(c.norm_sqr())),
        &map,
        bands,
    )
}

/// Band-energy stats of a real coefficient plane; energy is the squared value.
pub fn band_stats_real(plane: &Array2<f32>, bands: &[BandRange], anchor: MaskAnchor) -> BandStats {
    let (height, width) = plane.dim();
    let map = band_index_map(width, height, bands, anchor);
    accumulate(plane.iter().map(|&v| f64::from(v) * f64::from(v)), &map, bands)
}

fn accumulate(
    energies: impl Iterator<Item = f64>,
    map: &[i16],
    bands: &[BandRange],
) -> BandStats {
    let mut per_band = vec![0.0f64; bands.len()];
    let mut total = 0.0f64;
    for (e, &idx) in energies.zip(map.iter()) {
        total += e;
        if idx >= 0 {
            per_band[idx as usize] += e;
        }
    }

    let band_entries = bands
        .iter()
        .zip(per_band)
        .map(|(range, energy)| BandEnergy {
            label: format!("{:.1}-{:.1}", range.min, range.max),
            ratio: if total > 0.0 { energy / total } else { 0.0 },
            energy,
        })
        .collect();

    BandStats {
        bands: band_entries,
        total_energy: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands_cover_unit_interval() {
        let bands = default_bands();
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].min, 0.0);
        assert_eq!(bands[2].max, 1.0);
        for pair in bands.windows(2) {
            assert_eq!(pair[0].max, pair[1].min);
        }
    }

    #[test]
    fn test_band_map_covers_every_pixel_with_default_bands() {
        let map = build_band_map(16, 16, &default_bands(), MaskAnchor::Centered);
        assert!(map.iter().all(|&idx| idx >= 0));
        let map = build_band_map(16, 16, &default_bands(), MaskAnchor::Origin);
        assert!(map.iter().all(|&idx| idx >= 0));
    }

    #[test]
    fn test_band_map_is_memoized() {
        let bands = default_bands();
        let a = band_index_map(12, 8, &bands, MaskAnchor::Centered);
        let b = band_index_map(12, 8, &bands, MaskAnchor::Centered);
        assert!(Rc::ptr_eq(&a, &b));
        let c = band_index_map(12, 8, &bands, MaskAnchor::Origin);
        assert!(!Rc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_ratios_sum_to_one_when_bands_cover() {
        let plane = Array2::from_shape_fn((16, 16), |(i, j)| (i * 16 + j) as f32);
        let stats = band_stats_real(&plane, &default_bands(), MaskAnchor::Origin);
        let ratio_sum: f64 = stats.bands.iter().map(|b| b.ratio).sum();
        assert!((ratio_sum - 1.0).abs() < 1e-9, "ratio sum {}", ratio_sum);
        let energy_sum: f64 = stats.bands.iter().map(|b| b.energy).sum();
        assert!((energy_sum - stats.total_energy).abs() < 1e-6);
    }

    #[test]
    fn test_dc_only_spectrum_lands_in_low_band() {
        let mut spectrum = Array2::from_elem((8, 8), Complex::new(0.0f32, 0.0));
        spectrum[[4, 4]] = Complex::new(100.0, 0.0);
        let stats = band_stats_complex(&spectrum, &default_bands(), MaskAnchor::Centered);
        assert!((stats.bands[0].ratio - 1.0).abs() < 1e-9);
        assert_eq!(stats.bands[1].energy, 0.0);
        assert_eq!(stats.bands[2].energy, 0.0);
    }

    #[test]
    fn test_zero_plane_gives_zero_ratios() {
        let plane = Array2::zeros((4, 4));
        let stats = band_stats_real(&plane, &default_bands(), MaskAnchor::Centered);
        assert_eq!(stats.total_energy, 0.0);
        assert!(stats.bands.iter().all(|b| b.ratio == 0.0));
    }

    #[test]
    fn test_uncovered_energy_still_counts_in_total() {
        let bands = vec![BandRange { min: 0.0, max: 0.2 }];
        let plane = Array2::from_elem((8, 8), 2.0);
        let stats = band_stats_real(&plane, &bands, MaskAnchor::Origin);
        assert!((stats.total_energy - 256.0).abs() < 1e-6);
        assert!(stats.bands[0].energy < stats.total_energy);
    }

    #[test]
    fn test_labels_follow_band_edges() {
        let stats = band_stats_real(
            &Array2::from_elem((4, 4), 1.0),
            &default_bands(),
            MaskAnchor::Centered,
        );
        let labels: Vec<&str> = stats.bands.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["0.0-0.3", "0.3-0.7", "0.7-1.0"]);
    }
}
