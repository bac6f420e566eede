//! Wavelet-packet quad-tree decomposition and reconstruction.
//!
//! Unlike the multi-level DWT, the packet transform recurses into all four
//! subbands at every level, producing a complete quad-tree of depth
//! `level_count`. Each node owns its coefficient buffer and self-energy;
//! reconstruction runs bottom-up, inverting one level per tree depth.
//!
//! Node paths are `/`-joined subband labels from the root (`""`), e.g.
//! `"LL/HH"`. Child order is always LL, LH, HL, HH.

use std::collections::HashMap;

use super::{single_level_forward, single_level_inverse, WaveletKind};

/// Subband labels in child order.
pub const SUBBAND_LABELS: [&str; 4] = ["LL", "LH", "HL", "HH"];

/// One node of the packet quad-tree.
#[derive(Clone, Debug)]
pub struct PacketNode {
    /// `/`-joined subband lineage; empty for the root.
    pub path: String,
    pub level: u32,
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    /// Sum of squares of `data`.
    pub energy: f64,
    pub is_leaf: bool,
}

/// Sum of squared coefficients.
pub fn energy_of(data: &[f32]) -> f64 {
    data.iter().map(|&v| f64::from(v) * f64::from(v)).sum()
}

/// Decompose a padded plane into a complete quad-tree of depth `levels`.
/// `width` and `height` must be multiples of `2^levels`. Nodes are emitted in
/// preorder, so a parent always precedes its children.
pub fn decompose(plane: &[f32], width: usize, height: usize, levels: u32, kind: WaveletKind) -> Vec<PacketNode> {
    debug_assert_eq!(plane.len(), width * height);
    let mut nodes = Vec::new();
    decompose_node(plane.to_vec(), String::new(), 0, width, height, levels, kind, &mut nodes);
    nodes
}

#[allow(clippy::too_many_arguments)]
fn decompose_node(
    data: Vec<f32>,
    path: String,
    level: u32,
    width: usize,
    height: usize,
    levels: u32,
    kind: WaveletKind,
    nodes: &mut Vec<PacketNode>,
) {
    let is_leaf = level == levels;
    let energy = energy_of(&data);

    let children = if is_leaf {
        None
    } else {
        let mut transformed = data.clone();
        single_level_forward(&mut transformed, width, height, kind);
        Some(split_quadrants(&transformed, width, height))
    };

    nodes.push(PacketNode {
        path: path.clone(),
        level,
        width,
        height,
        data,
        energy,
        is_leaf,
    });

    if let Some(children) = children {
        for (label, child) in SUBBAND_LABELS.iter().zip(children.into_iter()) {
            let child_path = join_path(&path, label);
            decompose_node(
                child,
                child_path,
                level + 1,
                width / 2,
                height / 2,
                levels,
                kind,
                nodes,
            );
        }
    }
}

/// Reconstruct the padded plane from the tree's leaves, bottom-up.
///
/// # Panics
///
/// Expects the complete preorder tree produced by [`decompose`] (or by
/// [`filter_leaves`] over one) with matching `width`, `height` and `levels`.
/// Panics when the tree is incomplete or a node path is missing.
pub fn reconstruct(nodes: &[PacketNode], width: usize, height: usize, levels: u32, kind: WaveletKind) -> Vec<f32> {
    assert_eq!(
        nodes.len(),
        ((4usize.pow(levels + 1)) - 1) / 3,
        "packet tree must be the complete quad-tree of depth {}",
        levels
    );
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.path.as_str(), i))
        .collect();
    reconstruct_path(nodes, &index, "", 0, width, height, levels, kind)
}

#[allow(clippy::too_many_arguments)]
fn reconstruct_path(
    nodes: &[PacketNode],
    index: &HashMap<&str, usize>,
    path: &str,
    level: u32,
    width: usize,
    height: usize,
    levels: u32,
    kind: WaveletKind,
) -> Vec<f32> {
    if level == levels {
        let node = &nodes[index[path]];
        return node.data.clone();
    }
    let children: Vec<Vec<f32>> = SUBBAND_LABELS
        .iter()
        .map(|label| {
            let child_path = join_path(path, label);
            reconstruct_path(
                nodes,
                index,
                &child_path,
                level + 1,
                width / 2,
                height / 2,
                levels,
                kind,
            )
        })
        .collect();
    let mut merged = merge_quadrants(&children, width, height);
    single_level_inverse(&mut merged, width, height, kind);
    merged
}

/// Keep the leaves matching a selection of path prefixes (all leaves when the
/// selection is empty), zero the rest, and apply an optional threshold to the
/// retained leaves. Internal-node buffers are left untouched; reconstruction
/// and propagated statistics only consult leaves.
pub fn filter_leaves(
    nodes: &[PacketNode],
    selected: &[String],
    threshold: Option<(ThresholdMode, f32)>,
) -> Vec<PacketNode> {
    nodes
        .iter()
        .map(|node| {
            if !node.is_leaf {
                return node.clone();
            }
            let keep = selected.is_empty() || is_selected(&node.path, selected);
            let mut data = if keep {
                node.data.clone()
            } else {
                vec![0.0; node.data.len()]
            };
            if keep {
                if let Some((mode, lambda)) = threshold {
                    apply_threshold(&mut data, mode, lambda);
                }
            }
            let energy = energy_of(&data);
            PacketNode {
                data,
                energy,
                ..node.clone()
            }
        })
        .collect()
}

/// A leaf is selected when its path equals a selection entry or descends from
/// one (`"LL" == sel` or path starts with `"LL/"`).
fn is_selected(path: &str, selected: &[String]) -> bool {
    selected
        .iter()
        .any(|sel| path == sel || path.starts_with(&format!("{}/", sel)))
}

/// Sign-preserving coefficient thresholding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdMode {
    /// Zero coefficients with magnitude below lambda.
    Hard,
    /// Shrink magnitudes by lambda, zeroing those below it.
    Soft,
}

pub fn apply_threshold(data: &mut [f32], mode: ThresholdMode, lambda: f32) {
    if lambda <= 0.0 {
        return;
    }
    for value in data.iter_mut() {
        let abs = value.abs();
        *value = match mode {
            ThresholdMode::Hard => {
                if abs >= lambda {
                    *value
                } else {
                    0.0
                }
            }
            ThresholdMode::Soft => {
                if abs >= lambda {
                    value.signum() * (abs - lambda)
                } else {
                    0.0
                }
            }
        };
    }
}

/// Per-node energies with leaf energies propagated to every ancestor: a
/// leaf's entry is its own energy, an internal node's entry is the sum over
/// its descendant leaves, and the root's entry is the tree total.
pub fn propagated_energies(nodes: &[PacketNode]) -> Vec<f64> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.path.as_str(), i))
        .collect();
    let mut energies = vec![0.0f64; nodes.len()];
    for node in nodes.iter().filter(|n| n.is_leaf) {
        // Credit the leaf itself and every ancestor prefix, root included.
        energies[index[node.path.as_str()]] += node.energy;
        let mut prefix = node.path.as_str();
        loop {
            prefix = match prefix.rfind('/') {
                Some(pos) => &prefix[..pos],
                None => "",
            };
            energies[index[prefix]] += node.energy;
            if prefix.is_empty() {
                break;
            }
        }
    }
    energies
}

fn join_path(parent: &str, label: &str) -> String {
    if parent.is_empty() {
        label.to_string()
    } else {
        format!("{}/{}", parent, label)
    }
}

/// Extract the four quadrants of a transformed plane in LL, LH, HL, HH order.
fn split_quadrants(data: &[f32], width: usize, height: usize) -> Vec<Vec<f32>> {
    let (hw, hh) = (width / 2, height / 2);
    // Quadrant origins: LL top-left, LH bottom-left, HL top-right, HH bottom-right.
    let origins = [(0, 0), (hh, 0), (0, hw), (hh, hw)];
    origins
        .iter()
        .map(|&(r0, c0)| {
            let mut quad = vec![0.0f32; hw * hh];
            for r in 0..hh {
                for c in 0..hw {
                    quad[r * hw + c] = data[(r0 + r) * width + (c0 + c)];
                }
            }
            quad
        })
        .collect()
}

/// Inverse of [`split_quadrants`].
fn merge_quadrants(children: &[Vec<f32>], width: usize, height: usize) -> Vec<f32> {
    let (hw, hh) = (width / 2, height / 2);
    let origins = [(0, 0), (hh, 0), (0, hw), (hh, hw)];
    let mut merged = vec![0.0f32; width * height];
    for (child, &(r0, c0)) in children.iter().zip(origins.iter()) {
        for r in 0..hh {
            for c in 0..hw {
                merged[(r0 + r) * width + (c0 + c)] = child[r * hw + c];
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plane(width: usize, height: usize) -> Vec<f32> {
        (0..width * height)
            .map(|i| ((i * 17 + 3) % 41) as f32 - 20.0)
            .collect()
    }

    fn node_count(levels: u32) -> usize {
        // Complete quad-tree: (4^(L+1) - 1) / 3
        ((4usize.pow(levels + 1)) - 1) / 3
    }

    #[test]
    fn test_tree_is_complete() {
        let plane = sample_plane(8, 8);
        let nodes = decompose(&plane, 8, 8, 2, WaveletKind::Haar);
        assert_eq!(nodes.len(), node_count(2));
        assert_eq!(nodes[0].path, "");
        assert!(!nodes[0].is_leaf);
        let leaves = nodes.iter().filter(|n| n.is_leaf).count();
        assert_eq!(leaves, 16);
        for node in &nodes {
            assert_eq!(node.is_leaf, node.level == 2);
            assert_eq!(node.width, 8 >> node.level);
        }
    }

    #[test]
    fn test_roundtrip() {
        for kind in [WaveletKind::Haar, WaveletKind::Db2] {
            let plane = sample_plane(16, 8);
            let nodes = decompose(&plane, 16, 8, 2, kind);
            let restored = reconstruct(&nodes, 16, 8, 2, kind);
            for (a, b) in plane.iter().zip(restored.iter()) {
                assert!((a - b).abs() < 1e-2, "{:?}: {} vs {}", kind, a, b);
            }
        }
    }

    #[test]
    #[should_panic(expected = "complete quad-tree")]
    fn test_reconstruct_rejects_truncated_tree() {
        let plane = sample_plane(8, 8);
        let mut nodes = decompose(&plane, 8, 8, 2, WaveletKind::Haar);
        nodes.truncate(nodes.len() - 1);
        reconstruct(&nodes, 8, 8, 2, WaveletKind::Haar);
    }

    #[test]
    fn test_leaf_energy_sums_to_root() {
        let plane = sample_plane(16, 16);
        let nodes = decompose(&plane, 16, 16, 3, WaveletKind::Haar);
        let leaf_sum: f64 = nodes.iter().filter(|n| n.is_leaf).map(|n| n.energy).sum();
        // Orthonormal bank preserves energy level by level.
        assert!(
            (leaf_sum - nodes[0].energy).abs() < nodes[0].energy * 1e-4,
            "leaf sum {} vs root {}",
            leaf_sum,
            nodes[0].energy
        );
    }

    #[test]
    fn test_propagated_energies_match_descendant_leaves() {
        let plane = sample_plane(8, 8);
        let nodes = decompose(&plane, 8, 8, 2, WaveletKind::Db2);
        let energies = propagated_energies(&nodes);
        for (node, &prop) in nodes.iter().zip(energies.iter()) {
            let descendant_sum: f64 = nodes
                .iter()
                .filter(|n| {
                    n.is_leaf
                        && (n.path == node.path
                            || node.path.is_empty()
                            || n.path.starts_with(&format!("{}/", node.path)))
                })
                .map(|n| n.energy)
                .sum();
            assert!(
                (prop - descendant_sum).abs() < 1e-6,
                "node {}: {} vs {}",
                node.path,
                prop,
                descendant_sum
            );
        }
    }

    #[test]
    fn test_filter_keeps_selected_prefix() {
        let plane = sample_plane(8, 8);
        let nodes = decompose(&plane, 8, 8, 2, WaveletKind::Haar);
        let filtered = filter_leaves(&nodes, &["LL".to_string()], None);
        for node in filtered.iter().filter(|n| n.is_leaf) {
            if node.path.starts_with("LL") {
                assert!(node.energy > 0.0 || node.data.iter().all(|&v| v == 0.0));
            } else {
                assert!(node.data.iter().all(|&v| v == 0.0), "path {}", node.path);
                assert_eq!(node.energy, 0.0);
            }
        }
    }

    #[test]
    fn test_filter_empty_selection_keeps_all() {
        let plane = sample_plane(8, 8);
        let nodes = decompose(&plane, 8, 8, 2, WaveletKind::Haar);
        let filtered = filter_leaves(&nodes, &[], None);
        for (a, b) in nodes.iter().zip(filtered.iter()) {
            assert_eq!(a.data, b.data);
        }
    }

    #[test]
    fn test_hard_threshold() {
        let mut data = vec![3.0, -0.5, -2.0, 0.9];
        apply_threshold(&mut data, ThresholdMode::Hard, 1.0);
        assert_eq!(data, vec![3.0, 0.0, -2.0, 0.0]);
    }

    #[test]
    fn test_soft_threshold_shrinks_and_preserves_sign() {
        let mut data = vec![3.0, -0.5, -2.0, 0.9];
        apply_threshold(&mut data, ThresholdMode::Soft, 1.0);
        assert!((data[0] - 2.0).abs() < 1e-6);
        assert_eq!(data[1], 0.0);
        assert!((data[2] + 1.0).abs() < 1e-6);
        assert_eq!(data[3], 0.0);
    }

    #[test]
    fn test_zero_lambda_is_identity() {
        let mut data = vec![0.1, -0.2, 0.3];
        let original = data.clone();
        apply_threshold(&mut data, ThresholdMode::Soft, 0.0);
        assert_eq!(data, original);
    }
}
