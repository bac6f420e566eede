//! End-to-end pipeline tests: caching, supersession, filtering, errors.

use spectral_workbench::{
    EngineConfig, EngineError, FilterMode, FilterSpec, ImageSource, MaskShape, PipelineResult,
    TransformEngine, TransformOptions, TransformRequest, TransformType,
};

fn checkerboard(size: usize, block: usize) -> ImageSource {
    let pixels: Vec<u8> = (0..size * size)
        .map(|i| {
            let (r, c) = (i / size, i % size);
            if (r / block + c / block) % 2 == 0 {
                255
            } else {
                0
            }
        })
        .collect();
    ImageSource::Luma8 {
        pixels,
        width: size,
        height: size,
    }
}

/// Pseudo-random texture: every wavelet subband carries energy, unlike the
/// checkerboard whose constant blocks leave Haar details exactly zero.
fn textured(size: usize) -> ImageSource {
    let pixels: Vec<u8> = (0..size * size).map(|i| ((i * 37 + 11) % 251) as u8).collect();
    ImageSource::Luma8 {
        pixels,
        width: size,
        height: size,
    }
}

fn request(transform: TransformType, image_id: &str, filter: Option<FilterSpec>) -> TransformRequest {
    TransformRequest {
        transform,
        image_id: image_id.to_string(),
        source: checkerboard(64, 8),
        options: TransformOptions::default(),
        filter,
    }
}

fn complete(result: PipelineResult) -> spectral_workbench::PipelineOutput {
    match result {
        PipelineResult::Complete(output) => *output,
        PipelineResult::Cancelled => panic!("run was unexpectedly cancelled"),
    }
}

#[test]
fn unfiltered_run_produces_views_and_metrics() {
    let mut engine = TransformEngine::with_defaults();
    let output = complete(
        engine
            .run(&request(TransformType::Fourier, "img-1", None))
            .unwrap(),
    );
    assert_eq!(output.reconstructed.dim(), (64, 64));
    assert_eq!(output.display.dim(), (64, 64));
    assert!(output.mask_display.is_none());
    assert_eq!(output.meta.transform, "fourier");
    assert_eq!(output.meta.original_size, (64, 64));
    // The checkerboard's DC term plus its fundamental dominate the spectrum.
    assert!(output.metrics.bands[0].ratio > 0.6);
}

#[test]
fn forward_states_are_cached_per_image_and_backend() {
    let mut engine = TransformEngine::with_defaults();
    let req = request(TransformType::Cosine, "img-1", None);
    engine.run(&req).unwrap();
    engine.run(&req).unwrap();
    assert_eq!(engine.forward_cache().len(), 1);
    assert_eq!(engine.forward_cache().hits(), 1);

    engine
        .run(&request(TransformType::Wavelet, "img-1", None))
        .unwrap();
    assert_eq!(engine.forward_cache().len(), 2);
}

#[test]
fn forward_cache_evicts_beyond_capacity() {
    let mut engine = TransformEngine::new(EngineConfig {
        forward_capacity: 4,
        ..EngineConfig::default()
    });
    for i in 0..5 {
        engine
            .run(&request(TransformType::Cosine, &format!("img-{}", i), None))
            .unwrap();
    }
    assert_eq!(engine.forward_cache().len(), 4);
    // Re-running the oldest image misses; the newest still hits.
    let misses = engine.forward_cache().misses();
    engine
        .run(&request(TransformType::Cosine, "img-0", None))
        .unwrap();
    assert_eq!(engine.forward_cache().misses(), misses + 1);
}

#[test]
fn identity_filter_adds_no_filtered_entry() {
    let mut engine = TransformEngine::with_defaults();
    let spec = FilterSpec::default();
    assert!(spec.normalized().is_none());
    engine
        .run(&request(TransformType::Fourier, "img-1", Some(spec)))
        .unwrap();
    assert!(engine.filtered_cache().is_empty());
}

#[test]
fn filtered_states_are_cached_by_canonical_spec() {
    let mut engine = TransformEngine::with_defaults();
    let spec = FilterSpec {
        mode: FilterMode::Lowpass,
        shape: MaskShape::Ideal,
        radius: 0.25,
        ..FilterSpec::default()
    };
    let req = request(TransformType::Fourier, "img-1", Some(spec));
    engine.run(&req).unwrap();
    engine.run(&req).unwrap();
    assert_eq!(engine.filtered_cache().len(), 1);
    assert_eq!(engine.filtered_cache().hits(), 1);
}

#[test]
fn lowpass_filter_strips_high_bands_and_renders_its_mask() {
    let mut engine = TransformEngine::with_defaults();
    let spec = FilterSpec {
        mode: FilterMode::Lowpass,
        shape: MaskShape::Ideal,
        radius: 0.2,
        ..FilterSpec::default()
    };
    let output = complete(
        engine
            .run(&request(TransformType::Fourier, "img-1", Some(spec)))
            .unwrap(),
    );
    assert!(output.mask_display.is_some());
    assert_eq!(output.metrics.bands[1].energy, 0.0);
    assert_eq!(output.metrics.bands[2].energy, 0.0);
    assert!(output.metrics.bands[0].energy > 0.0);
}

#[test]
fn full_radius_ideal_lowpass_changes_nothing() {
    let mut engine = TransformEngine::with_defaults();
    // Origin-anchored cosine masks measure radius against the diagonal, so
    // radius 1.0 covers the whole coefficient plane.
    let spec = FilterSpec {
        mode: FilterMode::Lowpass,
        shape: MaskShape::Ideal,
        radius: 1.0,
        ..FilterSpec::default()
    };
    let plain = complete(
        engine
            .run(&request(TransformType::Cosine, "img-1", None))
            .unwrap(),
    );
    let filtered = complete(
        engine
            .run(&request(TransformType::Cosine, "img-1", Some(spec)))
            .unwrap(),
    );
    assert_eq!(plain.reconstructed, filtered.reconstructed);
    for (a, b) in plain.metrics.bands.iter().zip(filtered.metrics.bands.iter()) {
        assert!((a.ratio - b.ratio).abs() < 1e-9);
    }
}

#[test]
fn superseded_token_reports_cancelled() {
    let mut engine = TransformEngine::with_defaults();
    let stale = engine.begin_request();
    let fresh = engine.begin_request();

    let result = engine
        .run_with_token(stale, &request(TransformType::Fourier, "img-1", None))
        .unwrap();
    assert!(result.is_cancelled());

    let result = engine
        .run_with_token(fresh, &request(TransformType::Fourier, "img-1", None))
        .unwrap();
    assert!(!result.is_cancelled());
}

#[test]
fn cancelled_run_still_caches_its_forward_state() {
    let mut engine = TransformEngine::with_defaults();
    let stale = engine.begin_request();
    engine.begin_request();

    let result = engine
        .run_with_token(stale, &request(TransformType::Wavelet, "img-7", None))
        .unwrap();
    assert!(result.is_cancelled());
    // The decomposition itself is reusable; only the stale views are dropped.
    assert_eq!(engine.forward_cache().len(), 1);
}

#[test]
fn cancel_all_supersedes_in_flight_tokens() {
    let mut engine = TransformEngine::with_defaults();
    let token = engine.begin_request();
    engine.cancel_all();
    let result = engine
        .run_with_token(token, &request(TransformType::Cosine, "img-1", None))
        .unwrap();
    assert!(result.is_cancelled());
}

#[test]
fn decode_failures_propagate_as_errors() {
    let mut engine = TransformEngine::with_defaults();
    let req = TransformRequest {
        transform: TransformType::Fourier,
        image_id: "broken".to_string(),
        source: ImageSource::Luma8 {
            pixels: vec![1, 2, 3],
            width: 4,
            height: 4,
        },
        options: TransformOptions::default(),
        filter: None,
    };
    assert!(matches!(engine.run(&req), Err(EngineError::Decode { .. })));
    // Nothing was cached for the failed request.
    assert!(engine.forward_cache().is_empty());
}

#[test]
fn unknown_transform_tag_is_an_error_not_a_cancellation() {
    let err = spectral_workbench::backend_for_tag("radon");
    assert!(matches!(err, Err(EngineError::UnsupportedTransform { .. })));
}

#[test]
fn clear_caches_empties_both_tiers() {
    let mut engine = TransformEngine::with_defaults();
    let spec = FilterSpec {
        mode: FilterMode::Highpass,
        radius: 0.3,
        ..FilterSpec::default()
    };
    engine
        .run(&request(TransformType::Fourier, "img-1", Some(spec)))
        .unwrap();
    assert!(!engine.forward_cache().is_empty());
    assert!(!engine.filtered_cache().is_empty());
    engine.clear_caches();
    assert!(engine.forward_cache().is_empty());
    assert!(engine.filtered_cache().is_empty());
}

#[test]
fn wavelet_pipeline_reports_geometry_meta() {
    let mut engine = TransformEngine::with_defaults();
    let req = TransformRequest {
        transform: TransformType::Wavelet,
        image_id: "img-1".to_string(),
        source: checkerboard(48, 8),
        options: TransformOptions {
            wavelet: Some("db2".to_string()),
            level: Some(2),
        },
        filter: None,
    };
    let output = complete(engine.run(&req).unwrap());
    assert_eq!(output.meta.transform, "wavelet");
    assert_eq!(output.meta.original_size, (48, 48));
    assert_eq!(output.meta.padded_size, Some((48, 48)));
    assert_eq!(output.meta.levels, Some(2));
    assert_eq!(output.meta.wavelet, Some("db2"));
}

#[test]
fn ideal_lowpass_concentrates_checkerboard_energy_in_low_band() {
    let mut engine = TransformEngine::with_defaults();
    let spec = FilterSpec {
        mode: FilterMode::Lowpass,
        shape: MaskShape::Ideal,
        radius: 0.1,
        ..FilterSpec::default()
    };
    let req = TransformRequest {
        transform: TransformType::Fourier,
        image_id: "checker-256".to_string(),
        source: checkerboard(256, 32),
        options: TransformOptions::default(),
        filter: Some(spec),
    };
    let output = complete(engine.run(&req).unwrap());
    assert!(
        output.metrics.bands[0].ratio > 0.9,
        "low band ratio {}",
        output.metrics.bands[0].ratio
    );
}

#[test]
fn packet_meta_tracks_leaf_energy_through_filtering() {
    let mut engine = TransformEngine::with_defaults();
    let packet_request = |filter: Option<FilterSpec>| TransformRequest {
        transform: TransformType::WaveletPacket,
        image_id: "tex-1".to_string(),
        source: textured(64),
        options: TransformOptions::default(),
        filter,
    };
    let plain = complete(engine.run(&packet_request(None)).unwrap());
    let spec = FilterSpec {
        mode: FilterMode::Threshold,
        selected_nodes: vec!["LL".to_string()],
        ..FilterSpec::default()
    };
    let filtered = complete(engine.run(&packet_request(Some(spec))).unwrap());
    let before = plain.meta.total_energy.expect("packet meta carries energy");
    let after = filtered.meta.total_energy.expect("packet meta carries energy");
    assert!(after < before);
    assert!(after > 0.0);
}

#[test]
fn every_backend_completes_the_full_pipeline() {
    let mut engine = TransformEngine::with_defaults();
    for transform in [
        TransformType::Fourier,
        TransformType::Cosine,
        TransformType::Wavelet,
        TransformType::WaveletPacket,
        TransformType::Directional,
    ] {
        let output = complete(engine.run(&request(transform, "img-1", None)).unwrap());
        assert_eq!(output.reconstructed.dim(), (64, 64), "{:?}", transform);
        assert!(output.metrics.total_energy > 0.0, "{:?}", transform);
    }
}
