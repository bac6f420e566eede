//! # Spectral Workbench
//!
//! A multi-backend image decomposition engine: Fourier, cosine, wavelet,
//! wavelet-packet, and directional transforms behind one uniform pipeline of
//! forward decomposition, coefficient filtering, display rendering, band
//! metrics, and inverse reconstruction. Decompositions are cached in bounded
//! LRU caches with explicit disposal, and in-flight runs are superseded
//! cooperatively through a monotone task token.
//!
//! ## Quick Start
//!
//! ```rust
//! use spectral_workbench::{
//!     FilterMode, FilterSpec, ImageSource, TransformEngine, TransformOptions,
//!     TransformRequest, TransformType,
//! };
//!
//! let mut engine = TransformEngine::with_defaults();
//! let request = TransformRequest {
//!     transform: TransformType::Fourier,
//!     image_id: "checker".to_string(),
//!     source: ImageSource::Luma8 {
//!         pixels: vec![0; 64 * 64],
//!         width: 64,
//!         height: 64,
//!     },
//!     options: TransformOptions::default(),
//!     filter: Some(FilterSpec {
//!         mode: FilterMode::Lowpass,
//!         radius: 0.3,
//!         ..FilterSpec::default()
//!     }),
//! };
//!
//! let result = engine.run(&request).unwrap();
//! assert!(!result.is_cancelled());
//! ```
//!
//! ## Core Modules
//!
//! - [`engine`] - Cached pipeline with cooperative cancellation
//! - [`backend`] - The five transform backends behind one trait
//! - [`mask`] - Frequency/coefficient mask construction
//! - [`stats`] - Radial band-energy statistics
//! - [`config`] - Engine configuration via TOML
//! - [`logging`] - JSON line-delimited pipeline logging

pub mod backend;
pub mod config;
pub mod directional;
pub mod engine;
pub mod error;
pub mod logging;
pub mod mask;
pub mod matrix;
pub mod stats;
pub mod wavelet;

pub use backend::{
    backend_for, backend_for_tag, DisplayOutput, FilterMode, FilterSpec, StateMeta,
    ThresholdKind, TransformBackend, TransformOptions, TransformState, TransformType,
};
pub use config::EngineConfig;
pub use engine::{
    PipelineOutput, PipelineResult, StateCache, TaskToken, TransformEngine, TransformRequest,
};
pub use error::{EngineError, EngineResult};
pub use mask::{build_mask, MaskAnchor, MaskMode, MaskParams, MaskShape};
pub use matrix::ImageSource;
pub use stats::{default_bands, BandEnergy, BandRange, BandStats};
pub use wavelet::WaveletKind;
