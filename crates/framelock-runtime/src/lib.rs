// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! # framelock-runtime
//!
//! The glue between the shared-memory primitives and the engines that
//! produce and consume them: capture, analysis, and state-detection loops,
//! the collaborator traits those loops are generic over, session region
//! naming, and mock implementations for tests and demos.
//!
//! Engines differ only in how they turn an image into a scalar or a label,
//! so they are modeled as "produces T from image" capabilities
//! ([`FrameAnalyzer`], [`StateDetector`]) with concrete variants, not as a
//! hierarchy. Real device engines and touch drivers live outside this
//! workspace; the traits here are their contracts.

pub mod analysis;
pub mod capture;
pub mod engines;
pub mod error;
pub mod mock;
pub mod session;

pub use analysis::{run_analysis, run_state_detection};
pub use capture::run_capture;
pub use engines::{CaptureEngine, FrameAnalyzer, FrameShape, StateDetector};
pub use error::{EngineError, RuntimeError};
pub use mock::{CounterAnalyzer, MockCaptureEngine, MockDriver, ThresholdStateDetector};
pub use session::SessionNames;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
