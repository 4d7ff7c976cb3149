// Pipeline Tracer - Diagnostic logging for the impulse analysis pipeline
//
// Provides structured trace points at each stage of an analysis so that
// intermediate values (peak positions, density, fit residuals) can be
// inspected without changing what the pipeline returns.
//
// Usage:
//   - Enable with IMPULSE_TRACE=1 environment variable (via `init()`)
//   - Traces appear in logs with [TRACE] prefix
//   - Each trace includes stage name, sequence number, and relevant metrics

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Environment variable consulted by `init()`
pub const TRACE_ENV_VAR: &str = "IMPULSE_TRACE";

/// Global flag to enable/disable pipeline tracing
static TRACING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Counter for trace events (helps correlate related traces)
static TRACE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Initialize pipeline tracing based on environment variable
pub fn init() {
    let enabled = std::env::var(TRACE_ENV_VAR)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);
    TRACING_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled {
        log::info!(
            "[TRACE] Pipeline tracing ENABLED - set {}=0 to disable",
            TRACE_ENV_VAR
        );
    }
}

/// Check if tracing is enabled
#[inline]
pub fn is_enabled() -> bool {
    TRACING_ENABLED.load(Ordering::Relaxed)
}

/// Enable tracing at runtime
pub fn enable() {
    TRACING_ENABLED.store(true, Ordering::SeqCst);
    log::info!("[TRACE] Pipeline tracing enabled at runtime");
}

/// Disable tracing at runtime
pub fn disable() {
    TRACING_ENABLED.store(false, Ordering::SeqCst);
    log::info!("[TRACE] Pipeline tracing disabled at runtime");
}

/// Pipeline stages for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Waveform mixed down and peak-normalized
    Normalized,
    /// Frame-averaged spectral summary computed
    Spectral,
    /// RMS envelope and decay end located
    Envelope,
    /// Envelope peaks accepted
    Peaks,
    /// Decay-fit residual computed
    Turbulence,
    /// Classification decision made
    Classification,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Normalized => "NORMALIZE",
            PipelineStage::Spectral => "SPECTRAL",
            PipelineStage::Envelope => "ENVELOPE",
            PipelineStage::Peaks => "PEAKS",
            PipelineStage::Turbulence => "TURBULENCE",
            PipelineStage::Classification => "CLASSIFY",
        }
    }
}

/// Global start time for relative timestamps
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

fn get_timestamp_us() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_micros() as u64
}

/// Log a trace event at a pipeline stage
///
/// Only logs if tracing is enabled.
#[inline]
pub fn trace(stage: PipelineStage, message: &str) {
    if !is_enabled() {
        return;
    }

    let id = TRACE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let ts = get_timestamp_us();

    log::info!(
        "[TRACE] {:>12} #{:06} @{:>10}us | {}",
        stage.as_str(),
        id,
        ts,
        message
    );
}

/// Log a trace event with formatted arguments
#[macro_export]
macro_rules! trace_pipeline {
    ($stage:expr, $($arg:tt)*) => {
        if $crate::debug::pipeline_tracer::is_enabled() {
            $crate::debug::pipeline_tracer::trace($stage, &format!($($arg)*));
        }
    };
}

/// Trace mixdown and normalization
pub fn trace_normalized(channels: usize, frames: usize, peak: f32) {
    crate::trace_pipeline!(
        PipelineStage::Normalized,
        "channels={} frames={} input_peak={:.4}",
        channels,
        frames,
        peak
    );
}

/// Trace the spectral summary
pub fn trace_spectral(centroid: f32, flatness: f32, frames: usize) {
    crate::trace_pipeline!(
        PipelineStage::Spectral,
        "centroid={:.1}Hz flatness={:.4} frames={}",
        centroid,
        flatness,
        frames
    );
}

/// Trace envelope length and decay end
pub fn trace_envelope(frames: usize, decay_frame: usize) {
    crate::trace_pipeline!(
        PipelineStage::Envelope,
        "frames={} decay_frame={}",
        frames,
        decay_frame
    );
}

/// Trace accepted peak positions
pub fn trace_peaks(peak_frames: &[usize], decay_secs: f32) {
    crate::trace_pipeline!(
        PipelineStage::Peaks,
        "count={} frames={:?} decay={:.3}s",
        peak_frames.len(),
        peak_frames,
        decay_secs
    );
}

/// Trace turbulence (fit residual)
pub fn trace_turbulence(turbulence: f32) {
    crate::trace_pipeline!(
        PipelineStage::Turbulence,
        "residual={:.3}dB",
        turbulence
    );
}

/// Trace classification result with the density that drove it
pub fn trace_classification(ir_type: &str, texture: &str, density: f32, high_density: bool) {
    crate::trace_pipeline!(
        PipelineStage::Classification,
        "type={} texture={} density={:.2}/s {}",
        ir_type,
        texture,
        density,
        if high_density { "DENSE" } else { "SPARSE" }
    );
}
