//! Low-level DSP kernels used by the engine units.
//!
//! These components are allocation-free once constructed and realtime-safe.
//! They only know about sample buffers and plain parameters; broadcasting,
//! scheduling and routing happen in the layers above.

/// Fractional feedback delay line.
pub mod delay;
/// Waveshapers, range folding and bit/rate reduction.
pub mod distortion;
/// Compressor and noise gate followers.
pub mod dynamics;
/// Velocity-gated ADSR envelope generator.
pub mod envelope;
/// State-variable filter with four responses.
pub mod filter;
/// Table and breakpoint interpolation.
pub mod interp;
/// Phase accumulators, oscillators and noise sources.
pub mod oscillator;
/// Multichannel panning gain laws.
pub mod pan;

pub use envelope::EnvelopeState;
pub use interp::Interp;
