//! Scenario benchmarks.
//!
//! Objects are wired the way a patch script would wire them and rendered
//! through the engine, so these include slot scheduling, input gathering
//! and output mixing on top of the kernels.

mod broadcast;
mod patches;

pub use broadcast::bench_broadcast;
pub use patches::bench_patches;

use fanout_dsp::{EngineConfig, EngineContext};

use crate::SAMPLE_RATE;

pub fn context(block_size: usize) -> EngineContext {
    let config = EngineConfig::default()
        .sample_rate(SAMPLE_RATE)
        .block_size(block_size)
        .nchnls(2);
    EngineContext::new(config).unwrap()
}
