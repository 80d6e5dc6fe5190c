pub mod automation; // Line-oriented control and note stream files
pub mod broadcast; // Multichannel argument expansion
pub mod cleanup;
pub mod command; // Address-based control surface
pub mod config;
pub mod dsp;
pub mod engine; // Unit table, scheduling and output mixing
pub mod error;
pub mod io;
pub mod objects; // User-facing proxy objects
pub mod tables;

pub use broadcast::{broadcast, wrap, Arg, Broadcast, Value};
pub use config::EngineConfig;
pub use engine::{EngineContext, Handle, UnitId};
pub use error::{Error, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
