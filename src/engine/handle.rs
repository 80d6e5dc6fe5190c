use std::fmt;

use tracing::trace;

use super::{EngineContext, UnitId};
use crate::{broadcast::Value, Result};

/// Owning reference to one engine unit.
///
/// Dropping the handle releases the unit.
pub struct Handle {
    id: UnitId,
    ctx: EngineContext,
}

impl Handle {
    pub(crate) fn new(id: UnitId, ctx: EngineContext) -> Self {
        Self { id, ctx }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn set_param(&self, name: &str, value: &Value) -> Result<()> {
        self.ctx.lock().set_param(self.id, name, value)
    }

    pub fn set_input(&self, k: usize, source: UnitId, fadetime: f32) -> Result<()> {
        self.ctx.lock().set_input(self.id, k, source, fadetime)
    }

    pub fn play(&self, dur: f32, delay: f32) -> Result<()> {
        self.ctx.lock().play(self.id, dur, delay)
    }

    pub fn out(&self, chnl: usize, dur: f32, delay: f32) -> Result<()> {
        self.ctx.lock().out(self.id, chnl, dur, delay)
    }

    pub fn stop(&self) -> Result<()> {
        self.ctx.lock().stop(self.id)
    }

    pub fn is_playing(&self) -> bool {
        self.ctx.lock().is_playing(self.id).unwrap_or(false)
    }

    /// First sample of the last rendered block.
    pub fn value(&self) -> Result<f32> {
        self.ctx.lock().value(self.id)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(err) = self.ctx.lock().release(self.id) {
            trace!(unit = %self.id, %err, "release on drop failed");
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Inputs, ProcessCtx, Processor};
    use crate::EngineConfig;

    struct Silence;

    impl Processor for Silence {
        fn process(&mut self, _inputs: &Inputs<'_>, out: &mut [f32], _ctx: &ProcessCtx) {
            out.fill(0.0);
        }
    }

    #[test]
    fn dropping_handle_releases_unit() {
        let ctx = EngineContext::new(EngineConfig::default()).unwrap();
        let handle = ctx.add_unit(Box::new(Silence), &[]).unwrap();
        assert_eq!(ctx.unit_count(), 1);
        assert!(!handle.is_playing(), "autostart waits for the next block");

        ctx.process_block(&mut [0.0; 512]);
        assert!(handle.is_playing());

        drop(handle);
        assert_eq!(ctx.unit_count(), 0);
    }
}
