//! Deferred teardown of objects that should outlive the code creating them,
//! e.g. a one-shot sound that must ring out before its units are released.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::objects::Proxy;

pub struct CleanObjects {
    delay: Duration,
    objects: Vec<Box<dyn Proxy>>,
}

impl CleanObjects {
    pub fn new(delay: Duration, objects: Vec<Box<dyn Proxy>>) -> Self {
        Self { delay, objects }
    }

    /// Sleep for the delay on a background thread, then stop and drop every
    /// object. Stop failures are logged, never propagated.
    pub fn start(self) -> JoinHandle<()> {
        thread::spawn(move || {
            thread::sleep(self.delay);
            let count = self.objects.len();
            for mut object in self.objects {
                if let Err(err) = object.stop() {
                    warn!(%err, "stopping object during cleanup failed");
                }
            }
            debug!(count, "objects cleaned up");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::testing::ctx;
    use crate::objects::{Sine, SineParams};

    #[test]
    fn releases_units_after_delay() {
        let ctx = ctx();
        let a = Sine::new(&ctx, SineParams::default()).unwrap();
        let b = Sine::new(&ctx, SineParams {
            freq: vec![1.0, 2.0].into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ctx.unit_count(), 3);

        let objects: Vec<Box<dyn Proxy>> = vec![Box::new(a), Box::new(b)];
        CleanObjects::new(Duration::from_millis(10), objects)
            .start()
            .join()
            .unwrap();
        assert_eq!(ctx.unit_count(), 0);
    }
}
