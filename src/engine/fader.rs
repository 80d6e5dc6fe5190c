use super::UnitId;

/*
Input Crossfade
===============

Replacing the input of a running unit with a hard switch clicks. The fader
keeps the old source alive for `fadetime` and blends:

  t    = elapsed / fade_samples          (0 → 1)
  out  = old * sqrt(1 - t) + new * sqrt(t)

Square-root gains keep the summed power roughly constant for uncorrelated
sources, so the level does not dip halfway through the fade.

Once t reaches 1 the old source is forgotten and the fader is a plain
passthrough of the new one.
*/

#[derive(Debug, Clone)]
pub struct InputFader {
    current: UnitId,
    previous: Option<UnitId>,
    fade_samples: u32,
    fade_pos: u32,
}

impl InputFader {
    pub fn new(source: UnitId) -> Self {
        Self {
            current: source,
            previous: None,
            fade_samples: 0,
            fade_pos: 0,
        }
    }

    pub fn current(&self) -> UnitId {
        self.current
    }

    pub fn previous(&self) -> Option<UnitId> {
        self.previous
    }

    pub fn is_fading(&self) -> bool {
        self.previous.is_some()
    }

    /// Start fading from the current source to `source`.
    pub fn replace(&mut self, source: UnitId, fade_samples: u32) {
        if fade_samples == 0 {
            self.current = source;
            self.previous = None;
            return;
        }
        self.previous = Some(self.current);
        self.current = source;
        self.fade_samples = fade_samples;
        self.fade_pos = 0;
    }

    /// Mix one block. `old` is ignored when no fade is running.
    pub fn render(&mut self, new: &[f32], old: &[f32], out: &mut [f32]) {
        if self.previous.is_none() {
            out.copy_from_slice(new);
            return;
        }

        for ((sample, &n), &o) in out.iter_mut().zip(new).zip(old) {
            if self.fade_pos >= self.fade_samples {
                *sample = n;
                continue;
            }
            let t = self.fade_pos as f32 / self.fade_samples as f32;
            *sample = o * (1.0 - t).sqrt() + n * t.sqrt();
            self.fade_pos += 1;
        }

        if self.fade_pos >= self.fade_samples {
            self.previous = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> UnitId {
        UnitId {
            index,
            generation: 0,
        }
    }

    #[test]
    fn passthrough_without_fade() {
        let mut fader = InputFader::new(id(0));
        let mut out = [0.0; 4];
        fader.render(&[0.5; 4], &[9.0; 4], &mut out);
        assert_eq!(out, [0.5; 4]);
    }

    #[test]
    fn crossfade_uses_sqrt_gains() {
        let mut fader = InputFader::new(id(0));
        fader.replace(id(1), 4);
        assert_eq!(fader.previous(), Some(id(0)));

        let mut out = [0.0; 4];
        fader.render(&[1.0; 4], &[0.0; 4], &mut out);

        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.25f32.sqrt()).abs() < 1e-6);
        assert!((out[2] - 0.5f32.sqrt()).abs() < 1e-6);
        assert!(!fader.is_fading(), "fade should complete after 4 samples");
    }

    #[test]
    fn zero_fadetime_switches_immediately() {
        let mut fader = InputFader::new(id(0));
        fader.replace(id(2), 0);
        assert_eq!(fader.current(), id(2));
        assert!(!fader.is_fading());
    }
}
