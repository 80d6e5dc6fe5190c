/*
Feedback Delay Line
===================

  read  = buffer[write_pos - delay_samples]      (linear interpolation)
  write = input + read * feedback

The buffer holds `maxdelay` seconds plus one guard sample so the
interpolation never reads past the end. Requested delays are clamped to
[1 sample, maxdelay]; feedback is clamped to [0, 1].
*/

pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Delay line able to hold `max_samples` of history.
    pub fn new(max_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_samples.max(1) + 1],
            write_pos: 0,
        }
    }

    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    #[inline]
    fn read(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(1.0, self.max_delay() as f32);

        let mut pos = self.write_pos as f32 - delay;
        if pos < 0.0 {
            pos += len as f32;
        }
        let index = pos as usize % len;
        let frac = pos - pos.floor();
        let next = (index + 1) % len;

        self.buffer[index] * (1.0 - frac) + self.buffer[next] * frac
    }

    pub fn next_sample(&mut self, sample: f32, delay_samples: f32, feedback: f32) -> f32 {
        let delayed = self.read(delay_samples);
        self.buffer[self.write_pos] = sample + delayed * feedback.clamp(0.0, 1.0);
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        delayed
    }

    pub fn render(&mut self, input: &[f32], out: &mut [f32], delay_samples: f32, feedback: f32) {
        for (o, &x) in out.iter_mut().zip(input) {
            *o = self.next_sample(x, delay_samples, feedback);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
