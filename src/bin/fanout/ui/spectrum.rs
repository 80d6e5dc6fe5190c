//! Log-band spectrum of the scope buffer.

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

const BANDS: usize = 48;
const FLOOR_DB: f64 = -100.0;
/// Share of the previous frame kept in each band
const SMOOTHING: f64 = 0.6;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    /// FFT bin range `[start, end)` per band
    bands: Vec<(usize, usize)>,
    /// `(center_hz, level_db)` per band
    levels: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(size: usize, sample_rate: f32) -> Self {
        let size = size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(size);
        let window = fanout_dsp::tables::hann(size);

        let nyquist = (sample_rate as f64 / 2.0).max(40.0);
        let top = nyquist.min(20_000.0);
        let ratio = top / 20.0;
        let hz_per_bin = sample_rate as f64 / size as f64;
        let last_bin = size / 2;

        let mut bands = Vec::with_capacity(BANDS);
        let mut levels = Vec::with_capacity(BANDS);
        for b in 0..BANDS {
            let lo = 20.0 * ratio.powf(b as f64 / BANDS as f64);
            let hi = 20.0 * ratio.powf((b + 1) as f64 / BANDS as f64);
            let start = ((lo / hz_per_bin) as usize).min(last_bin - 1);
            let end = ((hi / hz_per_bin).ceil() as usize).clamp(start + 1, last_bin);
            bands.push((start, end));
            levels.push(((lo * hi).sqrt(), FLOOR_DB));
        }

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); size],
            bands,
            levels,
        }
    }

    /// Analyse `buffer`; ignored unless it holds exactly one FFT frame.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }
        for ((bin, &x), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *bin = Complex::new(x * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = (self.window.len() as f64 / 2.0).powi(2);
        for ((start, end), (_, level)) in self.bands.iter().zip(self.levels.iter_mut()) {
            let peak = self.scratch[*start..*end]
                .iter()
                .map(|c| c.norm_sqr() as f64)
                .fold(0.0, f64::max);
            let db = (10.0 * (peak / norm).max(1e-12).log10()).max(FLOOR_DB);
            *level = SMOOTHING * *level + (1.0 - SMOOTHING) * db;
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.levels
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, levels: &[(f64, f64)]) {
    // x axis is the band index so the log spacing plots evenly
    let points: Vec<(f64, f64)> = levels
        .iter()
        .enumerate()
        .map(|(i, &(_, db))| (i as f64, db))
        .collect();
    let low = levels.first().map_or(20.0, |l| l.0);
    let high = levels.last().map_or(20_000.0, |l| l.0);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(" Spectrum ").borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([0.0, levels.len().saturating_sub(1) as f64])
                .labels(vec![format!("{low:.0}Hz"), format!("{:.1}kHz", high / 1000.0)])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 0.0])
                .labels(vec!["-100", "-50", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(chart, area);
}
