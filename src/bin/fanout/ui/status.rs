//! Status bar: device rate, control port, output level and the last error.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render_status(
    frame: &mut Frame,
    area: Rect,
    sample_rate: f32,
    port: u16,
    stats: &AudioStats,
    error: Option<&str>,
) {
    let block = Block::default().title(" fanout ").borders(Borders::ALL);

    let mut spans = vec![
        Span::styled(format!(" {:.1}kHz  ", sample_rate / 1000.0), Style::default().fg(Color::Cyan)),
        Span::styled(format!("port {port}  "), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}  ", stats.peak, stats.rms),
            Style::default().fg(if stats.peak >= 1.0 { Color::Red } else { Color::Magenta }),
        ),
    ];
    if let Some(error) = error {
        spans.push(Span::styled(error.to_string(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_square_wave() {
        let stats = AudioStats::from_buffer(&[0.5, -0.5, 0.5, -0.5]);
        assert_eq!(stats.peak, 0.5);
        assert!((stats.rms - 0.5).abs() < 1e-6);
    }
}
