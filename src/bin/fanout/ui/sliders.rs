use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, LineGauge},
    Frame,
};

/// Steps across a slider's full range
const STEPS: f64 = 100.0;

/// One bound attribute with its range.
#[derive(Debug, Clone)]
pub struct Slider {
    pub label: &'static str,
    pub address: String,
    pub min: f64,
    pub max: f64,
    pub value: f64,
}

impl Slider {
    pub fn new(label: &'static str, address: &str, min: f64, max: f64, value: f64) -> Self {
        Self {
            label,
            address: address.to_string(),
            min,
            max,
            value: value.clamp(min, max),
        }
    }

    pub fn nudge(&mut self, steps: f64) {
        let step = (self.max - self.min) / STEPS;
        self.value = (self.value + steps * step).clamp(self.min, self.max);
    }

    pub fn ratio(&self) -> f64 {
        if self.max > self.min {
            (self.value - self.min) / (self.max - self.min)
        } else {
            0.0
        }
    }
}

pub fn render_sliders(frame: &mut Frame, area: Rect, sliders: &[Slider], selected: usize) {
    let block = Block::default().title(" Patch ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(sliders.iter().map(|_| Constraint::Length(1)))
        .split(inner);

    for (i, (slider, row)) in sliders.iter().zip(rows.iter()).enumerate() {
        let color = if i == selected { Color::Yellow } else { Color::Cyan };
        let mut label_style = Style::default().fg(color);
        if i == selected {
            label_style = label_style.add_modifier(Modifier::BOLD);
        }
        let gauge = LineGauge::default()
            .label(format!("{:<8}{:>9.3} ", slider.label, slider.value))
            .style(label_style)
            .filled_style(Style::default().fg(color))
            .ratio(slider.ratio());
        frame.render_widget(gauge, *row);
    }
}
