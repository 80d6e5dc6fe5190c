//! Terminal panel: parameter sliders, scope and spectrum.
//!
//! Slider moves become float messages delivered on the engine's control bus,
//! where the patch router turns them into attribute changes.

mod sliders;
mod spectrum;
mod status;
mod waveform;

use std::time::Duration;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use tracing::warn;

use fanout_dsp::command::{ControlBus, Message};

pub use sliders::Slider;

use sliders::render_sliders;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use status::{render_status, AudioStats};
use waveform::render_waveform;

/// Samples shown by the scope and analysed by the spectrum
const VIS_BUFFER_SIZE: usize = 1024;

pub struct UiApp {
    audio_rx: Consumer<f32>,
    bus: ControlBus,
    port: u16,
    sliders: Vec<Slider>,
    selected: usize,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    sample_rate: f32,
    /// Last rejected command, shown in the status bar
    last_error: Option<String>,
    should_quit: bool,
}

impl UiApp {
    pub fn new(audio_rx: Consumer<f32>, bus: ControlBus, port: u16, sliders: Vec<Slider>, sample_rate: f32) -> Self {
        Self {
            audio_rx,
            bus,
            port,
            sliders,
            selected: 0,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            sample_rate,
            last_error: None,
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_audio();
            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    /// Keep the newest `VIS_BUFFER_SIZE` samples.
    fn poll_audio(&mut self) {
        let mut received = 0;
        while let Ok(sample) = self.audio_rx.pop() {
            self.audio_buffer.push(sample);
            received += 1;
        }
        if received == 0 {
            return;
        }
        let excess = self.audio_buffer.len().saturating_sub(VIS_BUFFER_SIZE);
        self.audio_buffer.drain(..excess);
        self.spectrum.update(&self.audio_buffer);
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(self.sliders.len().saturating_sub(1));
            }
            KeyCode::Left | KeyCode::Char('h') => self.nudge(-1.0),
            KeyCode::Right | KeyCode::Char('l') => self.nudge(1.0),
            KeyCode::PageDown => self.nudge(-10.0),
            KeyCode::PageUp => self.nudge(10.0),
            _ => {}
        }
    }

    fn nudge(&mut self, steps: f64) {
        let Some(slider) = self.sliders.get_mut(self.selected) else {
            return;
        };
        slider.nudge(steps);
        let message = Message::float(slider.address.clone(), slider.value as f32);
        match self.bus.deliver(self.port, &message) {
            Ok(()) => self.last_error = None,
            Err(err) => {
                warn!(address = %message.address, %err, "slider update rejected");
                self.last_error = Some(err.to_string());
            }
        }
    }

    fn render(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(10),
                Constraint::Length(1),
            ])
            .split(frame.area());
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);

        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_status(frame, rows[0], self.sample_rate, self.port, &stats, self.last_error.as_deref());
        render_sliders(frame, columns[0], &self.sliders, self.selected);
        render_spectrum(frame, columns[1], self.spectrum.data());
        render_waveform(frame, rows[2], &self.audio_buffer);

        let help = Paragraph::new(" [↑↓] Select  [←→] Adjust  [PgUp/PgDn] Coarse  [Q] Quit")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, rows[3]);
    }
}
