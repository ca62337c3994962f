use crate::shared::DisplayState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::grid::draw_pad_grid;

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // screen
            Constraint::Length(1), // key help
            Constraint::Min(12),   // pad grid
        ])
        .split(area);

    draw_screen(frame, sections[0], state);
    draw_help(frame, sections[1]);
    draw_pad_grid(frame, sections[2], &state.leds, state.playing_step);
}

fn draw_screen(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let play = if state.playing { "PLAY" } else { "STOP" };
    let status = Line::from(vec![
        Span::styled(format!("{play:<5}"), Style::default().fg(Color::LightGreen)),
        Span::raw(format!("{:>3} BPM  ", state.bpm)),
        Span::raw(format!("{:<4} ", state.wave_label)),
        fx_span("DLY", state.delay),
        Span::raw(" "),
        fx_span("REV", state.reverb),
        Span::raw(format!("  {} notes", state.event_count)),
    ]);
    let text = Line::from(state.display_text.as_str());

    let screen = Paragraph::new(vec![status, text])
        .block(Block::default().borders(Borders::ALL).title("taploop"));
    frame.render_widget(screen, area);
}

fn fx_span(label: &'static str, on: bool) -> Span<'static> {
    let style = if on {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(label, style)
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = "[ ] pitch  - = gain  , . tempo  y delay  u reverb  g wave  p rand  0 clear  b export  space play  esc quit";
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), area);
}
