use crate::shared::{LedState, NUM_PADS};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const COLS: usize = 4;
const ROWS: usize = 4;

const PAD_LABELS: [&str; NUM_PADS] = [
    "1", "2", "3", "4",
    "Q", "W", "E", "R",
    "A", "S", "D", "F",
    "Z", "X", "C", "V",
];

pub fn draw_pad_grid(frame: &mut Frame, area: Rect, leds: &[LedState; NUM_PADS], playing_step: Option<u8>) {
    let row_constraints = [Constraint::Percentage(25); ROWS];
    let col_constraints = [Constraint::Percentage(25); COLS];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(area);

    for (row_idx, row_area) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let pad_idx = row_idx * COLS + col_idx;
            let playhead = playing_step == Some(pad_idx as u8);
            let mut style = pad_style(leds[pad_idx]);
            if playhead {
                style = style.add_modifier(Modifier::BOLD);
            }
            let border = if playhead {
                Style::default().fg(Color::White)
            } else {
                style
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .style(style);
            let label = Paragraph::new(Line::from(PAD_LABELS[pad_idx])).block(block);
            frame.render_widget(label, *cell_area);
        }
    }
}

fn pad_style(led: LedState) -> Style {
    match led {
        LedState::OnHigh => Style::default().fg(Color::Black).bg(Color::LightMagenta),
        LedState::OnMedium => Style::default().fg(Color::LightMagenta).bg(Color::Magenta),
        LedState::Off => Style::default().fg(Color::DarkGray),
    }
}
