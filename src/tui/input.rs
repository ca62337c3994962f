use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crate::shared::InputEvent;

const BEND_SEMITONES: f32 = 1.0;
const GAIN_STEP: f32 = 0.05;
const TEMPO_STEP: i32 = 5;

// poll for input from the terminal, waiting at most `timeout`
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code).into_iter().collect());
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode) -> Option<InputEvent> {
    let event = match code {
        KeyCode::Esc => InputEvent::Quit,
        KeyCode::Char(' ') => InputEvent::PlayPress,

        // any keys on the 4x4 grid pad
        KeyCode::Char(c @ ('1' | '2' | '3' | '4'
            | 'q' | 'w' | 'e' | 'r'
            | 'a' | 's' | 'd' | 'f'
            | 'z' | 'x' | 'c' | 'v')) => InputEvent::GridDown(char_to_pad(c)?),

        // knobs act on the note placed last
        KeyCode::Char('[') => InputEvent::BendLast(-BEND_SEMITONES),
        KeyCode::Char(']') => InputEvent::BendLast(BEND_SEMITONES),
        KeyCode::Char('-') => InputEvent::NudgeGain(-GAIN_STEP),
        KeyCode::Char('=') => InputEvent::NudgeGain(GAIN_STEP),

        KeyCode::Char(',') => InputEvent::NudgeTempo(-TEMPO_STEP),
        KeyCode::Char('.') => InputEvent::NudgeTempo(TEMPO_STEP),
        KeyCode::Char('y') => InputEvent::ToggleDelay,
        KeyCode::Char('u') => InputEvent::ToggleReverb,
        KeyCode::Char('g') => InputEvent::CycleWave,
        KeyCode::Char('p') => InputEvent::Randomize,
        KeyCode::Char('0') => InputEvent::Clear,
        KeyCode::Char('b') => InputEvent::Export,

        _ => return None,
    };
    Some(event)
}

// convert char to pad index
fn char_to_pad(c: char) -> Option<u8> {
    let idx = match c {
        '1' => 0, '2' => 1, '3' => 2, '4' => 3,
        'q' => 4, 'w' => 5, 'e' => 6, 'r' => 7,
        'a' => 8, 's' => 9, 'd' => 10, 'f' => 11,
        'z' => 12, 'x' => 13, 'c' => 14, 'v' => 15,
        _ => return None,
    };
    Some(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_keys_cover_all_pads() {
        let keys = "1234qwerasdfzxcv";
        for (i, c) in keys.chars().enumerate() {
            assert_eq!(handle_key(KeyCode::Char(c)), Some(InputEvent::GridDown(i as u8)));
        }
    }

    #[test]
    fn control_keys_stay_off_the_grid() {
        assert_eq!(handle_key(KeyCode::Char('g')), Some(InputEvent::CycleWave));
        assert_eq!(handle_key(KeyCode::Char('b')), Some(InputEvent::Export));
        assert_eq!(handle_key(KeyCode::Char(',')), Some(InputEvent::NudgeTempo(-5)));
        assert_eq!(handle_key(KeyCode::Esc), Some(InputEvent::Quit));
        assert_eq!(handle_key(KeyCode::Char('k')), None);
    }
}
