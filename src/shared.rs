// Types shared by the terminal front end and the middle layer.
//
// Grid buttons (the 16 pads, one per step):
//   1 2 3 4       //  GridDown(0 ..= 3)
//   q w e r       //  GridDown(4 ..= 7)
//   a s d f       //  GridDown(8 ..= 11)
//   z x c v       //  GridDown(12 ..= 15)
//
// Edits to the most recently placed note:
//   [ / ]         //  BendLast(-1.0 / 1.0) semitones
//   - / =         //  NudgeGain(-0.05 / 0.05)
//
// Everything else:
//   , / .         //  NudgeTempo(-5 / 5)
//   y / u         //  ToggleDelay / ToggleReverb
//   g             //  CycleWave
//   p             //  Randomize
//   0             //  Clear
//   b             //  Export
//   Space         //  PlayPress
//   Esc           //  Quit
//
// The TUI only ever draws a DisplayState; all sequencer state lives behind
// the middle layer.

pub const NUM_PADS: usize = 16;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    GridDown(u8), // index 0-15
    BendLast(f32),
    NudgeGain(f32),
    NudgeTempo(i32),
    ToggleDelay,
    ToggleReverb,
    CycleWave,
    Randomize,
    Clear,
    Export,
    PlayPress,
    Quit,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub leds: [LedState; NUM_PADS],
    pub playing_step: Option<u8>,
    pub playing: bool,
    pub bpm: u32,
    pub delay: bool,
    pub reverb: bool,
    pub wave_label: &'static str,
    pub event_count: usize,
    pub display_text: String, // last thing worth telling the user
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedState {
    Off,
    OnMedium, // step has events
    OnHigh,   // an event on this step is sounding right now
}
