pub mod audio;
pub mod audio_api;
pub mod bounce;
pub mod config;
pub mod error;
pub mod middle;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod shared;
pub mod sink;
pub mod synth;
pub mod tasks;
pub mod transport;
pub mod tui;
