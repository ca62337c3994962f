use thiserror::Error;

/// Errors the session reports to the input layer.
///
/// Expected conditions (no events on a step, engine not ready during a tick)
/// are not errors; these are the ones a caller has to act on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// start() was called before an audio context was attached
    #[error("audio engine is not initialized")]
    EngineUnavailable,

    /// place_event past the configured cap
    #[error("pattern is full ({max} events)")]
    PatternFull { max: usize },
}
