//! Speech synthesis collaborator seam.
//!
//! The narration engine never talks to an engine directly; it drives a
//! [`Synthesizer`] and drains the events the engine produces. The
//! production implementation shells out to a local TTS engine
//! ([`process::ProcessSynth`]); tests script the seam instead.

pub mod process;
pub mod voices;

#[cfg(test)]
pub(crate) mod mock;

use thiserror::Error;

/// Identity stamp for one narration session. Events are tagged with the
/// session they belong to so that in-flight notifications from a
/// cancelled session can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

/// Notifications a synthesis engine delivers while it works. Boundary
/// events are best-effort: granularity may be coarser than one word and
/// no event is guaranteed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthEvent {
    /// At least one voice has become available. Engines may load their
    /// voice inventory after start-up, so this can arrive late.
    VoicesReady,
    /// Approximate progress through the spoken utterance. `word` is the
    /// 0-based word offset within the utterance at which the engine
    /// believes it is speaking; engines that only track sentences report
    /// the offset of the sentence start.
    Boundary { session: SessionId, word: usize },
    /// The utterance ran to completion.
    Finished { session: SessionId },
}

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("no synthesis voice is available")]
    NoVoice,
    #[error("synthesis command is empty or unparseable: {0}")]
    BadCommand(String),
    #[error("failed to launch synthesis engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("synthesis engine exited with status {status}: {stderr}")]
    Engine { status: i32, stderr: String },
    #[error("no audio playback device available")]
    Device,
    #[error("failed to decode synthesized audio: {0}")]
    Decode(String),
    #[error("failed to write synthesis output: {0}")]
    Output(#[source] std::io::Error),
}

/// One speech engine. All calls are made from the single event-driven
/// thread that owns the reading controller; `pump` is the cooperative
/// point where the engine makes progress and surfaces its events.
pub trait Synthesizer {
    /// Whether at least one voice can currently be selected.
    fn voices_ready(&self) -> bool;

    /// Begin speaking `text` for session `id` at the given rate
    /// multiplier. Replaces whatever was speaking before; the engine
    /// must cancel the previous utterance first.
    fn speak(&mut self, id: SessionId, text: &str, rate: f32) -> Result<(), SynthError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Stop the current utterance, if any. Idempotent. The actual stop
    /// is best-effort: an in-flight event for the cancelled session may
    /// still surface from `pump` afterwards.
    fn cancel(&mut self);

    /// Make progress and drain pending events, in order.
    fn pump(&mut self) -> Result<Vec<SynthEvent>, SynthError>;
}
