use log::{debug, info, warn};
use thiserror::Error;

use crate::highlight::HighlightCursor;
use crate::segment::{segment, TokenSequence};
use crate::session::{NarrationSession, SynthStatus};
use crate::synth::{SessionId, SynthError, SynthEvent, Synthesizer};
use crate::view::DocumentView;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("voices are still loading, try again")]
    VoiceNotReady,
    #[error(transparent)]
    Synth(#[from] SynthError),
}

/// Top-level orchestrator for the narration engine. Owns the current
/// token sequence, the at-most-one active session and the highlight
/// cursor; all user intents and all engine events pass through here.
///
/// After an explicit stop the cursor position is preserved, so the next
/// play resumes from the last highlighted word; a naturally finished
/// narration resets to the top of the document.
pub struct ReadingController {
    synth: Box<dyn Synthesizer>,
    view: Box<dyn DocumentView>,
    tokens: TokenSequence,
    session: Option<NarrationSession>,
    highlight: HighlightCursor,
    cursor_pos: usize,
    rate: f32,
    voices_ready: bool,
    session_seq: u64,
}

impl ReadingController {
    pub fn new(synth: Box<dyn Synthesizer>, view: Box<dyn DocumentView>, rate: f32) -> Self {
        Self {
            voices_ready: synth.voices_ready(),
            synth,
            view,
            tokens: TokenSequence::default(),
            session: None,
            highlight: HighlightCursor::default(),
            cursor_pos: 0,
            rate,
            session_seq: 0,
        }
    }

    /// Replace the document wholesale: the active session is stopped and
    /// the highlight cleared before a single new token is rendered.
    pub fn on_document_loaded(&mut self, text: &str) {
        self.stop_active();
        // The old session indexed the old tokens; discard it outright.
        self.session = None;
        self.tokens = segment(text);
        self.cursor_pos = 0;
        self.view.render_tokens(&self.tokens);
        info!("document loaded: {} words", self.tokens.len());
    }

    /// Paginated sources re-segment per page; narration never carries
    /// across a page boundary, the cursor simply resets.
    pub fn on_page_changed(&mut self, page_text: &str) {
        self.stop_active();
        self.session = None;
        self.tokens = segment(page_text);
        self.cursor_pos = 0;
        self.view.render_tokens(&self.tokens);
        debug!("page changed: {} words", self.tokens.len());
    }

    pub fn on_word_clicked(&mut self, index: usize) -> Result<(), ControllerError> {
        if index >= self.tokens.len() {
            warn!("ignoring click on out-of-range word {index}");
            return Ok(());
        }
        self.start_session(index)
    }

    pub fn on_play(&mut self) -> Result<(), ControllerError> {
        self.start_session(self.cursor_pos)
    }

    pub fn on_pause(&mut self) {
        if let Some(session) = &mut self.session {
            if session.status == SynthStatus::Speaking {
                self.synth.pause();
                session.status = SynthStatus::Paused;
            }
        }
    }

    pub fn on_resume(&mut self) {
        if let Some(session) = &mut self.session {
            if session.status == SynthStatus::Paused {
                self.synth.resume();
                session.status = SynthStatus::Speaking;
            }
        }
    }

    /// Tear down the active session. The highlight is always cleared;
    /// the cursor position survives so play can pick up where narration
    /// stopped.
    pub fn on_stop(&mut self) {
        self.stop_active();
    }

    /// Change the rate multiplier. Rate is fixed at utterance
    /// construction, so an active narration restarts from the current
    /// cursor with the new rate.
    pub fn set_rate(&mut self, rate: f32) -> Result<(), ControllerError> {
        self.rate = rate;
        if self.is_active() {
            let position = self.cursor_pos;
            self.start_session(position)?;
        }
        Ok(())
    }

    /// Route one engine notification. Events stamped with anything but
    /// the id of a session that is still Speaking or Paused are stale
    /// leftovers of a cancelled utterance and are dropped without
    /// touching the highlight.
    pub fn handle_synth_event(&mut self, event: SynthEvent) {
        match event {
            SynthEvent::VoicesReady => {
                self.voices_ready = true;
                info!("synthesis voices available");
            }
            SynthEvent::Boundary { session, word } => {
                let Some(active) = self.active_session() else {
                    return;
                };
                if active.id != session {
                    debug!("dropping stale boundary event");
                    return;
                }
                let index = active.advance(word);
                self.highlight
                    .set_current(&self.tokens, index, self.view.as_mut());
                if index < self.tokens.len() {
                    self.cursor_pos = index;
                }
            }
            SynthEvent::Finished { session } => {
                let Some(active) = self.active_session() else {
                    return;
                };
                if active.id != session {
                    return;
                }
                active.status = SynthStatus::Stopped;
                self.highlight.clear(self.view.as_mut());
                self.cursor_pos = 0;
                info!("narration finished");
            }
        }
    }

    /// Drain and handle pending engine events. Returns whether a
    /// session is still active, which is the CLI shell's loop condition.
    /// An engine failure is terminal for the narration: the session is
    /// torn down and the highlight cleared before the error surfaces, so
    /// the controller is idle again.
    pub fn pump(&mut self) -> Result<bool, ControllerError> {
        let events = match self.synth.pump() {
            Ok(events) => events,
            Err(err) => {
                self.stop_active();
                return Err(err.into());
            }
        };
        for event in events {
            self.handle_synth_event(event);
        }
        Ok(self.is_active())
    }

    pub fn voices_ready(&self) -> bool {
        self.voices_ready
    }

    pub fn cursor_pos(&self) -> usize {
        self.cursor_pos
    }

    /// Whether a session is Speaking or Paused. A stopped or finished
    /// session sticks around as a record of the last run but no longer
    /// counts as active.
    pub fn is_active(&self) -> bool {
        matches!(
            self.session.as_ref().map(|s| s.status),
            Some(SynthStatus::Speaking) | Some(SynthStatus::Paused)
        )
    }

    pub fn session_status(&self) -> Option<SynthStatus> {
        self.session.as_ref().map(|s| s.status)
    }

    fn start_session(&mut self, index: usize) -> Result<(), ControllerError> {
        if self.tokens.is_empty() {
            // Nothing to read; not an error.
            return Ok(());
        }
        if !self.voices_ready {
            return Err(ControllerError::VoiceNotReady);
        }

        // Stop-before-start: the prior synthesis is cancelled and the
        // highlight cleared before the new utterance is even built.
        self.stop_active();

        let mut session = NarrationSession::new(self.next_session_id(), index);
        let text = session.utterance_text(&self.tokens);
        self.synth.speak(session.id, &text, self.rate)?;
        session.status = SynthStatus::Speaking;
        self.cursor_pos = index;
        info!("narration session started at word {index}");
        self.session = Some(session);
        Ok(())
    }

    fn active_session(&mut self) -> Option<&mut NarrationSession> {
        self.session
            .as_mut()
            .filter(|s| matches!(s.status, SynthStatus::Speaking | SynthStatus::Paused))
    }

    fn stop_active(&mut self) {
        if let Some(session) = &mut self.session {
            session.status = SynthStatus::Stopped;
        }
        self.synth.cancel();
        self.highlight.clear(self.view.as_mut());
    }

    fn next_session_id(&mut self) -> SessionId {
        self.session_seq += 1;
        SessionId::new(self.session_seq)
    }
}
