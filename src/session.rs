use crate::segment::{expand_acronyms, TokenSequence};
use crate::synth::SessionId;

/// Lifecycle of one synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthStatus {
    Idle,
    Speaking,
    Paused,
    Stopped,
}

/// One continuous narration over `tokens[start_index..]`, from the
/// chosen start to completion or interruption. The cursor maps the
/// engine's boundary notifications back onto token indices: each
/// notification moves it to the later of its own counter and the
/// reported word offset, so a sentence-granular engine resyncs the
/// highlight at every chunk start. The cursor starts at `start_index`
/// and never moves backwards; words between coarse notifications go
/// unhighlighted, which is accepted.
#[derive(Debug)]
pub struct NarrationSession {
    pub id: SessionId,
    pub start_index: usize,
    cursor_index: usize,
    pub status: SynthStatus,
}

impl NarrationSession {
    pub fn new(id: SessionId, start_index: usize) -> Self {
        Self {
            id,
            start_index,
            cursor_index: start_index,
            status: SynthStatus::Idle,
        }
    }

    /// The text handed to the synthesizer: the token suffix with
    /// acronyms spelled out letter by letter. Expansion changes only
    /// what the engine hears, never the word-index mapping.
    pub fn utterance_text(&self, tokens: &TokenSequence) -> String {
        expand_acronyms(&tokens.text_from(self.start_index))
    }

    /// Consume one boundary notification carrying a best-effort word
    /// offset within the utterance: returns the token index to highlight
    /// and moves the cursor past it. The offset can only pull the cursor
    /// forward, never behind `start_index` or an index already spoken.
    pub fn advance(&mut self, word: usize) -> usize {
        let index = self.cursor_index.max(self.start_index + word);
        self.cursor_index = index + 1;
        index
    }

    pub fn cursor_index(&self) -> usize {
        self.cursor_index
    }
}
