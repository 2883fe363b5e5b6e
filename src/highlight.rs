use crate::segment::TokenSequence;
use crate::view::DocumentView;

/// Tracks the single token currently marked as "being spoken" and
/// reflects every change into the view. At most one token carries the
/// highlight at any instant; the old mark is always removed before the
/// new one is applied.
#[derive(Debug, Default)]
pub struct HighlightCursor {
    current: Option<usize>,
}

impl HighlightCursor {
    /// Move the highlight to `index` and reveal it. An out-of-range
    /// index is silently ignored and leaves the existing highlight
    /// untouched, which is the normal end-of-document case when the
    /// engine keeps emitting boundaries past the last token.
    pub fn set_current(&mut self, tokens: &TokenSequence, index: usize, view: &mut dyn DocumentView) {
        let Some(token) = tokens.get(index) else {
            return;
        };
        view.unmark_all();
        view.mark(token);
        view.reveal(token);
        self.current = Some(index);
    }

    /// Remove the highlight everywhere. Idempotent.
    pub fn clear(&mut self, view: &mut dyn DocumentView) {
        view.unmark_all();
        self.current = None;
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }
}
