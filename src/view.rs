use std::io::Write;

use crate::segment::{TokenSequence, WordToken};

/// Visual reflection seam between the narration engine and whatever is
/// presenting the document. The engine only ever marks one token at a
/// time; implementations decide what "marked" looks like.
pub trait DocumentView {
    /// A freshly segmented document replaces whatever was on screen.
    fn render_tokens(&mut self, tokens: &TokenSequence);

    /// Apply the highlight to a single token.
    fn mark(&mut self, token: &WordToken);

    /// Remove the highlight from every token. Idempotent.
    fn unmark_all(&mut self);

    /// Bring the token into the centre of the viewport.
    fn reveal(&mut self, token: &WordToken);
}

/// Terminal presentation used by the CLI shell: narrated words are
/// echoed to stdout as the highlight reaches them.
#[derive(Default)]
pub struct ConsoleView {
    line_len: usize,
}

impl DocumentView for ConsoleView {
    fn render_tokens(&mut self, tokens: &TokenSequence) {
        println!("loaded document with {} words", tokens.len());
        self.line_len = 0;
    }

    fn mark(&mut self, token: &WordToken) {
        if self.line_len > 72 {
            println!();
            self.line_len = 0;
        }
        print!("{}", token.text);
        self.line_len += token.text.len();
        std::io::stdout().flush().ok();
    }

    fn unmark_all(&mut self) {}

    fn reveal(&mut self, _token: &WordToken) {}
}

#[cfg(test)]
pub(crate) mod recording {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ViewEvent {
        Rendered(usize),
        Marked(usize),
        Cleared,
        Revealed(usize),
    }

    /// Test double that records every view mutation in order.
    #[derive(Default)]
    pub struct RecordingView {
        events: Rc<RefCell<Vec<ViewEvent>>>,
    }

    impl RecordingView {
        pub fn new() -> (Self, Rc<RefCell<Vec<ViewEvent>>>) {
            let events = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    events: events.clone(),
                },
                events,
            )
        }
    }

    impl DocumentView for RecordingView {
        fn render_tokens(&mut self, tokens: &TokenSequence) {
            self.events.borrow_mut().push(ViewEvent::Rendered(tokens.len()));
        }

        fn mark(&mut self, token: &WordToken) {
            self.events.borrow_mut().push(ViewEvent::Marked(token.index));
        }

        fn unmark_all(&mut self) {
            self.events.borrow_mut().push(ViewEvent::Cleared);
        }

        fn reveal(&mut self, token: &WordToken) {
            self.events.borrow_mut().push(ViewEvent::Revealed(token.index));
        }
    }
}
