//! Scripted synthesizer for exercising the narration engine without an
//! audio device. The test owns a [`ScriptHandle`] and decides when
//! voices appear and when boundary events fire, including stray events
//! for sessions that were already cancelled.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::synth::{SessionId, SynthError, SynthEvent, Synthesizer};

#[derive(Debug, Clone, PartialEq)]
pub struct SpokenUtterance {
    pub session: SessionId,
    pub text: String,
    pub rate: f32,
}

#[derive(Default)]
struct Inner {
    voices_ready: bool,
    announced: bool,
    queue: VecDeque<SynthEvent>,
    spoken: Vec<SpokenUtterance>,
    cancels: usize,
    paused: bool,
    current: Option<SessionId>,
    next_word: usize,
}

pub struct ScriptedSynth {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Clone)]
pub struct ScriptHandle {
    inner: Rc<RefCell<Inner>>,
}

impl ScriptedSynth {
    pub fn new() -> (Self, ScriptHandle) {
        let inner = Rc::new(RefCell::new(Inner::default()));
        (
            Self {
                inner: inner.clone(),
            },
            ScriptHandle { inner },
        )
    }
}

impl Synthesizer for ScriptedSynth {
    fn voices_ready(&self) -> bool {
        self.inner.borrow().voices_ready
    }

    fn speak(&mut self, id: SessionId, text: &str, rate: f32) -> Result<(), SynthError> {
        let mut inner = self.inner.borrow_mut();
        inner.spoken.push(SpokenUtterance {
            session: id,
            text: text.to_string(),
            rate,
        });
        inner.current = Some(id);
        inner.next_word = 0;
        Ok(())
    }

    fn pause(&mut self) {
        self.inner.borrow_mut().paused = true;
    }

    fn resume(&mut self) {
        self.inner.borrow_mut().paused = false;
    }

    fn cancel(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.cancels += 1;
        inner.current = None;
    }

    fn pump(&mut self) -> Result<Vec<SynthEvent>, SynthError> {
        let mut inner = self.inner.borrow_mut();
        let mut events = Vec::new();
        if inner.voices_ready && !inner.announced {
            inner.announced = true;
            events.push(SynthEvent::VoicesReady);
        }
        events.extend(inner.queue.drain(..));
        Ok(events)
    }
}

impl ScriptHandle {
    pub fn set_voices_ready(&self) {
        self.inner.borrow_mut().voices_ready = true;
    }

    /// Queue one boundary notification for the utterance currently held
    /// by the engine, at the next consecutive word offset.
    pub fn emit_boundary(&self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(session) = inner.current {
            let word = inner.next_word;
            inner.next_word += 1;
            inner
                .queue
                .push_back(SynthEvent::Boundary { session, word });
        }
    }

    /// Queue a boundary at an explicit word offset, the way a
    /// sentence-granular engine reports the start of each chunk.
    pub fn emit_boundary_at(&self, word: usize) {
        let mut inner = self.inner.borrow_mut();
        if let Some(session) = inner.current {
            inner.next_word = word + 1;
            inner
                .queue
                .push_back(SynthEvent::Boundary { session, word });
        }
    }

    /// Queue a boundary for an explicit session, which is how a stray
    /// in-flight event from a cancelled utterance arrives.
    pub fn emit_boundary_for(&self, session: SessionId) {
        self.inner
            .borrow_mut()
            .queue
            .push_back(SynthEvent::Boundary { session, word: 0 });
    }

    pub fn emit_finished(&self) {
        let mut inner = self.inner.borrow_mut();
        if let Some(session) = inner.current.take() {
            inner.queue.push_back(SynthEvent::Finished { session });
        }
    }

    pub fn spoken(&self) -> Vec<SpokenUtterance> {
        self.inner.borrow().spoken.clone()
    }

    pub fn last_session(&self) -> Option<SessionId> {
        self.inner.borrow().spoken.last().map(|u| u.session)
    }

    pub fn cancel_count(&self) -> usize {
        self.inner.borrow().cancels
    }

    pub fn is_paused(&self) -> bool {
        self.inner.borrow().paused
    }
}
