use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use log::{error, info};
use rodio::{Decoder, OutputStream, Sink};

use crate::synth::voices::VoiceLibrary;
use crate::synth::{SessionId, SynthError, SynthEvent, Synthesizer};
use crate::util::runtime::runtime_dir;

/// Grace period between cancelling one utterance and starting the next.
/// Some engines silently drop an utterance queued immediately after a
/// cancel, so the speak call is deliberately delayed.
const SPEAK_GUARD: Duration = Duration::from_millis(100);

/// Slow narration aids comprehension; this multiplies the engine's
/// default speaking rate.
pub const DEFAULT_RATE: f32 = 0.55;

#[derive(Debug, Clone)]
pub struct ProcessSynthConfig {
    /// Full engine command line, shell-style. When set it wins over
    /// voice discovery and the text is piped to its stdin.
    pub command: Option<String>,
    /// Explicit voice id to use from the voice directory.
    pub voice_id: Option<String>,
    pub voices_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ProcessSynthConfig {
    pub fn from_env() -> Self {
        Self {
            command: std::env::var("READER_TTS_COMMAND").ok(),
            voice_id: std::env::var("READER_VOICE").ok(),
            voices_dir: std::env::var("READER_VOICES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("assets/voices")),
            output_dir: runtime_dir().join("synth"),
        }
    }
}

struct Playback {
    // The stream must outlive the sink or playback stops.
    _stream: OutputStream,
    sink: Sink,
}

/// Speech engine backed by a local TTS subprocess, in the Piper mould:
/// the utterance is split into sentence chunks, each chunk is rendered
/// to a WAV file and played back, and one boundary event is emitted as
/// each chunk starts. Boundaries are therefore sentence-granular, which
/// the narration engine accepts as an approximation.
pub struct ProcessSynth {
    config: ProcessSynthConfig,
    voices: VoiceLibrary,
    queue: VecDeque<Chunk>,
    active: Option<SessionId>,
    playback: Option<Playback>,
    rate: f32,
    paused: bool,
    announced: bool,
    take: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Chunk {
    /// Word offset of this chunk's first word within the utterance,
    /// counted on the synthesizer-facing text. A letter-expanded acronym
    /// counts as several words there, so the offset can run slightly
    /// ahead of the token index; boundary reporting is best-effort.
    word_offset: usize,
    text: String,
}

impl ProcessSynth {
    pub fn new(config: ProcessSynthConfig) -> Self {
        let voices = VoiceLibrary::new(config.voices_dir.clone());
        Self {
            config,
            voices,
            queue: VecDeque::new(),
            active: None,
            playback: None,
            rate: DEFAULT_RATE,
            paused: false,
            announced: false,
            take: 0,
        }
    }

    fn build_command(&self) -> Result<Command, SynthError> {
        if let Some(raw) = &self.config.command {
            let mut parts = shlex::split(raw)
                .filter(|parts| !parts.is_empty())
                .ok_or_else(|| SynthError::BadCommand(raw.clone()))?;
            let program = parts.remove(0);
            let mut command = Command::new(program);
            command.args(parts);
            return Ok(command);
        }

        let voice = match &self.config.voice_id {
            Some(id) => self.voices.get(id).map_err(|err| {
                error!("configured voice is unavailable: {err}");
                SynthError::NoVoice
            })?,
            None => self.voices.preferred().ok_or(SynthError::NoVoice)?,
        };
        let mut command = Command::new("python");
        command.args(["-m", "piper", "--model"]);
        command.arg(&voice.model_path);
        Ok(command)
    }

    fn synthesize_chunk(&mut self, text: &str) -> Result<PathBuf, SynthError> {
        fs::create_dir_all(&self.config.output_dir).map_err(SynthError::Output)?;
        self.take += 1;
        let wav = self
            .config
            .output_dir
            .join(format!("utterance-{:04}.wav", self.take));

        let mut command = self.build_command()?;
        command.arg("--output_file");
        command.arg(&wav);
        command.arg("--length_scale");
        command.arg(format!("{:.2}", length_scale(self.rate)));

        let mut child = command
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SynthError::Spawn)?;
        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| SynthError::Spawn(std::io::Error::other("no stdin")))?;
            stdin.write_all(text.as_bytes()).map_err(SynthError::Output)?;
        }
        let output = child.wait_with_output().map_err(SynthError::Output)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let status = output.status.code().unwrap_or_default();
            error!("synthesis engine exited with status {status}: {stderr}");
            return Err(SynthError::Engine { status, stderr });
        }
        Ok(wav)
    }

    fn play(&mut self, wav: &Path) -> Result<(), SynthError> {
        let file = File::open(wav).map_err(SynthError::Output)?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|err| SynthError::Decode(err.to_string()))?;
        let (stream, handle) = OutputStream::try_default().map_err(|_| SynthError::Device)?;
        let sink = Sink::try_new(&handle).map_err(|_| SynthError::Device)?;
        sink.append(decoder);
        sink.play();
        self.playback = Some(Playback {
            _stream: stream,
            sink,
        });
        Ok(())
    }

    fn playing(&self) -> bool {
        self.playback
            .as_ref()
            .map(|playback| !playback.sink.empty())
            .unwrap_or(false)
    }
}

impl Synthesizer for ProcessSynth {
    fn voices_ready(&self) -> bool {
        self.config.command.is_some() || !self.voices.is_empty()
    }

    fn speak(&mut self, id: SessionId, text: &str, rate: f32) -> Result<(), SynthError> {
        self.cancel();
        std::thread::sleep(SPEAK_GUARD);

        self.rate = if rate > 0.0 { rate } else { DEFAULT_RATE };
        self.queue = build_chunks(text).into();
        self.active = Some(id);
        info!(
            "speaking {} sentence chunk(s) at rate {:.2}",
            self.queue.len(),
            self.rate
        );
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(playback) = &self.playback {
            playback.sink.pause();
        }
        self.paused = true;
    }

    fn resume(&mut self) {
        if let Some(playback) = &self.playback {
            playback.sink.play();
        }
        self.paused = false;
    }

    fn cancel(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.sink.stop();
        }
        self.queue.clear();
        self.active = None;
        self.paused = false;
    }

    fn pump(&mut self) -> Result<Vec<SynthEvent>, SynthError> {
        let mut events = Vec::new();

        if !self.announced {
            if !self.voices_ready() {
                self.voices.refresh();
            }
            if self.voices_ready() {
                self.announced = true;
                events.push(SynthEvent::VoicesReady);
            }
        }

        if self.paused || self.playing() {
            return Ok(events);
        }

        if let Some(id) = self.active {
            if let Some(chunk) = self.queue.pop_front() {
                let wav = self.synthesize_chunk(&chunk.text)?;
                self.play(&wav)?;
                events.push(SynthEvent::Boundary {
                    session: id,
                    word: chunk.word_offset,
                });
            } else {
                self.playback = None;
                self.active = None;
                events.push(SynthEvent::Finished { session: id });
            }
        }

        Ok(events)
    }
}

/// Piper expresses tempo as a length scale where larger is slower, the
/// inverse of a rate multiplier.
fn length_scale(rate: f32) -> f32 {
    (1.0 / rate).clamp(0.25, 4.0)
}

/// Split the utterance into sentence chunks, each stamped with the
/// cumulative word offset of the chunks before it so the boundary event
/// for a chunk can report where in the utterance it starts.
fn build_chunks(text: &str) -> Vec<Chunk> {
    let mut offset = 0;
    split_sentences(text)
        .into_iter()
        .map(|text| {
            let words = text.split_whitespace().count();
            let chunk = Chunk {
                word_offset: offset,
                text,
            };
            offset += words;
            chunk
        })
        .collect()
}

/// Split an utterance into sentence chunks at terminal punctuation.
/// Honorific periods were already stripped during segmentation, so a
/// period followed by whitespace is a safe boundary here.
fn split_sentences(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let terminal = matches!(ch, '.' | '!' | '?' | '…');
        let at_break = terminal
            && chars
                .peek()
                .map(|next| next.is_whitespace())
                .unwrap_or(true);
        if at_break {
            let chunk = current.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn config(temp: &assert_fs::TempDir, command: Option<&str>) -> ProcessSynthConfig {
        ProcessSynthConfig {
            command: command.map(str::to_string),
            voice_id: None,
            voices_dir: temp.path().join("voices"),
            output_dir: temp.path().join("out"),
        }
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let chunks = split_sentences("One two. Three four! Five?");
        assert_eq!(chunks, vec!["One two.", "Three four!", "Five?"]);
    }

    #[test]
    fn decimal_points_do_not_split() {
        let chunks = split_sentences("Pi is 3.14 roughly. Yes.");
        assert_eq!(chunks, vec!["Pi is 3.14 roughly.", "Yes."]);
    }

    #[test]
    fn chunks_carry_cumulative_word_offsets() {
        let chunks = build_chunks("One two. Three four five! Six?");
        let offsets: Vec<usize> = chunks.iter().map(|c| c.word_offset).collect();
        assert_eq!(offsets, vec![0, 2, 5]);
        assert_eq!(chunks[2].text, "Six?");
    }

    #[test]
    fn unterminated_tail_is_kept() {
        let chunks = split_sentences("No punctuation here");
        assert_eq!(chunks, vec!["No punctuation here"]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn command_override_counts_as_voice_ready() {
        let temp = assert_fs::TempDir::new().unwrap();
        let synth = ProcessSynth::new(config(&temp, Some("sh fake-tts.sh")));
        assert!(synth.voices_ready());

        let without = ProcessSynth::new(config(&temp, None));
        assert!(!without.voices_ready());
    }

    #[test]
    fn no_voice_and_no_command_fails_to_build() {
        let temp = assert_fs::TempDir::new().unwrap();
        let synth = ProcessSynth::new(config(&temp, None));
        assert!(matches!(synth.build_command(), Err(SynthError::NoVoice)));
    }

    #[test]
    fn discovered_voice_ends_up_on_the_command_line() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("voices/amy.onnx").touch().unwrap();
        let synth = ProcessSynth::new(config(&temp, None));
        assert!(synth.voices_ready());
        let command = synth.build_command().unwrap();
        let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy()).collect();
        assert!(args.iter().any(|arg| arg.ends_with("amy.onnx")));
    }

    #[test]
    fn blank_command_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let synth = ProcessSynth::new(config(&temp, Some("   ")));
        assert!(matches!(
            synth.build_command(),
            Err(SynthError::BadCommand(_))
        ));
    }

    #[test]
    fn length_scale_inverts_rate() {
        assert!((length_scale(0.55) - 1.818).abs() < 0.01);
        assert!((length_scale(1.0) - 1.0).abs() < f32::EPSILON);
        assert!((length_scale(10.0) - 0.25).abs() < f32::EPSILON);
    }
}
