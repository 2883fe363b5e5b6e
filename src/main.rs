use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use log::info;

mod controller;
mod extract;
mod highlight;
mod segment;
mod session;
mod synth;
mod util;
mod view;

use controller::ReadingController;
use extract::Extractor;
use synth::process::{ProcessSynth, ProcessSynthConfig, DEFAULT_RATE};
use view::ConsoleView;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const VOICE_WAIT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    util::logging::init()?;

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next().map(PathBuf::from) else {
        bail!("usage: reader-core <document> [start-word]");
    };
    let start_word: Option<usize> = match args.next() {
        Some(raw) => Some(raw.parse().context("start-word must be a number")?),
        None => None,
    };
    let rate: f32 = match std::env::var("READER_RATE") {
        Ok(raw) => raw.parse().context("READER_RATE must be a number")?,
        Err(_) => DEFAULT_RATE,
    };

    let document = Extractor::from_env()
        .load(&path)
        .with_context(|| format!("could not extract text from {}", path.display()))?;
    info!(
        "extracted {} page(s) from {}",
        document.page_count(),
        path.display()
    );

    let synth = ProcessSynth::new(ProcessSynthConfig::from_env());
    let mut controller =
        ReadingController::new(Box::new(synth), Box::new(ConsoleView::default()), rate);

    match std::env::var("READER_PAGE").ok().and_then(|p| p.parse::<usize>().ok()) {
        Some(page) => {
            let text = document
                .page(page)
                .with_context(|| format!("document has no page {page}"))?;
            controller.on_page_changed(text);
        }
        None => controller.on_document_loaded(&document.flatten()),
    }

    let waiting_since = Instant::now();
    let mut started = false;
    loop {
        let active = controller.pump()?;
        if !started {
            if controller.voices_ready() {
                match start_word {
                    Some(index) => controller.on_word_clicked(index)?,
                    None => controller.on_play()?,
                }
                started = true;
                if !controller.is_active() {
                    // Empty document: nothing to read.
                    break;
                }
            } else if waiting_since.elapsed() > VOICE_WAIT {
                bail!(
                    "no synthesis voices available; set READER_TTS_COMMAND or \
                     install a voice model under the voices directory"
                );
            }
        } else if !active {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    println!();
    info!("done");
    Ok(())
}
