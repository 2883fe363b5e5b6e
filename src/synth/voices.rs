use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice '{0}' not found")]
    NotFound(String),
}

#[derive(Debug, Clone)]
pub struct VoiceInfo {
    pub id: String,
    pub language: Option<String>,
    pub model_path: PathBuf,
}

impl VoiceInfo {
    /// Whether this voice is tagged for U.S. English. Metadata writers
    /// disagree on the separator, so both forms are accepted.
    fn is_us_english(&self) -> bool {
        matches!(self.language.as_deref(), Some("en-US") | Some("en_US"))
    }
}

/// Inventory of locally installed voice models, discovered by scanning a
/// directory for `.onnx` files with optional `.onnx.json` metadata.
#[derive(Default)]
pub struct VoiceLibrary {
    base_dir: PathBuf,
    voices: RwLock<HashMap<String, VoiceInfo>>,
}

impl VoiceLibrary {
    pub fn new(base_dir: PathBuf) -> Self {
        let library = Self {
            base_dir,
            voices: RwLock::new(HashMap::new()),
        };
        library.refresh();
        library
    }

    /// Rescan the voice directory. Voices can be installed after
    /// start-up, so callers poll this until the inventory is non-empty.
    pub fn refresh(&self) {
        let mut discovered = HashMap::new();
        if self.base_dir.exists() {
            for entry in WalkDir::new(&self.base_dir)
                .into_iter()
                .filter_map(Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("onnx") {
                    continue;
                }
                if let Some(info) = build_voice_info(path) {
                    discovered.insert(info.id.clone(), info);
                }
            }
        }
        *self.voices.write() = discovered;
    }

    pub fn is_empty(&self) -> bool {
        self.voices.read().is_empty()
    }

    pub fn list(&self) -> Vec<VoiceInfo> {
        let mut voices: Vec<_> = self.voices.read().values().cloned().collect();
        voices.sort_by(|a, b| a.id.cmp(&b.id));
        voices
    }

    pub fn get(&self, id: &str) -> Result<VoiceInfo, VoiceError> {
        self.voices
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| VoiceError::NotFound(id.to_string()))
    }

    /// Pick a voice for narration: prefer one tagged for U.S. English,
    /// otherwise fall back to the first available voice.
    pub fn preferred(&self) -> Option<VoiceInfo> {
        let voices = self.list();
        voices
            .iter()
            .find(|voice| voice.is_us_english())
            .or_else(|| voices.first())
            .cloned()
    }

}

fn build_voice_info(path: &Path) -> Option<VoiceInfo> {
    let id = path.file_stem()?.to_string_lossy().to_string();
    let metadata = metadata_path_for(path)
        .and_then(|path| match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<Value>(&contents)
                .map_err(|err| {
                    log::warn!("failed to parse voice metadata {}: {err}", path.display());
                    err
                })
                .ok(),
            Err(err) => {
                log::warn!("failed to read voice metadata {}: {err}", path.display());
                None
            }
        });

    let language = metadata
        .as_ref()
        .and_then(|value| value.get("language"))
        .and_then(|lang| lang.get("code"))
        .and_then(Value::as_str)
        .map(|s| s.to_string());

    Some(VoiceInfo {
        id,
        language,
        model_path: path.to_path_buf(),
    })
}

fn metadata_path_for(path: &Path) -> Option<PathBuf> {
    let mut metadata_path = path.to_path_buf();
    metadata_path.set_extension("onnx.json");
    if metadata_path.exists() {
        Some(metadata_path)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn voice_fixture(temp: &assert_fs::TempDir, id: &str, code: Option<&str>) {
        temp.child(format!("{id}.onnx")).touch().unwrap();
        if let Some(code) = code {
            temp.child(format!("{id}.onnx.json"))
                .write_str(&format!(r#"{{"language":{{"code":"{code}"}}}}"#))
                .unwrap();
        }
    }

    #[test]
    fn discovers_voices_in_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        voice_fixture(&temp, "alpha", Some("es_ES"));
        voice_fixture(&temp, "beta", None);

        let library = VoiceLibrary::new(temp.path().to_path_buf());
        assert_eq!(library.list().len(), 2);
        assert!(!library.is_empty());
        assert!(library.get("alpha").is_ok());
        assert!(library.get("missing").is_err());
    }

    #[test]
    fn empty_directory_means_no_voices() {
        let temp = assert_fs::TempDir::new().unwrap();
        let library = VoiceLibrary::new(temp.path().to_path_buf());
        assert!(library.is_empty());
        assert!(library.preferred().is_none());
    }

    #[test]
    fn prefers_us_english_voice() {
        let temp = assert_fs::TempDir::new().unwrap();
        voice_fixture(&temp, "castilian", Some("es_ES"));
        voice_fixture(&temp, "amy", Some("en_US"));

        let library = VoiceLibrary::new(temp.path().to_path_buf());
        assert_eq!(library.preferred().unwrap().id, "amy");
    }

    #[test]
    fn falls_back_to_first_voice_by_id() {
        let temp = assert_fs::TempDir::new().unwrap();
        voice_fixture(&temp, "castilian", Some("es_ES"));
        voice_fixture(&temp, "breton", Some("fr_FR"));

        let library = VoiceLibrary::new(temp.path().to_path_buf());
        assert_eq!(library.preferred().unwrap().id, "breton");
    }

    #[test]
    fn refresh_picks_up_new_models() {
        let temp = assert_fs::TempDir::new().unwrap();
        let library = VoiceLibrary::new(temp.path().to_path_buf());
        assert!(library.is_empty());

        voice_fixture(&temp, "late", Some("en_US"));
        library.refresh();
        assert!(!library.is_empty());
    }
}
