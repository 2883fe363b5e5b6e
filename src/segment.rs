use once_cell::sync::Lazy;
use regex::Regex;

/// One space-delimited word of document text, addressable by a stable
/// index for as long as the current document is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordToken {
    pub index: usize,
    /// The word plus one trailing space, kept for natural rendering and
    /// so that concatenating a token range reproduces readable text.
    pub text: String,
}

/// The ordered token sequence for the current document. Replaced
/// wholesale on every document or page load, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<WordToken>,
}

impl TokenSequence {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WordToken> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WordToken> {
        self.tokens.iter()
    }

    /// Concatenated display text of `tokens[start..]`, the raw material
    /// for one narration utterance.
    pub fn text_from(&self, start: usize) -> String {
        self.tokens
            .iter()
            .skip(start)
            .map(|token| token.text.as_str())
            .collect()
    }
}

static HONORIFIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(Mr|Mrs|Ms|Dr)\.").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static ACRONYM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());

/// Split raw document text into addressable word tokens.
///
/// The period after common honorifics is stripped first so they are not
/// taken for sentence boundaries downstream, then every whitespace run
/// (newlines included) collapses to a single space. Empty fragments from
/// leading or trailing whitespace are dropped; everything else becomes a
/// token. Identical input always yields an identical sequence.
pub fn segment(raw: &str) -> TokenSequence {
    let stripped = HONORIFIC_RE.replace_all(raw, "$1");
    let normalized = WHITESPACE_RE.replace_all(&stripped, " ");

    let tokens = normalized
        .split(' ')
        .filter(|word| !word.is_empty())
        .enumerate()
        .map(|(index, word)| WordToken {
            index,
            text: format!("{word} "),
        })
        .collect();

    TokenSequence { tokens }
}

/// Rewrite whole words of two or more consecutive uppercase letters with
/// a space between every letter, which most engines pronounce far better
/// than the raw acronym. Applied to synthesizer-facing text only: the
/// boundary counter still advances one step per original word.
pub fn expand_acronyms(text: &str) -> String {
    ACRONYM_RE
        .replace_all(text, |caps: &regex::Captures| {
            caps[0]
                .chars()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .into_owned()
}
