//! Word and snippet registry shared by all editor views.
//!
//! Word lists come in two flavors: per-language (loaded from completion
//! data files) and per-document (fed by background providers such as a
//! buffer word scanner). Snippet templates are keyed by `(language,
//! trigger)`. The store is cheaply cloneable and internally locked so
//! background providers can add words while the UI thread reads.
//!
//! Completion data is JSON:
//!
//! ```json
//! {
//!   "cpp": {
//!     "code": ["alignas", "constexpr"],
//!     "snippets": { "if": "if (^1^)\n{\n\t^0^\n}" }
//!   }
//! }
//! ```
//!
//! JSON string escapes express the control characters of the template
//! grammar directly (`\n`, `\t`, `\b`). Several documents may be loaded;
//! the first definition of a word or trigger wins, so user files should be
//! loaded before the built-in defaults.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::EngineError;

/// Built-in completion data, compiled into the binary.
const DEFAULT_COMPLETIONS: &str = include_str!("../assets/snippets.json");

/// Identifies one open document for per-document word lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(pub u64);

/// What a completion popup row is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Code,
    Path,
    Snippet,
    Tag,
}

/// String ordered and deduplicated ASCII-case-insensitively, so word lists
/// match the way the original comparator did.
#[derive(Debug, Clone)]
pub(crate) struct CiString(pub String);

impl CiString {
    pub(crate) fn starts_with_ci(&self, prefix: &str) -> bool {
        self.0
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }
}

impl PartialEq for CiString {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CiString {}

impl PartialOrd for CiString {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CiString {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(other.0.bytes().map(|b| b.to_ascii_lowercase()))
    }
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    #[serde(default)]
    code: Vec<String>,
    #[serde(default)]
    snippets: BTreeMap<String, String>,
}

#[derive(Default)]
struct StoreInner {
    lang_words: HashMap<String, BTreeMap<CiString, CompletionKind>>,
    doc_words: HashMap<DocId, BTreeMap<CiString, CompletionKind>>,
    lang_snippets: HashMap<String, BTreeMap<String, String>>,
}

/// Shared completion registry. Clones refer to the same underlying data.
#[derive(Clone, Default)]
pub struct CompletionStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl CompletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with the built-in completion data.
    pub fn with_defaults() -> Self {
        let store = Self::new();
        store
            .load_defaults()
            .expect("built-in completion data parses");
        store
    }

    /// Merge the built-in completion data. Load user files first — earlier
    /// definitions win.
    pub fn load_defaults(&self) -> Result<usize, EngineError> {
        self.load_str(DEFAULT_COMPLETIONS)
    }

    /// Merge a completion data document. Existing words and triggers are
    /// kept, so earlier loads take precedence. Returns the number of
    /// languages the document contributed to.
    pub fn load_str(&self, json: &str) -> Result<usize, EngineError> {
        let doc: HashMap<String, LanguageEntry> = serde_json::from_str(json)?;
        let mut inner = self.inner.lock();
        let count = doc.len();
        for (lang, entry) in doc {
            let words = inner.lang_words.entry(lang.clone()).or_default();
            for word in entry.code {
                words.entry(CiString(word)).or_insert(CompletionKind::Code);
            }
            let snippets = inner.lang_snippets.entry(lang).or_default();
            for (trigger, template) in entry.snippets {
                snippets.entry(trigger).or_insert(template);
            }
        }
        Ok(count)
    }

    pub fn load_file(&self, path: &Path) -> Result<usize, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::StoreLoad {
            path: path.display().to_string(),
            source,
        })?;
        let count = self.load_str(&json)?;
        info!(path = %path.display(), languages = count, "loaded completion data");
        Ok(count)
    }

    /// Add words to a language's list (existing entries keep their kind).
    pub fn add_lang_words<I>(&self, lang: &str, words: I)
    where
        I: IntoIterator<Item = (String, CompletionKind)>,
    {
        let mut inner = self.inner.lock();
        let map = inner.lang_words.entry(lang.to_string()).or_default();
        for (word, kind) in words {
            map.entry(CiString(word)).or_insert(kind);
        }
    }

    /// Add words scanned out of one document.
    pub fn add_doc_words<I>(&self, doc: DocId, words: I)
    where
        I: IntoIterator<Item = (String, CompletionKind)>,
    {
        let mut inner = self.inner.lock();
        let map = inner.doc_words.entry(doc).or_default();
        for (word, kind) in words {
            map.entry(CiString(word)).or_insert(kind);
        }
    }

    /// Drop the word list of a closed document.
    pub fn remove_doc(&self, doc: DocId) {
        self.inner.lock().doc_words.remove(&doc);
    }

    pub fn add_snippets<I>(&self, lang: &str, snippets: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut inner = self.inner.lock();
        let map = inner.lang_snippets.entry(lang.to_string()).or_default();
        for (trigger, template) in snippets {
            map.entry(trigger).or_insert(template);
        }
    }

    /// Template for a trigger word, if the language defines one. Triggers
    /// are case-sensitive.
    pub fn lookup_snippet(&self, lang: &str, trigger: &str) -> Option<String> {
        self.inner
            .lock()
            .lang_snippets
            .get(lang)
            .and_then(|map| map.get(trigger))
            .cloned()
    }

    /// Case-insensitive prefix matches over the document's words merged
    /// with the language's words (document entries win), in list order.
    pub fn prefix_matches(
        &self,
        lang: &str,
        doc: DocId,
        prefix: &str,
    ) -> Vec<(String, CompletionKind)> {
        let inner = self.inner.lock();
        let mut merged: BTreeMap<CiString, CompletionKind> = BTreeMap::new();
        let lists = [inner.doc_words.get(&doc), inner.lang_words.get(lang)];
        for map in lists.into_iter().flatten() {
            for (word, kind) in map.range(CiString(prefix.to_string())..) {
                if !word.starts_with_ci(prefix) {
                    break;
                }
                merged.entry(word.clone()).or_insert(*kind);
            }
        }
        debug!(lang, prefix, matches = merged.len(), "prefix scan");
        merged.into_iter().map(|(w, k)| (w.0, k)).collect()
    }

    /// Whether a language uses markup-style tags (closing-tag completion).
    pub fn is_markup(&self, lang: &str) -> bool {
        lang.eq_ignore_ascii_case("xml") || lang.eq_ignore_ascii_case("html")
    }
}

/// Single-line display form of a template for popup rows: hot-spot markers
/// and spot digits are stripped, escapes resolve to their literal character,
/// newlines flatten to spaces and backspace controls eat the previous
/// character, mimicking what the expansion would leave behind.
pub fn sanitize_template(template: &str) -> String {
    let mut out = String::new();
    let (mut last, mut last2) = ('\0', '\0');
    for ch in template.chars() {
        if ch == '^' && last != '\\' {
            // hot-spot marker
        } else if last == '^' && last2 != '\\' && ch.is_ascii_digit() {
            // spot digit
        } else if last == '\\' {
            out.push(ch);
        } else if ch == '\n' {
            out.push(' ');
        } else if ch == '\u{8}' {
            out.pop();
        } else if ch != '\\' {
            out.push(ch);
        }
        last2 = last;
        last = ch;
    }
    out
}
