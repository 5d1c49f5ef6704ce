//! The completion engine of one editor view.
//!
//! [`CompletionEngine`] ties the pieces together: it turns buffer events
//! into completion popups (words, snippet rows, paths, closing tags), routes
//! accepted snippet rows through the expander, owns the resulting
//! [`SnippetSession`] and keeps it alive across edits via the tracker, and
//! forwards Tab/Shift+Tab/Enter/Escape to the navigation controller while a
//! session is live.
//!
//! The engine is strictly single-threaded: the host calls it from the
//! thread that owns the editor view, synchronously after each event.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::buffer::{EditBuffer, Key, Notification};
use crate::config::EngineConfig;
use crate::expand;
use crate::nav::{self, NavOutcome};
use crate::paths;
use crate::session::SnippetSession;
use crate::store::{sanitize_template, CompletionKind, CompletionStore, DocId};
use crate::tracker::{self, TrackOutcome};

/// One row of a completion popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub text: String,
    pub kind: CompletionKind,
}

/// A popup the host should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionList {
    pub items: Vec<CompletionItem>,
    /// How many characters before the caret the accepted row replaces.
    pub replace_len: usize,
    /// Whether the popup should close when no row matches further typing.
    pub auto_hide: bool,
}

/// What the host should do with its completion popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupAction {
    Show(CompletionList),
    /// Move the popup's highlight to the row starting with this text.
    Select(String),
}

/// Clears the re-entrancy flag on every exit path, unwinding included.
struct InsertGuard {
    flag: Rc<Cell<bool>>,
}

impl InsertGuard {
    fn arm(flag: &Rc<Cell<bool>>) -> Self {
        flag.set(true);
        Self {
            flag: Rc::clone(flag),
        }
    }
}

impl Drop for InsertGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Completion and snippet state of a single editor view.
pub struct CompletionEngine {
    store: CompletionStore,
    config: EngineConfig,
    doc: DocId,
    lang: String,
    session: Option<SnippetSession>,
    /// Set while a snippet insertion is mutating the buffer, so the
    /// character-typed path ignores the engine's own insertions.
    inserting_snippet: Rc<Cell<bool>>,
    /// Snippet row to re-highlight when the popup loses its match.
    pending_select: Option<String>,
}

impl CompletionEngine {
    pub fn new(store: CompletionStore, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            doc: DocId(0),
            lang: String::new(),
            session: None,
            inserting_snippet: Rc::new(Cell::new(false)),
            pending_select: None,
        }
    }

    /// Tell the engine which document (and language) the view shows.
    pub fn set_document(&mut self, doc: DocId, lang: impl Into<String>) {
        self.doc = doc;
        self.lang = lang.into();
    }

    pub fn store(&self) -> &CompletionStore {
        &self.store
    }

    /// The active snippet session, if any.
    pub fn session(&self) -> Option<&SnippetSession> {
        self.session.as_ref()
    }

    /// Whether a snippet insertion is currently mutating the buffer.
    pub fn is_expanding(&self) -> bool {
        self.inserting_snippet.get()
    }

    /// Route a key press. Returns `true` when the key was consumed by hot
    /// spot navigation; `false` keys belong to the editor.
    pub fn handle_key(&mut self, buf: &mut dyn EditBuffer, key: Key) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match nav::handle_key(session, buf, key) {
            NavOutcome::Moved(spot) => {
                debug!(spot, "moved to hot spot");
                true
            }
            NavOutcome::Exited => {
                self.end_session(buf);
                true
            }
        }
    }

    /// Feed one editor event through the engine.
    pub fn handle_notification(
        &mut self,
        buf: &mut dyn EditBuffer,
        notification: Notification,
    ) -> Option<PopupAction> {
        match notification {
            Notification::CharacterAdded { ch } => {
                if self.inserting_snippet.get() {
                    return None;
                }
                let caret_escaped = self
                    .session
                    .as_ref()
                    .is_some_and(|session| !session.contains(buf.caret()));
                if caret_escaped {
                    debug!("caret left the snippet, ending session");
                    self.end_session(buf);
                }
                self.character_added(buf, ch)
            }
            Notification::TextModified(edit) => {
                let outcome = self
                    .session
                    .as_mut()
                    .map(|session| tracker::apply_edit(session, &edit));
                match outcome {
                    Some(TrackOutcome::EndSession) => self.end_session(buf),
                    Some(TrackOutcome::Keep) => {
                        if let Some(session) = &self.session {
                            session.refresh_markers(buf);
                        }
                    }
                    None => {}
                }
                None
            }
            Notification::SelectionChanged => {
                let desynced = self
                    .session
                    .as_ref()
                    .is_some_and(|session| !tracker::mirrors_in_sync(session));
                if desynced {
                    debug!("mirrored spots diverged, ending session");
                    self.end_session(buf);
                }
                None
            }
            Notification::CompletionListSelectionChanged { text } => {
                let empty = text.as_deref().is_none_or(str::is_empty);
                if empty {
                    self.pending_select.clone().map(PopupAction::Select)
                } else {
                    None
                }
            }
            Notification::CompletionCancelled => {
                self.pending_select = None;
                None
            }
            Notification::CompletionAccepted { text, position } => {
                self.pending_select = None;
                self.accept(buf, &text, position);
                None
            }
        }
    }

    /// Tear down the active session, wiping its markers. Inserted text stays.
    fn end_session(&mut self, buf: &mut dyn EditBuffer) {
        if let Some(session) = self.session.take() {
            session.clear_markers(buf);
            debug!("snippet session ended");
        }
    }

    /// An accepted popup row. Snippet rows carry `"trigger: preview"`; plain
    /// word rows are inserted by the editor itself and need nothing from us.
    fn accept(&mut self, buf: &mut dyn EditBuffer, text: &str, position: usize) {
        let _guard = InsertGuard::arm(&self.inserting_snippet);

        let Some((trigger, _)) = text.split_once(':') else {
            return;
        };
        let Some(template) = self.store.lookup_snippet(&self.lang, trigger) else {
            debug!(trigger, lang = %self.lang, "accepted row has no snippet");
            return;
        };
        info!(trigger, lang = %self.lang, "expanding snippet");

        self.end_session(buf);
        let expansion = expand::expand_template(buf, &template, position);
        let numbered: Vec<u8> = expansion.numbered_ids().collect();

        // a snippet with at most one placeholder needs no navigation: park
        // the caret on the final spot and stay out of snippet mode
        if numbered.len() <= 1 {
            if let Some(pos) = expansion.final_position() {
                buf.set_selection(pos, pos);
            }
            return;
        }

        let first = numbered[0];
        let session = SnippetSession::new(expansion.spots, first);
        session.apply_selection(buf, first);
        session.refresh_markers(buf);
        self.session = Some(session);
    }

    /// The character-typed completion logic, in priority order: paths,
    /// closing tags, snippet rows, word matches.
    fn character_added(&mut self, buf: &mut dyn EditBuffer, ch: char) -> Option<PopupAction> {
        let pos = buf.caret();
        // only complete at the end of a word
        if pos != buf.word_end(pos) {
            return None;
        }
        let word = buf.text_range(buf.word_start(pos), pos);

        if self.config.path_completion {
            if let Some(action) = self.path_popup(buf, pos) {
                return Some(action);
            }
        }

        if ch == '/' && self.config.tag_completion && self.store.is_markup(&self.lang) {
            if let Some(tag) = closing_tag(buf, pos) {
                return Some(PopupAction::Show(CompletionList {
                    items: vec![CompletionItem {
                        text: tag,
                        kind: CompletionKind::Tag,
                    }],
                    replace_len: 0,
                    auto_hide: true,
                }));
            }
        }

        if word.is_empty() && pos > 2 && buf.char_at(pos - 1) == Some(' ') {
            return self.snippet_row_popup(buf, pos);
        }

        if self.config.word_completion && !word.is_empty() && word.chars().count() >= self.config.min_word_len
        {
            let matches = self.store.prefix_matches(&self.lang, self.doc, &word);
            if matches.is_empty() {
                return None;
            }
            let items = matches
                .into_iter()
                .map(|(text, kind)| CompletionItem { text, kind })
                .collect();
            return Some(PopupAction::Show(CompletionList {
                items,
                replace_len: word.chars().count(),
                auto_hide: true,
            }));
        }
        None
    }

    /// Directory listing when the line up to the caret ends in a path token.
    fn path_popup(&self, buf: &dyn EditBuffer, pos: usize) -> Option<PopupAction> {
        let line = buf.line_of(pos);
        let text = buf.line_text(line);
        let text = text.trim_end_matches(['\r', '\n']);
        let (raw, dir) = paths::paths_for_completion(text)?;

        // the token must end exactly at the caret; check before touching
        // the filesystem
        let col = pos - buf.line_start(line);
        let upto: String = text.chars().take(col).collect();
        if !upto.ends_with(&raw) {
            return None;
        }

        let entries = paths::enumerate(&dir, &raw, self.config.path_scan_budget());
        if entries.is_empty() {
            return None;
        }
        let items = entries
            .into_iter()
            .map(|text| CompletionItem {
                text,
                kind: CompletionKind::Path,
            })
            .collect();
        Some(PopupAction::Show(CompletionList {
            items,
            replace_len: raw.chars().count(),
            auto_hide: true,
        }))
    }

    /// After `word ` (trailing space), offer the snippet registered for the
    /// word as a single `"trigger: preview"` row.
    fn snippet_row_popup(&mut self, buf: &dyn EditBuffer, pos: usize) -> Option<PopupAction> {
        let prev_start = buf.word_start(pos - 2);
        let prev_end = buf.word_end(pos - 2);
        let prev = buf.text_range(prev_start, prev_end);
        if prev.is_empty() {
            return None;
        }
        let template = self.store.lookup_snippet(&self.lang, &prev)?;
        let row = format!("{prev}: {}", sanitize_template(&template));
        self.pending_select = Some(prev.clone());
        Some(PopupAction::Show(CompletionList {
            items: vec![CompletionItem {
                text: row,
                kind: CompletionKind::Snippet,
            }],
            replace_len: prev.chars().count() + 1,
            auto_hide: false,
        }))
    }
}

/// Tag name for the `</` the caret sits behind: walk back to the matching
/// unclosed `<`, honoring nested closed pairs in between.
fn closing_tag(buf: &dyn EditBuffer, pos: usize) -> Option<String> {
    if pos < 2 || buf.char_at(pos - 2) != Some('<') {
        return None;
    }
    let mut open = pos - 2;
    let mut inner = 1usize;
    while inner > 0 {
        open = find_prev(buf, '<', open)?;
        if buf.char_at(open + 1) == Some('/') {
            inner += 1;
        } else {
            inner -= 1;
        }
    }
    let mut name = String::new();
    let mut p = open + 1;
    while p < pos {
        let c = buf.char_at(p)?;
        if c.is_whitespace() || matches!(c, '/' | '>' | '"' | '\'') {
            break;
        }
        name.push(c);
        p += 1;
    }
    (!name.is_empty()).then(|| format!("{name}>"))
}

fn find_prev(buf: &dyn EditBuffer, needle: char, before: usize) -> Option<usize> {
    let mut p = before;
    while p > 0 {
        p -= 1;
        if buf.char_at(p) == Some(needle) {
            return Some(p);
        }
    }
    None
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
