//! Editor buffer abstraction consumed by the completion engine.
//!
//! The engine never talks to a concrete editor widget. Everything it needs
//! from the host — caret queries, text mutation, multi-range selection,
//! indicator drawing, and the synchronous edit-event stream — goes through
//! [`EditBuffer`]. The host forwards its editor events to the engine as
//! [`Notification`] values.
//!
//! Offsets are character offsets from the start of the buffer. All calls are
//! made from the single thread that owns the editor view; nothing here blocks.

/// Whether an edit added or removed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
}

/// One buffer mutation, reported synchronously after it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    /// Character offset where the edit took place.
    pub offset: usize,
    /// Number of characters inserted or removed.
    pub length: usize,
    pub kind: EditKind,
    /// Net change in the buffer's line count caused by this edit.
    pub lines_added: isize,
}

impl TextEdit {
    pub fn insert(offset: usize, length: usize, lines_added: isize) -> Self {
        Self {
            offset,
            length,
            kind: EditKind::Insert,
            lines_added,
        }
    }

    pub fn delete(offset: usize, length: usize, lines_added: isize) -> Self {
        Self {
            offset,
            length,
            kind: EditKind::Delete,
            lines_added,
        }
    }
}

/// Editor events the engine reacts to, dispatched by pattern match.
///
/// Hosts translate their widget's notification stream into these variants and
/// feed them to [`crate::engine::CompletionEngine::handle_notification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The user typed a character and it has already been inserted.
    CharacterAdded { ch: char },
    /// The caret or selection changed for any reason.
    SelectionChanged,
    /// Text was inserted or deleted (one event per mutation).
    TextModified(TextEdit),
    /// The highlighted row of the completion popup changed. `None` or an
    /// empty string means the popup currently has no matching row.
    CompletionListSelectionChanged { text: Option<String> },
    /// The completion popup was dismissed without accepting anything.
    CompletionCancelled,
    /// The user accepted a completion row. `position` is the offset where
    /// the typed text being completed starts.
    CompletionAccepted { text: String, position: usize },
}

/// Keys the navigation controller may intercept while a snippet session is
/// active. Everything else goes straight to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    ShiftTab,
    Enter,
    Escape,
}

/// The editable text buffer of one editor view.
///
/// The trait mirrors the small slice of a real editor component the engine
/// depends on. Mutating calls operate on the current selection set the way an
/// editor would: [`EditBuffer::insert_text`] replaces every selection range
/// and leaves a caret after each inserted copy.
pub trait EditBuffer {
    // -- queries ------------------------------------------------------------

    /// Caret offset of the primary selection.
    fn caret(&self) -> usize;
    fn len_chars(&self) -> usize;
    fn line_count(&self) -> usize;
    fn char_at(&self, pos: usize) -> Option<char>;
    fn text_range(&self, start: usize, end: usize) -> String;
    fn line_of(&self, pos: usize) -> usize;
    fn line_start(&self, line: usize) -> usize;
    fn line_text(&self, line: usize) -> String;
    /// Indentation of `line` in columns, tabs counted as [`EditBuffer::tab_width`].
    fn line_indentation(&self, line: usize) -> usize;
    fn tab_width(&self) -> usize;
    /// Start of the word containing (or ending at) `pos`.
    fn word_start(&self, pos: usize) -> usize;
    /// End of the word containing (or starting at) `pos`.
    fn word_end(&self, pos: usize) -> usize;

    // -- mutation -----------------------------------------------------------

    /// Replace every selection range with `text`; carets land after the text.
    fn insert_text(&mut self, text: &str);
    fn delete_range(&mut self, offset: usize, len: usize);
    /// Delete the selection, or the character before the caret when the
    /// selection is empty.
    fn delete_back(&mut self);
    /// The editor's tab-key insertion behavior (tabs or spaces per settings).
    fn insert_tab(&mut self);
    fn insert_newline(&mut self);

    // -- selection ----------------------------------------------------------

    /// Replace all selections with a single range.
    fn set_selection(&mut self, anchor: usize, caret: usize);
    /// Add a further simultaneous selection range.
    fn add_selection(&mut self, anchor: usize, caret: usize);

    // -- undo ---------------------------------------------------------------

    fn begin_undo_group(&mut self);
    fn end_undo_group(&mut self);

    // -- markers ------------------------------------------------------------

    /// Highlight a range. Fire-and-forget; failures are not observable.
    fn set_indicator(&mut self, start: usize, len: usize);
    /// Remove highlights wholly inside the given span.
    fn clear_indicator(&mut self, start: usize, len: usize);

    // -- notifications ------------------------------------------------------

    /// Drain the edits performed since the last drain, in order.
    fn take_edits(&mut self) -> Vec<TextEdit>;
}
