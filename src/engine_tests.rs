use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;
use crate::buffer::{EditBuffer, Key, Notification, TextEdit};
use crate::rope_buffer::RopeBuffer;
use crate::session::SpotId;
use crate::store::{CompletionKind, CompletionStore, DocId};

fn engine_with(snippets: &[(&str, &str)]) -> CompletionEngine {
    let store = CompletionStore::new();
    store.add_snippets(
        "rust",
        snippets
            .iter()
            .map(|(t, s)| (t.to_string(), s.to_string())),
    );
    let mut engine = CompletionEngine::new(store, EngineConfig::default());
    engine.set_document(DocId(1), "rust");
    engine
}

/// Accept a snippet row the way the popup host would.
fn accept(engine: &mut CompletionEngine, buf: &mut RopeBuffer, trigger: &str, position: usize) {
    engine.handle_notification(
        buf,
        Notification::CompletionAccepted {
            text: format!("{trigger}: preview"),
            position,
        },
    );
}

/// Deliver pending buffer edits to the engine, like a host event loop.
fn pump(engine: &mut CompletionEngine, buf: &mut RopeBuffer) {
    for edit in buf.take_edits() {
        engine.handle_notification(buf, Notification::TextModified(edit));
    }
}

/// Expand `trigger` typed alone in an empty buffer.
fn expand_alone(
    engine: &mut CompletionEngine,
    trigger: &str,
) -> RopeBuffer {
    let mut buf = RopeBuffer::from_text(trigger);
    buf.set_caret(trigger.chars().count());
    accept(engine, &mut buf, trigger, 0);
    buf
}

// -- session lifecycle -------------------------------------------------------

#[test]
fn single_placeholder_snippet_exits_immediately() {
    let mut engine = engine_with(&[("sni", "foo(^1bar^)")]);
    let buf = expand_alone(&mut engine, "sni");
    assert_eq!(buf.text(), "foo(bar)");
    assert!(engine.session().is_none());
    // caret parked on the synthesized final spot
    assert_eq!(buf.selections(), vec![(8, 8)]);
}

#[test]
fn two_placeholders_navigate_then_finalize() {
    let mut engine = engine_with(&[("sni", "^1a^, ^2b^")]);
    let mut buf = expand_alone(&mut engine, "sni");
    assert_eq!(buf.text(), "a, b");
    assert_eq!(engine.session().map(|s| s.current_spot()), Some(1));
    assert_eq!(buf.selections(), vec![(0, 1)]);

    assert!(engine.handle_key(&mut buf, Key::Tab));
    assert_eq!(engine.session().map(|s| s.current_spot()), Some(2));
    assert_eq!(buf.selections(), vec![(3, 4)]);

    // from the last spot, coming from spot 1: finalize onto the final spot
    assert!(engine.handle_key(&mut buf, Key::Tab));
    assert!(engine.session().is_none());
    assert_eq!(buf.selections(), vec![(4, 4)]);
}

#[test]
fn three_placeholders_loop_back_instead_of_exiting() {
    let mut engine = engine_with(&[("sni", "^1a^ ^2b^ ^3c^")]);
    let mut buf = expand_alone(&mut engine, "sni");
    engine.handle_key(&mut buf, Key::Tab); // 1 -> 2
    engine.handle_key(&mut buf, Key::Tab); // 2 -> 3
    engine.handle_key(&mut buf, Key::Tab); // top, coming from 2: loop to 1
    assert_eq!(engine.session().map(|s| s.current_spot()), Some(1));
}

#[test]
fn mirrored_spot_selects_both_regions() {
    let mut engine = engine_with(&[("tag", "<^1tag^>x</^1tag^>")]);
    let buf = expand_alone(&mut engine, "tag");
    assert_eq!(buf.text(), "<tag>x</tag>");
    let session = engine.session().unwrap();
    assert_eq!(session.regions(SpotId::Numbered(1)).unwrap().len(), 2);
    assert_eq!(buf.selections(), vec![(1, 4), (8, 11)]);
}

#[test]
fn escape_clears_markers_but_keeps_text() {
    let mut engine = engine_with(&[("sni", "^1a^, ^2b^")]);
    let mut buf = expand_alone(&mut engine, "sni");
    assert!(!buf.indicators().is_empty());

    assert!(engine.handle_key(&mut buf, Key::Escape));
    assert!(engine.session().is_none());
    assert_eq!(buf.text(), "a, b");
    assert!(buf.indicators().is_empty());
}

#[test]
fn keys_pass_through_without_a_session() {
    let mut engine = engine_with(&[]);
    let mut buf = RopeBuffer::new();
    assert!(!engine.handle_key(&mut buf, Key::Tab));
    assert!(!engine.handle_key(&mut buf, Key::Escape));
}

// -- tracking ----------------------------------------------------------------

#[test]
fn typing_inside_a_spot_grows_it() {
    let mut engine = engine_with(&[("sni", "^1a^, ^2b^")]);
    let mut buf = expand_alone(&mut engine, "sni");
    // spot 1 is selected (0,1); typing replaces its placeholder
    buf.insert_text("xyz");
    pump(&mut engine, &mut buf);
    engine.handle_notification(&mut buf, Notification::SelectionChanged);

    let session = engine.session().expect("session survives tracked edits");
    let regions = session.regions(SpotId::Numbered(1)).unwrap();
    assert_eq!((regions[0].start, regions[0].end), (0, 3));
    let second = session.regions(SpotId::Numbered(2)).unwrap();
    assert_eq!((second[0].start, second[0].end), (5, 6));
}

#[test]
fn newline_edit_ends_the_session() {
    let mut engine = engine_with(&[("sni", "^1a^, ^2b^")]);
    let mut buf = expand_alone(&mut engine, "sni");
    buf.set_caret(2);
    buf.insert_text("\n");
    pump(&mut engine, &mut buf);
    assert!(engine.session().is_none());
    assert!(buf.indicators().is_empty());
}

#[test]
fn caret_leaving_the_snippet_ends_the_session() {
    let mut engine = engine_with(&[("sni", "^1a^, ^2b^")]);
    let mut buf = RopeBuffer::from_text("sni tail");
    buf.set_caret(3);
    accept(&mut engine, &mut buf, "sni", 0);
    assert_eq!(buf.text(), "a, b tail");
    assert!(engine.session().is_some());

    // independent typing at the end of the buffer, outside the full span
    let end = buf.len_chars();
    buf.set_caret(end);
    buf.insert_text("x");
    pump(&mut engine, &mut buf);
    engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: 'x' });
    assert!(engine.session().is_none());
}

#[test]
fn mirrored_typing_keeps_the_session() {
    let mut engine = engine_with(&[("tag", "<^1tag^>x</^1tag^>")]);
    let mut buf = expand_alone(&mut engine, "tag");

    // both mirrors are selected; typing hits each range in turn
    buf.insert_text("b");
    pump(&mut engine, &mut buf);
    engine.handle_notification(&mut buf, Notification::SelectionChanged);

    assert_eq!(buf.text(), "<b>x</b>");
    let session = engine.session().expect("mirrors stayed in sync");
    let regions = session.regions(SpotId::Numbered(1)).unwrap();
    assert_eq!((regions[0].start, regions[0].end), (1, 2));
    assert_eq!((regions[1].start, regions[1].end), (6, 7));
}

#[test]
fn editing_one_mirror_alone_ends_the_session() {
    let mut engine = engine_with(&[("tag", "<^1tag^>x</^1tag^>")]);
    let mut buf = expand_alone(&mut engine, "tag");

    // collapse onto the first mirror only and type there
    buf.set_caret(2);
    buf.insert_text("z");
    pump(&mut engine, &mut buf);
    engine.handle_notification(&mut buf, Notification::SelectionChanged);
    assert!(engine.session().is_none());
}

#[test]
fn expansion_is_a_single_undo_group() {
    let mut engine = engine_with(&[("sni", "^1a^, ^2b^")]);
    let buf = expand_alone(&mut engine, "sni");
    assert_eq!(buf.undo_group_count(), 1);
}

// -- re-entrancy guard -------------------------------------------------------

/// Buffer that records the guard flag every time text is inserted, and can
/// blow up mid-expansion.
struct ProbeBuffer {
    inner: RopeBuffer,
    flag: Rc<Cell<bool>>,
    seen: Rc<RefCell<Vec<bool>>>,
    panic_at: Option<usize>,
    inserts: usize,
}

impl ProbeBuffer {
    fn new(text: &str, flag: Rc<Cell<bool>>, panic_at: Option<usize>) -> Self {
        Self {
            inner: RopeBuffer::from_text(text),
            flag,
            seen: Rc::new(RefCell::new(Vec::new())),
            panic_at,
            inserts: 0,
        }
    }
}

impl EditBuffer for ProbeBuffer {
    fn caret(&self) -> usize {
        self.inner.caret()
    }
    fn len_chars(&self) -> usize {
        self.inner.len_chars()
    }
    fn line_count(&self) -> usize {
        self.inner.line_count()
    }
    fn char_at(&self, pos: usize) -> Option<char> {
        self.inner.char_at(pos)
    }
    fn text_range(&self, start: usize, end: usize) -> String {
        self.inner.text_range(start, end)
    }
    fn line_of(&self, pos: usize) -> usize {
        self.inner.line_of(pos)
    }
    fn line_start(&self, line: usize) -> usize {
        self.inner.line_start(line)
    }
    fn line_text(&self, line: usize) -> String {
        self.inner.line_text(line)
    }
    fn line_indentation(&self, line: usize) -> usize {
        self.inner.line_indentation(line)
    }
    fn tab_width(&self) -> usize {
        self.inner.tab_width()
    }
    fn word_start(&self, pos: usize) -> usize {
        self.inner.word_start(pos)
    }
    fn word_end(&self, pos: usize) -> usize {
        self.inner.word_end(pos)
    }
    fn insert_text(&mut self, text: &str) {
        self.inserts += 1;
        self.seen.borrow_mut().push(self.flag.get());
        if self.panic_at == Some(self.inserts) {
            panic!("buffer gave up");
        }
        self.inner.insert_text(text);
    }
    fn delete_range(&mut self, offset: usize, len: usize) {
        self.inner.delete_range(offset, len);
    }
    fn delete_back(&mut self) {
        self.inner.delete_back();
    }
    fn insert_tab(&mut self) {
        self.inner.insert_tab();
    }
    fn insert_newline(&mut self) {
        self.inner.insert_newline();
    }
    fn set_selection(&mut self, anchor: usize, caret: usize) {
        self.inner.set_selection(anchor, caret);
    }
    fn add_selection(&mut self, anchor: usize, caret: usize) {
        self.inner.add_selection(anchor, caret);
    }
    fn begin_undo_group(&mut self) {
        self.inner.begin_undo_group();
    }
    fn end_undo_group(&mut self) {
        self.inner.end_undo_group();
    }
    fn set_indicator(&mut self, start: usize, len: usize) {
        self.inner.set_indicator(start, len);
    }
    fn clear_indicator(&mut self, start: usize, len: usize) {
        self.inner.clear_indicator(start, len);
    }
    fn take_edits(&mut self) -> Vec<TextEdit> {
        self.inner.take_edits()
    }
}

#[test]
fn guard_is_set_for_every_insertion_and_cleared_after() {
    let mut engine = engine_with(&[("sni", "ab^1c^d")]);
    let flag = engine.inserting_snippet.clone();
    let mut buf = ProbeBuffer::new("sni", flag, None);
    buf.inner.set_caret(3);

    accept_probe(&mut engine, &mut buf, "sni");
    let seen = buf.seen.borrow();
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|&set| set));
    assert!(!engine.is_expanding());
}

#[test]
fn guard_is_cleared_when_the_buffer_panics() {
    let mut engine = engine_with(&[("sni", "abcdef")]);
    let flag = engine.inserting_snippet.clone();
    let mut buf = ProbeBuffer::new("sni", flag, Some(2));
    buf.inner.set_caret(3);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        accept_probe(&mut engine, &mut buf, "sni");
    }));
    assert!(result.is_err());
    assert!(!engine.is_expanding());
}

fn accept_probe(engine: &mut CompletionEngine, buf: &mut ProbeBuffer, trigger: &str) {
    engine.handle_notification(
        buf,
        Notification::CompletionAccepted {
            text: format!("{trigger}: preview"),
            position: 0,
        },
    );
}

#[test]
fn character_events_are_ignored_while_expanding() {
    let mut engine = engine_with(&[]);
    engine
        .store()
        .add_lang_words("rust", [("spawn".to_string(), CompletionKind::Code)]);
    let mut buf = RopeBuffer::from_text("spa");
    buf.set_caret(3);

    engine.inserting_snippet.set(true);
    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: 'a' });
    assert!(action.is_none());
    engine.inserting_snippet.set(false);

    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: 'a' });
    assert!(action.is_some());
}

// -- popups ------------------------------------------------------------------

#[test]
fn word_completion_merges_doc_and_language_words() {
    let mut engine = engine_with(&[]);
    engine.store().add_lang_words(
        "rust",
        [
            ("spawn".to_string(), CompletionKind::Code),
            ("other".to_string(), CompletionKind::Code),
        ],
    );
    engine
        .store()
        .add_doc_words(DocId(1), [("spare".to_string(), CompletionKind::Code)]);

    let mut buf = RopeBuffer::from_text("spa");
    buf.set_caret(3);
    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: 'a' });
    let Some(PopupAction::Show(list)) = action else {
        panic!("expected a completion popup");
    };
    let words: Vec<&str> = list.items.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(words, vec!["spare", "spawn"]);
    assert_eq!(list.replace_len, 3);
    assert!(list.auto_hide);
}

#[test]
fn word_completion_respects_the_config_toggle() {
    let store = CompletionStore::new();
    store.add_lang_words("rust", [("spawn".to_string(), CompletionKind::Code)]);
    let config = EngineConfig {
        word_completion: false,
        ..EngineConfig::default()
    };
    let mut engine = CompletionEngine::new(store, config);
    engine.set_document(DocId(1), "rust");

    let mut buf = RopeBuffer::from_text("spa");
    buf.set_caret(3);
    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: 'a' });
    assert!(action.is_none());
}

#[test]
fn snippet_row_appears_after_trigger_and_space() {
    let mut engine = engine_with(&[("for", "for ^1x^ in ^2y^")]);
    let mut buf = RopeBuffer::from_text("for ");
    buf.set_caret(4);
    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: ' ' });
    let Some(PopupAction::Show(list)) = action else {
        panic!("expected the snippet row");
    };
    assert_eq!(list.items[0].text, "for: for x in y");
    assert_eq!(list.items[0].kind, CompletionKind::Snippet);
    assert_eq!(list.replace_len, 4);
    assert!(!list.auto_hide);

    // an empty popup selection re-highlights the snippet row
    let action = engine.handle_notification(
        &mut buf,
        Notification::CompletionListSelectionChanged { text: None },
    );
    assert_eq!(action, Some(PopupAction::Select("for".to_string())));

    // dismissal forgets it
    engine.handle_notification(&mut buf, Notification::CompletionCancelled);
    let action = engine.handle_notification(
        &mut buf,
        Notification::CompletionListSelectionChanged { text: None },
    );
    assert!(action.is_none());
}

#[test]
fn closing_tag_completion_honors_nesting() {
    let mut engine = engine_with(&[]);
    engine.set_document(DocId(1), "html");

    let mut buf = RopeBuffer::from_text("<div><span></");
    buf.set_caret(13);
    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: '/' });
    let Some(PopupAction::Show(list)) = action else {
        panic!("expected a closing tag");
    };
    assert_eq!(list.items[0].text, "span>");
    assert_eq!(list.items[0].kind, CompletionKind::Tag);

    let mut buf = RopeBuffer::from_text("<div><b></b></");
    buf.set_caret(14);
    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: '/' });
    let Some(PopupAction::Show(list)) = action else {
        panic!("expected a closing tag");
    };
    assert_eq!(list.items[0].text, "div>");
}

#[test]
fn closing_tags_are_not_offered_outside_markup() {
    let mut engine = engine_with(&[]);
    let mut buf = RopeBuffer::from_text("<div></");
    buf.set_caret(7);
    let action = engine.handle_notification(&mut buf, Notification::CharacterAdded { ch: '/' });
    assert!(action.is_none());
}

// -- accepted rows that are not snippets -------------------------------------

#[test]
fn plain_word_accept_is_a_no_op() {
    let mut engine = engine_with(&[("sni", "^1a^")]);
    let mut buf = RopeBuffer::from_text("spawn");
    buf.set_caret(5);
    engine.handle_notification(
        &mut buf,
        Notification::CompletionAccepted {
            text: "spawn".to_string(),
            position: 0,
        },
    );
    assert_eq!(buf.text(), "spawn");
    assert!(engine.session().is_none());
}

#[test]
fn unknown_trigger_accept_is_a_no_op() {
    let mut engine = engine_with(&[]);
    let mut buf = RopeBuffer::from_text("mystery");
    buf.set_caret(7);
    engine.handle_notification(
        &mut buf,
        Notification::CompletionAccepted {
            text: "mystery: preview".to_string(),
            position: 0,
        },
    );
    assert_eq!(buf.text(), "mystery");
    assert!(engine.session().is_none());
}
