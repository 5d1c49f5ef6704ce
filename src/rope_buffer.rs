//! Reference [`EditBuffer`] implementation backed by a rope.
//!
//! This is the buffer the demo driver and the test suites run against. It
//! models the editing behavior the engine relies on from a real editor
//! widget: multi-range selections that all receive typed text, a synchronous
//! edit-event stream, undo grouping, and indicator ranges.

use ropey::Rope;

use crate::buffer::{EditBuffer, TextEdit};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, Copy)]
struct Sel {
    anchor: usize,
    caret: usize,
}

impl Sel {
    fn ordered(&self) -> (usize, usize) {
        if self.anchor <= self.caret {
            (self.anchor, self.caret)
        } else {
            (self.caret, self.anchor)
        }
    }
}

/// Rope-backed buffer with selection, undo-group and indicator bookkeeping.
///
/// The primary selection is the one installed by the last
/// [`EditBuffer::set_selection`]; ranges added afterwards with
/// [`EditBuffer::add_selection`] follow it.
pub struct RopeBuffer {
    rope: Rope,
    selections: Vec<Sel>,
    tab_width: usize,
    use_tabs: bool,
    events: Vec<TextEdit>,
    undo_depth: usize,
    open_group: Vec<TextEdit>,
    undo_groups: Vec<Vec<TextEdit>>,
    indicators: Vec<(usize, usize)>,
}

impl Default for RopeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RopeBuffer {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            selections: vec![Sel { anchor: 0, caret: 0 }],
            tab_width: 4,
            use_tabs: true,
            events: Vec::new(),
            undo_depth: 0,
            open_group: Vec::new(),
            undo_groups: Vec::new(),
            indicators: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn set_caret(&mut self, pos: usize) {
        self.set_selection(pos, pos);
    }

    /// Current selection ranges as `(anchor, caret)` pairs.
    pub fn selections(&self) -> Vec<(usize, usize)> {
        self.selections.iter().map(|s| (s.anchor, s.caret)).collect()
    }

    pub fn set_tab_width(&mut self, width: usize) {
        self.tab_width = width.max(1);
    }

    /// Insert spaces instead of a tab character on [`EditBuffer::insert_tab`].
    pub fn set_use_tabs(&mut self, use_tabs: bool) {
        self.use_tabs = use_tabs;
    }

    /// Indicator ranges currently set, as `(start, len)` pairs.
    pub fn indicators(&self) -> &[(usize, usize)] {
        &self.indicators
    }

    /// Number of completed undo groups (each ungrouped edit counts as one).
    pub fn undo_group_count(&self) -> usize {
        self.undo_groups.len()
    }

    fn record(&mut self, edit: TextEdit) {
        self.events.push(edit);
        if self.undo_depth > 0 {
            self.open_group.push(edit);
        } else {
            self.undo_groups.push(vec![edit]);
        }
    }

    fn newlines_in(&self, lo: usize, hi: usize) -> isize {
        self.rope.slice(lo..hi).chars().filter(|&c| c == '\n').count() as isize
    }

    fn insert_span(&mut self, at: usize, text: &str) {
        let len = text.chars().count();
        if len == 0 {
            return;
        }
        let lines = text.chars().filter(|&c| c == '\n').count() as isize;
        self.rope.insert(at, text);
        self.record(TextEdit::insert(at, len, lines));
        for sel in &mut self.selections {
            if sel.anchor >= at {
                sel.anchor += len;
            }
            if sel.caret >= at {
                sel.caret += len;
            }
        }
    }

    fn remove_span(&mut self, lo: usize, hi: usize) {
        if hi <= lo {
            return;
        }
        let lines = self.newlines_in(lo, hi);
        self.rope.remove(lo..hi);
        self.record(TextEdit::delete(lo, hi - lo, -lines));
        let len = hi - lo;
        for sel in &mut self.selections {
            for p in [&mut sel.anchor, &mut sel.caret] {
                if *p >= hi {
                    *p -= len;
                } else if *p > lo {
                    *p = lo;
                }
            }
        }
    }

    fn selection_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.selections.len()).collect();
        order.sort_by_key(|&i| self.selections[i].ordered().0);
        order
    }
}

impl EditBuffer for RopeBuffer {
    fn caret(&self) -> usize {
        self.selections[0].caret
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        if pos < self.rope.len_chars() {
            Some(self.rope.char(pos))
        } else {
            None
        }
    }

    fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.rope.len_chars());
        let start = start.min(end);
        self.rope.slice(start..end).to_string()
    }

    fn line_of(&self, pos: usize) -> usize {
        self.rope.char_to_line(pos.min(self.rope.len_chars()))
    }

    fn line_start(&self, line: usize) -> usize {
        self.rope.line_to_char(line.min(self.rope.len_lines().saturating_sub(1)))
    }

    fn line_text(&self, line: usize) -> String {
        if line >= self.rope.len_lines() {
            return String::new();
        }
        self.rope.line(line).to_string()
    }

    fn line_indentation(&self, line: usize) -> usize {
        let mut width = 0;
        for c in self.line_text(line).chars() {
            match c {
                '\t' => width += self.tab_width - width % self.tab_width,
                ' ' => width += 1,
                _ => break,
            }
        }
        width
    }

    fn tab_width(&self) -> usize {
        self.tab_width
    }

    fn word_start(&self, pos: usize) -> usize {
        let mut p = pos.min(self.rope.len_chars());
        while p > 0 && self.char_at(p - 1).is_some_and(is_word_char) {
            p -= 1;
        }
        p
    }

    fn word_end(&self, pos: usize) -> usize {
        let mut p = pos.min(self.rope.len_chars());
        while self.char_at(p).is_some_and(is_word_char) {
            p += 1;
        }
        p
    }

    fn insert_text(&mut self, text: &str) {
        for i in self.selection_order() {
            let (lo, hi) = self.selections[i].ordered();
            if hi > lo {
                self.remove_span(lo, hi);
            }
            let at = self.selections[i].caret;
            self.insert_span(at, text);
        }
    }

    fn delete_range(&mut self, offset: usize, len: usize) {
        self.remove_span(offset, (offset + len).min(self.rope.len_chars()));
    }

    fn delete_back(&mut self) {
        let mut order = self.selection_order();
        order.reverse();
        for i in order {
            let (lo, hi) = self.selections[i].ordered();
            if hi > lo {
                self.remove_span(lo, hi);
            } else if lo > 0 {
                self.remove_span(lo - 1, lo);
            }
        }
    }

    fn insert_tab(&mut self) {
        if self.use_tabs {
            self.insert_text("\t");
        } else {
            let col = self.caret() - self.line_start(self.line_of(self.caret()));
            let pad = self.tab_width - col % self.tab_width;
            let spaces = " ".repeat(pad);
            self.insert_text(&spaces);
        }
    }

    fn insert_newline(&mut self) {
        self.insert_text("\n");
    }

    fn set_selection(&mut self, anchor: usize, caret: usize) {
        self.selections = vec![Sel { anchor, caret }];
    }

    fn add_selection(&mut self, anchor: usize, caret: usize) {
        self.selections.push(Sel { anchor, caret });
    }

    fn begin_undo_group(&mut self) {
        self.undo_depth += 1;
    }

    fn end_undo_group(&mut self) {
        if self.undo_depth == 0 {
            return;
        }
        self.undo_depth -= 1;
        if self.undo_depth == 0 && !self.open_group.is_empty() {
            let group = std::mem::take(&mut self.open_group);
            self.undo_groups.push(group);
        }
    }

    fn set_indicator(&mut self, start: usize, len: usize) {
        self.indicators.push((start, len));
    }

    fn clear_indicator(&mut self, start: usize, len: usize) {
        let end = start.saturating_add(len);
        self.indicators
            .retain(|&(s, l)| !(s >= start && s + l <= end));
    }

    fn take_edits(&mut self) -> Vec<TextEdit> {
        std::mem::take(&mut self.events)
    }
}
