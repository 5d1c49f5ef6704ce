//! Snippet template expansion.
//!
//! Templates are plain strings with a small escape grammar, scanned left to
//! right with one character of lookback:
//!
//! - `^` (unescaped) marks a hot-spot boundary. A digit directly after a
//!   boundary claims that spot; the boundary position becomes its start, and
//!   the next boundary closes it.
//! - `\<char>` inserts `<char>` literally, tab included.
//! - an unescaped tab runs the buffer's tab-insertion behavior.
//! - an unescaped newline breaks the line; the indentation of the line the
//!   expansion started on is re-applied before the next inserted character.
//! - a backspace control character deletes backwards (used to trim
//!   auto-inserted characters such as a paired brace).
//! - anything else is inserted as-is.
//!
//! The whole expansion is one undo group. The trigger word the user typed
//! (everything between the insertion offset and the caret) is deleted first.

use std::collections::BTreeMap;

use smallvec::smallvec;
use tracing::debug;

use crate::buffer::EditBuffer;
use crate::session::{Region, RegionList, SpotId};

/// Recorded result of expanding one template.
#[derive(Debug)]
pub struct Expansion {
    pub spots: BTreeMap<SpotId, RegionList>,
}

impl Expansion {
    /// Ids of the navigable (numbered) spots, ascending.
    pub fn numbered_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.spots.keys().filter_map(|id| match id {
            SpotId::Numbered(n) => Some(*n),
            _ => None,
        })
    }

    pub fn final_position(&self) -> Option<usize> {
        self.spots
            .get(&SpotId::Final)
            .and_then(|regions| regions.first())
            .map(|region| region.start)
    }
}

fn spot_id(digit: u8) -> SpotId {
    if digit == 0 {
        SpotId::Final
    } else {
        SpotId::Numbered(digit)
    }
}

/// Re-apply the expansion start line's indentation, pending since the last
/// inserted line break. Whole tab widths become tabs, the leftover columns
/// spaces.
fn flush_indent(buf: &mut dyn EditBuffer, pending: &mut bool, indent: usize, tab_width: usize) {
    if !*pending {
        return;
    }
    *pending = false;
    if indent == 0 {
        return;
    }
    let mut lead = String::new();
    lead.extend(std::iter::repeat('\t').take(indent / tab_width));
    lead.extend(std::iter::repeat(' ').take(indent % tab_width));
    buf.insert_text(&lead);
}

fn insert_char(buf: &mut dyn EditBuffer, ch: char) {
    let mut tmp = [0u8; 4];
    buf.insert_text(ch.encode_utf8(&mut tmp));
}

/// Expand `template` into the buffer, replacing `[insertion_offset, caret)`
/// (the already-typed trigger word), and record where every hot spot lands.
///
/// The returned map always carries a [`SpotId::FullSpan`] entry covering the
/// whole inserted text, and a [`SpotId::Final`] entry — synthesized
/// zero-width at the final caret when the template placed no `0` spot. A spot
/// left open at the end of the template is closed at the final caret.
pub fn expand_template(
    buf: &mut dyn EditBuffer,
    template: &str,
    insertion_offset: usize,
) -> Expansion {
    buf.begin_undo_group();

    let caret = buf.caret();
    if caret > insertion_offset {
        buf.delete_range(insertion_offset, caret - insertion_offset);
    }
    buf.set_selection(insertion_offset, insertion_offset);

    let start_line = buf.line_of(insertion_offset);
    let start_indent = buf.line_indentation(start_line);
    let tab_width = buf.tab_width().max(1);

    let mut spots: BTreeMap<SpotId, RegionList> = BTreeMap::new();
    // currently open spot: (digit, start offset)
    let mut open: Option<(u8, usize)> = None;
    // boundary recorded at the most recent unescaped `^`
    let mut boundary = insertion_offset;
    let mut pending_indent = false;
    let (mut last, mut last2) = ('\0', '\0');

    for ch in template.chars() {
        if ch == '^' && last != '\\' {
            flush_indent(buf, &mut pending_indent, start_indent, tab_width);
            boundary = buf.caret();
            if let Some((digit, start)) = open.take() {
                spots
                    .entry(spot_id(digit))
                    .or_default()
                    .push(Region::new(start, boundary));
            }
        } else if last == '^' && last2 != '\\' && ch.is_ascii_digit() {
            open = Some((ch as u8 - b'0', boundary));
        } else if last == '\\' {
            flush_indent(buf, &mut pending_indent, start_indent, tab_width);
            insert_char(buf, ch);
        } else if ch == '\t' {
            flush_indent(buf, &mut pending_indent, start_indent, tab_width);
            buf.insert_tab();
        } else if ch == '\n' {
            buf.insert_newline();
            pending_indent = true;
        } else if ch == '\u{8}' {
            buf.delete_back();
        } else if ch != '\\' {
            flush_indent(buf, &mut pending_indent, start_indent, tab_width);
            insert_char(buf, ch);
        }
        last2 = last;
        last = ch;
    }

    flush_indent(buf, &mut pending_indent, start_indent, tab_width);
    let end = buf.caret();

    if let Some((digit, start)) = open.take() {
        spots
            .entry(spot_id(digit))
            .or_default()
            .push(Region::new(start, end));
    }
    spots
        .entry(SpotId::FullSpan)
        .or_default()
        .push(Region::new(insertion_offset, end));
    spots
        .entry(SpotId::Final)
        .or_insert_with(|| smallvec![Region::new(end, end)]);

    buf.end_undo_group();
    // the expansion's own edits never reach the tracker
    let _ = buf.take_edits();

    debug!(
        spots = spots.len(),
        start = insertion_offset,
        end,
        "expanded snippet template"
    );
    Expansion { spots }
}
