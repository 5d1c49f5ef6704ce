//! Offset bookkeeping for an active snippet session.
//!
//! Every buffer mutation reported while a session is live runs through
//! [`apply_edit`], which rewrites the tracked region boundaries so they keep
//! describing the same text. Edits that change the line count are not
//! correctable with plain offset arithmetic and end the session instead.

use crate::buffer::{EditKind, TextEdit};
use crate::session::SnippetSession;

/// What the tracker decided about an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Offsets were adjusted; the session stays live.
    Keep,
    /// The edit cannot be tracked; the caller must tear the session down.
    EndSession,
}

/// Adjust every tracked region for one buffer edit.
///
/// Inserts treat the two boundaries asymmetrically: a start moves only when
/// the insertion is strictly before it, while an end moves when the insertion
/// is at or before it. Typing at either boundary of a spot therefore grows
/// the spot instead of pushing it away. Deletes shift both boundaries when
/// they sit strictly behind the removal point; boundaries inside the removed
/// range collapse onto it.
pub fn apply_edit(session: &mut SnippetSession, edit: &TextEdit) -> TrackOutcome {
    if edit.lines_added != 0 {
        return TrackOutcome::EndSession;
    }
    for regions in session.spots.values_mut() {
        for region in regions.iter_mut() {
            match edit.kind {
                EditKind::Insert => {
                    if region.start > edit.offset {
                        region.start += edit.length;
                    }
                    if region.end >= edit.offset {
                        region.end += edit.length;
                    }
                }
                EditKind::Delete => {
                    if region.start > edit.offset {
                        region.start = region.start.saturating_sub(edit.length).max(edit.offset);
                    }
                    if region.end > edit.offset {
                        region.end = region.end.saturating_sub(edit.length).max(edit.offset);
                    }
                }
            }
        }
    }
    TrackOutcome::Keep
}

/// Whether every mirrored spot's regions still have equal width.
///
/// Mirrored regions receive identical edits while the user types with a
/// multi-range selection; a width mismatch means some edit landed in only
/// one of them, and the session can no longer claim the mirrors are in sync.
pub fn mirrors_in_sync(session: &SnippetSession) -> bool {
    session.spots.values().all(|regions| {
        let mut widths = regions.iter().map(|r| r.width());
        match widths.next() {
            Some(first) => widths.all(|w| w == first),
            None => true,
        }
    })
}
