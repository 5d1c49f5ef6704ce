//! Keyboard navigation between the hot spots of an active session.
//!
//! Tab and Enter advance through the numbered spots in ascending id order,
//! Shift+Tab walks backwards, Escape bails out. Whether reaching the top of
//! the list loops back to the first spot or finishes the snippet depends on
//! where the user came from; see [`handle_key`].

use crate::buffer::{EditBuffer, Key};
use crate::session::SnippetSession;

/// Result of routing one key press into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Moved to another spot; the session stays live.
    Moved(u8),
    /// The session is over. The caller clears markers and drops it.
    Exited,
}

fn move_to(session: &mut SnippetSession, buf: &mut dyn EditBuffer, id: u8) -> NavOutcome {
    session.previous = Some(session.current);
    session.current = id;
    session.apply_selection(buf, id);
    NavOutcome::Moved(id)
}

fn finalize(session: &SnippetSession, buf: &mut dyn EditBuffer) -> NavOutcome {
    if let Some(pos) = session.final_position() {
        buf.set_selection(pos, pos);
    }
    NavOutcome::Exited
}

/// Route a key press while a session is active. Every key in [`Key`] is
/// consumed.
///
/// At the top of the spot list, Tab loops back to the lowest spot unless the
/// previously selected spot *was* the lowest one — then it finishes instead,
/// collapsing the caret onto the final spot. Enter advances the same way but
/// its exit condition is the mirror image: it finishes only when the
/// previous spot was *not* the lowest. Shift+Tab wraps downward forever and
/// never finishes. The history dependence means Shift+Tab followed by Tab is
/// not a no-op; that is intentional, long-standing behavior.
pub fn handle_key(
    session: &mut SnippetSession,
    buf: &mut dyn EditBuffer,
    key: Key,
) -> NavOutcome {
    let ids: Vec<u8> = session.numbered_ids().collect();
    if ids.is_empty() {
        return finalize(session, buf);
    }
    let lowest = ids[0];
    let highest = ids[ids.len() - 1];

    match key {
        Key::Escape => NavOutcome::Exited,
        Key::ShiftTab => {
            let target = ids
                .iter()
                .rev()
                .find(|&&id| id < session.current)
                .copied()
                .unwrap_or(highest);
            move_to(session, buf, target)
        }
        Key::Tab | Key::Enter => match ids.iter().find(|&&id| id > session.current).copied() {
            Some(next) => move_to(session, buf, next),
            None => {
                let came_from_lowest = session.previous == Some(lowest);
                let exit = match key {
                    Key::Tab => came_from_lowest,
                    Key::Enter => !came_from_lowest,
                    _ => unreachable!(),
                };
                if exit {
                    finalize(session, buf)
                } else {
                    move_to(session, buf, lowest)
                }
            }
        },
    }
}
