//! Hot-spot data model for one in-progress snippet expansion.
//!
//! A snippet template marks placeholder regions ("hot spots") inside the text
//! it inserts. While a session is live the user tabs between those regions;
//! the tracker keeps their offsets correct under further edits. A spot that
//! occurs more than once in a template is *mirrored*: it owns several
//! regions that are selected together.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::buffer::EditBuffer;

/// Padding applied around the tracked hull when clearing indicators, so
/// stale marker fragments just outside the regions are wiped as well.
const MARKER_SLACK: usize = 100;

/// Identity of one hot spot.
///
/// `Numbered` spots (template digits `1..=9`, keyed by their literal digit)
/// are the navigable placeholders. `Final` (template digit `0`) is where the
/// caret lands when the user finishes the snippet. `FullSpan` covers the
/// whole inserted text and exists only for bulk marker invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpotId {
    Final,
    Numbered(u8),
    FullSpan,
}

/// One tracked region, in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Inclusive on both ends: a caret sitting right at a boundary is still
    /// considered inside the spot.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos <= self.end
    }
}

pub type RegionList = SmallVec<[Region; 2]>;

/// Live state of one snippet expansion: the tracked spot map plus the
/// navigation position. Owned by the engine of a single editor view; the
/// session existing at all is what "active" means.
#[derive(Debug, Clone)]
pub struct SnippetSession {
    pub(crate) spots: BTreeMap<SpotId, RegionList>,
    pub(crate) current: u8,
    pub(crate) previous: Option<u8>,
}

impl SnippetSession {
    pub(crate) fn new(spots: BTreeMap<SpotId, RegionList>, current: u8) -> Self {
        Self {
            spots,
            current,
            previous: None,
        }
    }

    /// The numbered spot the user is currently on.
    pub fn current_spot(&self) -> u8 {
        self.current
    }

    /// All tracked spots and their regions.
    pub fn spots(&self) -> &BTreeMap<SpotId, RegionList> {
        &self.spots
    }

    /// Numbered spot ids in ascending order.
    pub fn numbered_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.spots.keys().filter_map(|id| match id {
            SpotId::Numbered(n) => Some(*n),
            _ => None,
        })
    }

    pub fn regions(&self, id: SpotId) -> Option<&RegionList> {
        self.spots.get(&id)
    }

    /// Whether `pos` falls inside any tracked region (full span included).
    pub fn contains(&self, pos: usize) -> bool {
        self.spots
            .values()
            .flatten()
            .any(|region| region.contains(pos))
    }

    /// Where the caret should land when the session finishes.
    pub(crate) fn final_position(&self) -> Option<usize> {
        self.spots
            .get(&SpotId::Final)
            .and_then(|regions| regions.first())
            .map(|region| region.start)
    }

    /// Select every region of a numbered spot: the first one as the primary
    /// selection, the rest as additional simultaneous ranges.
    pub(crate) fn apply_selection(&self, buf: &mut dyn EditBuffer, id: u8) {
        let Some(regions) = self.spots.get(&SpotId::Numbered(id)) else {
            return;
        };
        let mut first = true;
        for region in regions {
            if first {
                buf.set_selection(region.start, region.end);
                first = false;
            } else {
                buf.add_selection(region.start, region.end);
            }
        }
    }

    fn marker_hull(&self) -> Option<(usize, usize)> {
        let mut first = usize::MAX;
        let mut last = 0;
        for region in self.spots.values().flatten() {
            first = first.min(region.start);
            last = last.max(region.end);
        }
        (first != usize::MAX).then_some((first, last))
    }

    /// Redraw the spot indicators: wipe the padded hull, then fill one range
    /// per region of every navigable spot. The full-span entry only widens
    /// the wiped hull.
    pub(crate) fn refresh_markers(&self, buf: &mut dyn EditBuffer) {
        self.clear_markers(buf);
        for (id, regions) in &self.spots {
            if *id == SpotId::FullSpan {
                continue;
            }
            for region in regions {
                buf.set_indicator(region.start, region.width());
            }
        }
    }

    /// Remove all spot indicators without touching text.
    pub(crate) fn clear_markers(&self, buf: &mut dyn EditBuffer) {
        if let Some((first, last)) = self.marker_hull() {
            let from = first.saturating_sub(MARKER_SLACK);
            buf.clear_indicator(from, last - from + MARKER_SLACK);
        }
    }
}
