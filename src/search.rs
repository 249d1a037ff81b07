// Full-text search over the flattened document text, plus the mapping
// from match offsets back to document Y coordinates. Matches live in the
// linear `doc_text` space; geometry is resolved lazily against whichever
// layout generation is current.

use crate::layout::{LayoutResult, TextOffset};

/// One occurrence of the query inside `doc_text`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub start: TextOffset,
    pub len: usize,
}

/// Case-fold a string while keeping byte offsets aligned with the input:
/// a character whose lowercase form would change its UTF-8 length is kept
/// as-is so offsets into the folded text stay valid in the original.
pub(crate) fn fold_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let lower = c.to_lowercase().next().unwrap_or(c);
        if lower.len_utf8() == c.len_utf8() && c.to_lowercase().count() == 1 {
            out.push(lower);
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct SearchState {
    query: String,
    matches: Vec<SearchMatch>,
    /// Parallel to `matches`; the first line Y seen for each match during
    /// a resolve pass, or None while undiscovered
    match_y: Vec<Option<f64>>,
    active: usize,
}

impl SearchState {
    pub fn new() -> Self {
        SearchState::default()
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.match_y.clear();
        self.active = 0;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn count(&self) -> usize {
        self.matches.len()
    }

    pub fn active_index(&self) -> Option<usize> {
        (!self.matches.is_empty()).then_some(self.active)
    }

    pub fn active_match(&self) -> Option<SearchMatch> {
        self.matches.get(self.active).copied()
    }

    /// Scan the current generation for the query. Case-insensitive,
    /// non-overlapping, left to right; an empty query clears all state.
    pub fn set_query(&mut self, query: &str, layout: &LayoutResult) {
        self.clear();
        if query.is_empty() {
            return;
        }
        self.query = query.to_string();

        let needle = fold_case(query);
        let haystack = &layout.doc_text_lower;
        let mut from = 0;
        while let Some(found) = haystack.get(from..).and_then(|rest| rest.find(&needle)) {
            let start = from + found;
            self.matches.push(SearchMatch {
                start: TextOffset(start),
                len: needle.len(),
            });
            // A match consumes its full length: no overlapping hits
            from = start + needle.len();
        }
        self.match_y = vec![None; self.matches.len()];
        self.resolve_positions(layout);
    }

    /// Re-run the stored query's scan against a new generation, keeping
    /// the active position where the new match list allows. A query set
    /// against a stale generation becomes correct at the next pass.
    pub fn rescan(&mut self, layout: &LayoutResult) {
        if self.query.is_empty() {
            return;
        }
        let query = std::mem::take(&mut self.query);
        let active = self.active;
        self.set_query(&query, layout);
        if !self.matches.is_empty() {
            self.active = active.min(self.matches.len() - 1);
        }
    }

    /// Walk the generation's selectable spans in document order and record
    /// the line Y of every match that starts inside one. First span seen
    /// wins; a fresh generation resolves from scratch, so positions follow
    /// re-layout instead of going permanently stale.
    pub fn resolve_positions(&mut self, layout: &LayoutResult) {
        for y in &mut self.match_y {
            *y = None;
        }
        let mut span_iter = layout.text_rects.iter().peekable();
        for (m, slot) in self.matches.iter().zip(self.match_y.iter_mut()) {
            while let Some(tr) = span_iter.peek() {
                if tr.doc_start.0 + tr.doc_len <= m.start.0 {
                    span_iter.next();
                } else {
                    break;
                }
            }
            if let Some(tr) = span_iter.peek() {
                if tr.doc_start.0 <= m.start.0 && m.start.0 < tr.doc_start.0 + tr.doc_len {
                    *slot = Some(tr.rect.y);
                }
            }
        }
    }

    /// Document Y for a match: the resolved line position, or a linear
    /// estimate from its text offset while unresolved
    pub fn match_y(&self, index: usize, layout: &LayoutResult) -> Option<f64> {
        let m = self.matches.get(index)?;
        if let Some(Some(y)) = self.match_y.get(index) {
            return Some(*y);
        }
        let total = layout.doc_text.len();
        if total == 0 {
            return Some(0.0);
        }
        Some(m.start.0 as f64 / total as f64 * layout.content_height)
    }

    /// Advance to the next match, wrapping past the last one
    pub fn next(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.active = (self.active + 1) % self.matches.len();
        Some(self.active)
    }

    /// Scroll offset that centers the active match in the viewport below a
    /// fixed overlay at the top, clamped to the content
    pub fn scroll_target(
        &self,
        viewport_height: f64,
        overlay_height: f64,
        layout: &LayoutResult,
    ) -> Option<f64> {
        let index = self.active_index()?;
        let y = self.match_y(index, layout)?;
        let usable = (viewport_height - overlay_height).max(0.0);
        let target = y - overlay_height - usable / 2.0;
        let max_scroll = (layout.content_height - viewport_height).max(0.0);
        Some(target.clamp(0.0, max_scroll))
    }
}
