// Selection state machine: Idle -> Dragging(mode) -> Idle. The mode is
// fixed at press time from the click count; Normal tracks the raw pointer
// while Word/Line union the anchor rectangle with whatever lies under the
// pointer. Selected text is recomputed from the current layout generation
// at read time, never cached across generations.

use crate::hittest::LineBucket;
use crate::layout::{DocPoint, DocRect, LayoutResult};
use unicode_segmentation::UnicodeSegmentation;

/// Presses closer than this in time and space count as multi-clicks
pub const MULTI_CLICK_INTERVAL_MS: u64 = 500;
pub const MULTI_CLICK_SLOP: f64 = 5.0;
/// A Normal drag shorter than this in both axes is a plain click
pub const CLICK_DRAG_SLOP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Normal,
    Word,
    Line,
}

/// An active selection span in document coordinates
#[derive(Debug, Clone)]
pub struct Selection {
    pub mode: SelectionMode,
    pub start: DocPoint,
    pub end: DocPoint,
    /// Word/line rectangle fixed at press time; drags extend symmetrically
    /// around it
    anchor: DocRect,
}

impl Selection {
    /// Bounds ordered so the start lies on the earlier visual line. Word
    /// and Line selections are already normalized per axis by the union
    /// rule; Normal selections may have been dragged upwards.
    pub fn normalized(&self) -> (DocPoint, DocPoint) {
        if self.end.y < self.start.y || (self.end.y == self.start.y && self.end.x < self.start.x) {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        }
    }
}

/// What a mouse release turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// A completed drag; the selection stands
    Drag,
    /// A Normal-mode press that never travelled: treat as a plain click
    Click,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    selection: Option<Selection>,
    dragging: bool,
    press: DocPoint,
    last_press: DocPoint,
    last_press_ms: u64,
    click_count: u32,
}

impl SelectionController {
    pub fn new() -> Self {
        SelectionController::default()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn clear(&mut self) {
        self.selection = None;
        self.dragging = false;
    }

    /// Begin a selection. The click count is derived here: a press within
    /// 500 ms and 5 units of the previous one advances the count, capped
    /// at three (no quadruple-click state).
    pub fn handle_push(&mut self, p: DocPoint, now_ms: u64, layout: &LayoutResult) {
        let repeat = now_ms.saturating_sub(self.last_press_ms) <= MULTI_CLICK_INTERVAL_MS
            && (p.x - self.last_press.x).abs() <= MULTI_CLICK_SLOP
            && (p.y - self.last_press.y).abs() <= MULTI_CLICK_SLOP;
        self.click_count = if repeat {
            (self.click_count + 1).min(3)
        } else {
            1
        };
        self.last_press = p;
        self.last_press_ms = now_ms;
        self.press = p;
        self.dragging = true;

        match self.click_count {
            2 => {
                let anchor = word_rect_at(p, layout).unwrap_or_else(|| DocRect::at_point(p));
                self.selection = Some(anchored(SelectionMode::Word, anchor));
            }
            3 => {
                let anchor = layout
                    .buckets
                    .bucket_at(p.y)
                    .map(LineBucket::rect)
                    .unwrap_or_else(|| DocRect::at_point(p));
                self.selection = Some(anchored(SelectionMode::Line, anchor));
            }
            _ => {
                self.selection = Some(Selection {
                    mode: SelectionMode::Normal,
                    start: p,
                    end: p,
                    anchor: DocRect::at_point(p),
                });
            }
        }
    }

    /// Extend the selection towards the pointer. Returns true if anything
    /// changed.
    pub fn handle_drag(&mut self, p: DocPoint, layout: &LayoutResult) -> bool {
        if !self.dragging {
            return false;
        }
        let Some(sel) = self.selection.as_mut() else {
            return false;
        };
        match sel.mode {
            SelectionMode::Normal => {
                sel.end = p;
            }
            SelectionMode::Word => {
                let current = word_rect_at(p, layout).unwrap_or_else(|| DocRect::at_point(p));
                extend_around_anchor(sel, current);
            }
            SelectionMode::Line => {
                let current = layout
                    .buckets
                    .bucket_at(p.y)
                    .map(LineBucket::rect)
                    .unwrap_or_else(|| DocRect::at_point(p));
                extend_around_anchor(sel, current);
            }
        }
        true
    }

    /// Finish the drag. Word/Line selections always stand; a Normal drag
    /// that moved less than 5 units in both axes is reported as a click so
    /// the caller can dispatch link activation or clear the selection.
    pub fn handle_release(&mut self, p: DocPoint) -> ReleaseOutcome {
        self.dragging = false;
        let Some(sel) = &self.selection else {
            return ReleaseOutcome::Click;
        };
        if sel.mode == SelectionMode::Normal
            && (p.x - self.press.x).abs() < CLICK_DRAG_SLOP
            && (p.y - self.press.y).abs() < CLICK_DRAG_SLOP
        {
            return ReleaseOutcome::Click;
        }
        ReleaseOutcome::Drag
    }

    /// Select the whole content in one Normal-mode span
    pub fn select_all(&mut self, layout: &LayoutResult) {
        self.dragging = false;
        self.selection = Some(Selection {
            mode: SelectionMode::Normal,
            start: DocPoint::new(0.0, 0.0),
            end: DocPoint::new(layout.content_width, layout.content_height),
            anchor: DocRect::at_point(DocPoint::new(0.0, 0.0)),
        });
    }

    /// Extract the selected text from the current generation: walk the
    /// buckets whose band overlaps the span vertically, clip the first
    /// and last selected lines horizontally (interior lines keep their full
    /// width), join same-line runs with a space and lines with a newline.
    pub fn selected_text(&self, layout: &LayoutResult) -> String {
        let Some(sel) = &self.selection else {
            return String::new();
        };
        let (start, end) = sel.normalized();

        let selected = selected_buckets(layout, start, end);

        let mut out_lines: Vec<String> = Vec::new();
        let last = selected.len().saturating_sub(1);
        for (i, bucket) in selected.iter().enumerate() {
            let x_lo = if i == 0 { start.x } else { f64::NEG_INFINITY };
            let x_hi = if i == last { end.x } else { f64::INFINITY };

            let mut pieces: Vec<&str> = Vec::new();
            for &idx in &bucket.runs {
                let Some(tr) = layout.text_rects.get(idx) else {
                    continue;
                };
                if tr.doc_len == 0 {
                    continue;
                }
                if tr.rect.x < x_hi && tr.rect.right() > x_lo {
                    let text = layout.span_text(tr).trim_end();
                    if !text.is_empty() {
                        pieces.push(text);
                    }
                }
            }
            if !pieces.is_empty() {
                out_lines.push(pieces.join(" "));
            }
        }
        out_lines.join("\n")
    }

    /// Highlight rectangles for the current selection, one per selected
    /// bucket, clipped like the extraction
    pub fn selection_rects(&self, layout: &LayoutResult) -> Vec<DocRect> {
        let Some(sel) = &self.selection else {
            return Vec::new();
        };
        let (start, end) = sel.normalized();
        let mut rects = Vec::new();

        let selected = selected_buckets(layout, start, end);
        let last = selected.len().saturating_sub(1);
        for (i, bucket) in selected.iter().enumerate() {
            let x_lo = if i == 0 {
                start.x.max(bucket.min_x)
            } else {
                bucket.min_x
            };
            let x_hi = if i == last {
                end.x.min(bucket.max_x)
            } else {
                bucket.max_x
            };
            if x_hi > x_lo {
                rects.push(DocRect::new(
                    x_lo,
                    bucket.top,
                    x_hi - x_lo,
                    bucket.bottom - bucket.top,
                ));
            }
        }
        rects
    }
}

/// The buckets a selection span covers: every bucket whose band strictly
/// overlaps `[start.y, end.y]`. Strict comparison keeps a span that ends
/// exactly on a line boundary from leaking onto the adjacent line; a
/// degenerate horizontal span still hits the line it lies inside.
fn selected_buckets<'a>(
    layout: &'a LayoutResult,
    start: DocPoint,
    end: DocPoint,
) -> Vec<&'a LineBucket> {
    layout
        .buckets
        .iter()
        .filter(|b| b.top < end.y && b.bottom > start.y)
        .collect()
}

fn anchored(mode: SelectionMode, anchor: DocRect) -> Selection {
    Selection {
        mode,
        start: DocPoint::new(anchor.x, anchor.y),
        end: DocPoint::new(anchor.right(), anchor.bottom()),
        anchor,
    }
}

/// Union of the fixed anchor and the rectangle under the pointer, min/max
/// taken independently per axis so dragging before or after the anchor
/// extends symmetrically
fn extend_around_anchor(sel: &mut Selection, current: DocRect) {
    sel.start = DocPoint::new(
        sel.anchor.x.min(current.x),
        sel.anchor.y.min(current.y),
    );
    sel.end = DocPoint::new(
        sel.anchor.right().max(current.right()),
        sel.anchor.bottom().max(current.bottom()),
    );
}

/// The rectangle of the word under a point. The point is mapped into the
/// run's text proportionally to its width, then snapped to unicode word
/// bounds; code lines hit-test as whole words of their own.
fn word_rect_at(p: DocPoint, layout: &LayoutResult) -> Option<DocRect> {
    let idx = layout.buckets.run_at(p, &layout.text_rects)?;
    let tr = layout.text_rects.get(idx)?;
    let text = layout.span_text(tr);
    if text.is_empty() || tr.rect.w <= 0.0 {
        return Some(tr.rect);
    }

    let rel = ((p.x - tr.rect.x) / tr.rect.w).clamp(0.0, 1.0);
    let mut byte = (rel * text.len() as f64) as usize;
    if byte >= text.len() {
        byte = text.len() - 1;
    }
    while byte > 0 && !text.is_char_boundary(byte) {
        byte -= 1;
    }

    for (seg_start, seg) in text.split_word_bound_indices() {
        if byte >= seg_start && byte < seg_start + seg.len() {
            if seg.trim().is_empty() {
                break;
            }
            let x = tr.rect.x + tr.rect.w * seg_start as f64 / text.len() as f64;
            let w = tr.rect.w * seg.len() as f64 / text.len() as f64;
            return Some(DocRect::new(x, tr.rect.y, w, tr.rect.h));
        }
    }
    Some(tr.rect)
}
