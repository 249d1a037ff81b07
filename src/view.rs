// View controller - owns the current document, the layout generation, the
// scroll position and the interaction state. The host toolkit forwards
// mouse events in widget coordinates and calls `draw` with its backend;
// everything in between lives here.

use crate::document::Document;
use crate::draw_context::DrawContext;
use crate::highlight::{Highlighter, PlainHighlighter};
use crate::layout::{self, DocPoint, DocRect, LayoutResult};
use crate::link;
use crate::search::SearchState;
use crate::selection::{ReleaseOutcome, SelectionController};
use crate::theme::Theme;
use std::rc::Rc;

/// What the host should do after forwarding an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Nothing changed
    Ignored,
    /// Visible state changed, schedule a repaint
    Redraw,
    /// A link was clicked; the host decides how to open it
    LinkActivated(link::LinkTarget),
}

pub struct RichTextView {
    x: i32,
    y: i32,
    w: i32,
    h: i32,

    document: Rc<Document>,
    theme: Theme,
    zoom: f64,
    highlighter: Box<dyn Highlighter>,

    /// Current layout generation; swapped in whole by `ensure_layout`
    layout: LayoutResult,
    layout_valid: bool,
    scroll_offset: f64,

    selection: SelectionController,
    search: SearchState,
    hovered_link: Option<usize>,
}

impl RichTextView {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        RichTextView {
            x,
            y,
            w,
            h,
            document: Rc::new(Document::new()),
            theme: Theme::default(),
            zoom: 1.0,
            highlighter: Box::new(PlainHighlighter),
            layout: LayoutResult::empty(),
            layout_valid: false,
            scroll_offset: 0.0,
            selection: SelectionController::new(),
            search: SearchState::new(),
            hovered_link: None,
        }
    }

    // ------------------------------------------------------------------
    // Content and appearance
    // ------------------------------------------------------------------

    /// Replace the document. Selection and search reference offsets into
    /// the old text, so both are cleared; scroll resets to the top.
    pub fn set_document(&mut self, document: Rc<Document>) {
        self.document = document;
        self.selection.clear();
        self.search.clear();
        self.hovered_link = None;
        self.scroll_offset = 0.0;
        self.layout_valid = false;
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    /// Move or resize the widget. Selection and search survive; their
    /// geometry follows the next layout pass.
    pub fn resize(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.x = x;
        self.y = y;
        self.w = w;
        self.h = h;
        self.layout_valid = false;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = zoom.clamp(0.25, 4.0);
        if (zoom - self.zoom).abs() > f64::EPSILON {
            self.zoom = zoom;
            self.layout_valid = false;
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.layout_valid = false;
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_highlighter(&mut self, highlighter: Box<dyn Highlighter>) {
        self.highlighter = highlighter;
        self.layout_valid = false;
    }

    pub fn content_height(&self) -> f64 {
        self.layout.content_height
    }

    pub fn content_width(&self) -> f64 {
        self.layout.content_width
    }

    /// Run a layout pass if the current generation is stale, then clamp
    /// the scroll position and re-resolve search geometry against the new
    /// generation.
    pub fn ensure_layout(&mut self, ctx: &mut dyn DrawContext) {
        if self.layout_valid {
            return;
        }
        self.layout = layout::layout(
            &self.document,
            f64::from(self.w),
            &self.theme,
            self.zoom,
            self.highlighter.as_ref(),
            ctx,
        );
        self.layout_valid = true;
        self.scroll_offset = self.scroll_offset.clamp(0.0, self.max_scroll());
        // The stored query may have been scanned against the previous
        // generation; redo the scan so matches follow the new text.
        self.search.rescan(&self.layout);
    }

    pub fn layout_result(&self) -> &LayoutResult {
        &self.layout
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn max_scroll(&self) -> f64 {
        (self.layout.content_height - f64::from(self.h)).max(0.0)
    }

    pub fn set_scroll(&mut self, offset: f64) -> EventOutcome {
        let clamped = offset.clamp(0.0, self.max_scroll());
        if (clamped - self.scroll_offset).abs() < f64::EPSILON {
            return EventOutcome::Ignored;
        }
        self.scroll_offset = clamped;
        EventOutcome::Redraw
    }

    pub fn scroll_by(&mut self, delta: f64) -> EventOutcome {
        self.set_scroll(self.scroll_offset + delta)
    }

    // ------------------------------------------------------------------
    // Mouse events (widget coordinates)
    // ------------------------------------------------------------------

    fn doc_point(&self, wx: i32, wy: i32) -> DocPoint {
        DocPoint::new(
            f64::from(wx - self.x),
            f64::from(wy - self.y) + self.scroll_offset,
        )
    }

    pub fn handle_push(&mut self, wx: i32, wy: i32, now_ms: u64) -> EventOutcome {
        let p = self.doc_point(wx, wy);
        self.selection.handle_push(p, now_ms, &self.layout);
        EventOutcome::Redraw
    }

    pub fn handle_drag(&mut self, wx: i32, wy: i32) -> EventOutcome {
        let p = self.doc_point(wx, wy);
        if self.selection.handle_drag(p, &self.layout) {
            EventOutcome::Redraw
        } else {
            EventOutcome::Ignored
        }
    }

    /// Release finishes the gesture. A Normal-mode press that never
    /// travelled clears the selection and, over a link, activates it.
    pub fn handle_release(&mut self, wx: i32, wy: i32) -> EventOutcome {
        let p = self.doc_point(wx, wy);
        match self.selection.handle_release(p) {
            ReleaseOutcome::Drag => EventOutcome::Redraw,
            ReleaseOutcome::Click => {
                self.selection.clear();
                if let Some(area) = self.layout.link_at(p) {
                    EventOutcome::LinkActivated(link::classify(&area.destination))
                } else {
                    EventOutcome::Redraw
                }
            }
        }
    }

    /// Pointer motion without a button down: track which link is hovered
    /// so its runs restyle and the host can switch the cursor.
    pub fn handle_move(&mut self, wx: i32, wy: i32) -> EventOutcome {
        let p = self.doc_point(wx, wy);
        let hovered = self
            .layout
            .links
            .iter()
            .position(|l| l.rect.contains(p));
        if hovered != self.hovered_link {
            self.hovered_link = hovered;
            EventOutcome::Redraw
        } else {
            EventOutcome::Ignored
        }
    }

    pub fn hovered_link(&self) -> Option<&str> {
        self.hovered_link
            .and_then(|i| self.layout.links.get(i))
            .map(|l| l.destination.as_str())
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select_all(&mut self) -> EventOutcome {
        self.selection.select_all(&self.layout);
        EventOutcome::Redraw
    }

    pub fn clear_selection(&mut self) -> EventOutcome {
        if self.selection.selection().is_none() {
            return EventOutcome::Ignored;
        }
        self.selection.clear();
        EventOutcome::Redraw
    }

    pub fn has_selection(&self) -> bool {
        self.selection.selection().is_some()
    }

    /// The selected text, recomputed from the current generation
    pub fn selected_text(&self) -> String {
        self.selection.selected_text(&self.layout)
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub fn set_search_query(&mut self, query: &str) -> EventOutcome {
        self.search.set_query(query, &self.layout);
        EventOutcome::Redraw
    }

    pub fn search_query(&self) -> &str {
        self.search.query()
    }

    pub fn match_count(&self) -> usize {
        self.search.count()
    }

    pub fn active_match_index(&self) -> Option<usize> {
        self.search.active_index()
    }

    /// Advance to the next match (wrapping) and scroll it into view,
    /// centered in the space below the search overlay.
    pub fn next_match(&mut self) -> EventOutcome {
        if self.search.next().is_none() {
            return EventOutcome::Ignored;
        }
        let overlay = self.theme.search_overlay_height * self.zoom;
        if let Some(target) = self.search.scroll_target(f64::from(self.h), overlay, &self.layout) {
            self.scroll_offset = target;
        }
        EventOutcome::Redraw
    }

    /// Highlight rectangle for one match, mapped proportionally into the
    /// span it starts in. None while the match is in an unmapped region.
    fn match_rect(&self, index: usize) -> Option<DocRect> {
        let m = self.search.matches().get(index)?;
        let trs = &self.layout.text_rects;
        // Spans are emitted in doc_text order
        let after = trs.partition_point(|tr| tr.doc_start.0 + tr.doc_len <= m.start.0);
        let tr = trs.get(after)?;
        if !(tr.doc_start.0 <= m.start.0 && m.start.0 < tr.doc_start.0 + tr.doc_len) {
            return None;
        }
        let rel_start = (m.start.0 - tr.doc_start.0) as f64 / tr.doc_len as f64;
        let rel_len = (m.len.min(tr.doc_len) as f64) / tr.doc_len as f64;
        Some(DocRect::new(
            tr.rect.x + tr.rect.w * rel_start,
            tr.rect.y,
            tr.rect.w * rel_len,
            tr.rect.h,
        ))
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Paint the visible slice of the document. Primitives fully outside
    /// the viewport are culled; order is background, filled rects,
    /// selection, match highlights, text, lines, images.
    pub fn draw(&mut self, ctx: &mut dyn DrawContext) {
        self.ensure_layout(ctx);

        ctx.push_clip(self.x, self.y, self.w, self.h);
        ctx.set_color(self.theme.background_color);
        ctx.draw_rect_filled(self.x, self.y, self.w, self.h);

        let top = self.scroll_offset;
        let bottom = top + f64::from(self.h);
        let visible = |r: &DocRect| r.bottom() >= top && r.y <= bottom;
        let to_x = |x: f64| self.x + x as i32;
        let to_y = |y: f64| self.y + (y - top) as i32;

        for lr in &self.layout.rects {
            if visible(&lr.rect) {
                ctx.set_color(lr.color);
                ctx.draw_rect_filled(
                    to_x(lr.rect.x),
                    to_y(lr.rect.y),
                    lr.rect.w as i32,
                    lr.rect.h as i32,
                );
            }
        }

        ctx.set_color(self.theme.selection_color);
        for rect in self.selection.selection_rects(&self.layout) {
            if visible(&rect) {
                ctx.draw_rect_filled(to_x(rect.x), to_y(rect.y), rect.w as i32, rect.h as i32);
            }
        }

        let active = self.search.active_index();
        for index in 0..self.search.count() {
            let Some(rect) = self.match_rect(index) else {
                continue;
            };
            if !visible(&rect) {
                continue;
            }
            ctx.set_color(if Some(index) == active {
                self.theme.active_match_color
            } else {
                self.theme.match_color
            });
            ctx.draw_rect_filled(to_x(rect.x), to_y(rect.y), rect.w as i32, rect.h as i32);
        }

        let hovered_rect = self
            .hovered_link
            .and_then(|i| self.layout.links.get(i))
            .map(|l| l.rect);
        for run in &self.layout.runs {
            if !visible(&run.rect) {
                continue;
            }
            let color = if run.link {
                let hovered = hovered_rect.is_some_and(|hr| {
                    hr.contains(DocPoint::new(run.rect.x + run.rect.w / 2.0, run.rect.center_y()))
                });
                if hovered {
                    self.theme.link_hover_color
                } else {
                    run.color
                }
            } else {
                run.color
            };
            ctx.set_color(color);
            ctx.set_font(run.format.font, run.format.size);
            let baseline = run.rect.bottom() - f64::from(ctx.text_descent(run.format.font, run.format.size));
            ctx.draw_text(&run.shaped.text, to_x(run.rect.x), to_y(baseline));
        }

        for line in &self.layout.lines {
            if line.y1.max(line.y2) >= top && line.y1.min(line.y2) <= bottom {
                ctx.set_color(line.color);
                ctx.draw_line(to_x(line.x1), to_y(line.y1), to_x(line.x2), to_y(line.y2));
            }
        }

        for image in &self.layout.images {
            if visible(&image.rect) {
                ctx.set_color(self.theme.image_placeholder_color);
                ctx.draw_image_placeholder(
                    to_x(image.rect.x),
                    to_y(image.rect.y),
                    image.rect.w as i32,
                    image.rect.h as i32,
                    &image.destination,
                );
            }
        }

        ctx.pop_clip();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_markdown;
    use crate::test_util::{DrawOp, FakeDrawContext};

    fn view_with(markdown: &str) -> RichTextView {
        let mut view = RichTextView::new(0, 0, 500, 300);
        view.set_document(parse_markdown(markdown));
        let mut ctx = FakeDrawContext::new();
        view.ensure_layout(&mut ctx);
        view
    }

    #[test]
    fn set_document_clears_selection_and_search() {
        let mut view = view_with("Hello world. Hello there.");
        view.select_all();
        view.set_search_query("hello");
        assert!(view.has_selection());
        assert_eq!(view.match_count(), 2);

        view.set_document(parse_markdown("Different text"));
        assert!(!view.has_selection());
        assert_eq!(view.match_count(), 0);
        assert_eq!(view.scroll_offset(), 0.0);
    }

    #[test]
    fn resize_keeps_selection_and_search() {
        let mut view = view_with("Hello world. Hello there.");
        view.select_all();
        view.set_search_query("hello");
        view.resize(0, 0, 400, 300);
        let mut ctx = FakeDrawContext::new();
        view.ensure_layout(&mut ctx);
        assert!(view.has_selection());
        assert_eq!(view.match_count(), 2);
    }

    #[test]
    fn query_set_against_a_stale_generation_is_rescanned() {
        let mut view = view_with("nothing to find here");
        view.set_document(parse_markdown("needle and needle again"));
        // The old generation is still current; the scan finds nothing yet
        view.set_search_query("needle");
        assert_eq!(view.match_count(), 0);

        let mut ctx = FakeDrawContext::new();
        view.ensure_layout(&mut ctx);
        assert_eq!(view.match_count(), 2);
        assert_eq!(view.active_match_index(), Some(0));
    }

    #[test]
    fn active_match_survives_a_relayout() {
        let mut view = view_with("needle one needle two needle three");
        view.set_search_query("needle");
        view.next_match();
        assert_eq!(view.active_match_index(), Some(1));

        view.resize(0, 0, 400, 300);
        let mut ctx = FakeDrawContext::new();
        view.ensure_layout(&mut ctx);
        assert_eq!(view.match_count(), 3);
        assert_eq!(view.active_match_index(), Some(1));
    }

    #[test]
    fn click_on_link_activates_it() {
        let mut view = view_with("[label](https://example.com)");
        let area = view.layout_result().links[0].rect;
        let (wx, wy) = ((area.x + area.w / 2.0) as i32, (area.y + area.h / 2.0) as i32);
        view.handle_push(wx, wy, 0);
        let outcome = view.handle_release(wx, wy);
        match outcome {
            EventOutcome::LinkActivated(target) => {
                assert_eq!(target.destination(), "https://example.com");
            }
            other => panic!("expected link activation, got {:?}", other),
        }
    }

    #[test]
    fn click_away_from_links_just_clears_selection() {
        let mut view = view_with("plain words only");
        view.select_all();
        view.handle_push(400, 250, 0);
        assert_eq!(view.handle_release(400, 250), EventOutcome::Redraw);
        assert!(!view.has_selection());
    }

    #[test]
    fn drag_keeps_the_selection() {
        let mut view = view_with("alpha bravo charlie delta");
        view.handle_push(30, 15, 0);
        view.handle_drag(200, 15);
        assert_eq!(view.handle_release(200, 15), EventOutcome::Redraw);
        assert!(!view.selected_text().is_empty());
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let many: String = (0..100).map(|i| format!("line {}\n\n", i)).collect();
        let mut view = view_with(&many);
        assert!(view.max_scroll() > 0.0);
        view.set_scroll(1e9);
        assert_eq!(view.scroll_offset(), view.max_scroll());
        view.scroll_by(-1e9);
        assert_eq!(view.scroll_offset(), 0.0);
        // Short content never scrolls
        let mut short = view_with("one line");
        assert_eq!(short.set_scroll(50.0), EventOutcome::Ignored);
    }

    #[test]
    fn next_match_wraps_and_scrolls() {
        let many: String = (0..80).map(|i| format!("filler {}\n\nneedle\n\n", i)).collect();
        let mut view = view_with(&many);
        view.set_search_query("needle");
        let count = view.match_count();
        assert_eq!(count, 80);
        assert_eq!(view.active_match_index(), Some(0));

        view.next_match();
        assert_eq!(view.active_match_index(), Some(1));
        for _ in 1..count {
            view.next_match();
        }
        assert_eq!(view.active_match_index(), Some(0), "wraps past the last match");
        // Scrolled back towards the top for the first match
        assert!(view.scroll_offset() < view.max_scroll() / 2.0);
    }

    #[test]
    fn hover_over_link_is_tracked() {
        let mut view = view_with("go [here](https://example.com) now");
        let area = view.layout_result().links[0].rect;
        let (wx, wy) = ((area.x + area.w / 2.0) as i32, (area.y + area.h / 2.0) as i32);
        assert_eq!(view.handle_move(wx, wy), EventOutcome::Redraw);
        assert_eq!(view.hovered_link(), Some("https://example.com"));
        // Same position again: no change
        assert_eq!(view.handle_move(wx, wy), EventOutcome::Ignored);
        assert_eq!(view.handle_move(2, 2), EventOutcome::Redraw);
        assert_eq!(view.hovered_link(), None);
    }

    #[test]
    fn draw_culls_offscreen_runs() {
        let many: String = (0..200).map(|i| format!("word{}\n\n", i)).collect();
        let mut view = view_with(&many);
        let mut ctx = FakeDrawContext::new();
        view.draw(&mut ctx);
        let drawn = ctx.drawn_texts().len();
        assert!(drawn > 0);
        let total = view.layout_result().runs.len();
        assert!(drawn < total, "only the visible slice is drawn ({} of {})", drawn, total);
    }

    #[test]
    fn draw_paints_background_first() {
        let mut view = view_with("hello");
        let mut ctx = FakeDrawContext::new();
        view.draw(&mut ctx);
        match &ctx.ops[0] {
            DrawOp::RectFilled { color, w, h, .. } => {
                assert_eq!(*color, view.theme().background_color);
                assert_eq!((*w, *h), (500, 300));
            }
            other => panic!("expected background rect, got {:?}", other),
        }
    }

    #[test]
    fn match_highlights_are_drawn() {
        let mut view = view_with("needle in a haystack with a needle");
        view.set_search_query("needle");
        assert_eq!(view.match_count(), 2);
        let mut ctx = FakeDrawContext::new();
        view.draw(&mut ctx);
        let theme = view.theme().clone();
        let highlight_rects = ctx
            .ops
            .iter()
            .filter(|op| {
                matches!(op, DrawOp::RectFilled { color, .. }
                    if *color == theme.match_color || *color == theme.active_match_color)
            })
            .count();
        assert_eq!(highlight_rects, 2);
    }

    #[test]
    fn zoom_relayouts_but_keeps_matches() {
        let mut view = view_with("needle and needle");
        view.set_search_query("needle");
        let before = view.content_height();
        view.set_zoom(2.0);
        let mut ctx = FakeDrawContext::new();
        view.ensure_layout(&mut ctx);
        assert!(view.content_height() > before);
        assert_eq!(view.match_count(), 2);
    }

    #[test]
    fn widget_offset_shifts_hit_testing() {
        let mut view = RichTextView::new(100, 50, 500, 300);
        view.set_document(parse_markdown("[label](https://example.com)"));
        let mut ctx = FakeDrawContext::new();
        view.ensure_layout(&mut ctx);
        let area = view.layout_result().links[0].rect;
        let wx = 100 + (area.x + area.w / 2.0) as i32;
        let wy = 50 + (area.y + area.h / 2.0) as i32;
        view.handle_push(wx, wy, 0);
        assert!(matches!(
            view.handle_release(wx, wy),
            EventOutcome::LinkActivated(_)
        ));
    }

    #[test]
    fn selected_text_spans_blocks() {
        let mut view = view_with("first para\n\nsecond para");
        view.select_all();
        assert_eq!(view.selected_text(), "first para\nsecond para");
    }

    #[test]
    fn wiki_link_classifies_as_page() {
        let mut view = view_with("see [[OtherPage]]");
        let area = view.layout_result().links[0].rect;
        let (wx, wy) = ((area.x + area.w / 2.0) as i32, (area.y + area.h / 2.0) as i32);
        view.handle_push(wx, wy, 0);
        match view.handle_release(wx, wy) {
            EventOutcome::LinkActivated(link::LinkTarget::Page(dest)) => {
                assert_eq!(dest, "OtherPage");
            }
            other => panic!("expected page target, got {:?}", other),
        }
    }
}
