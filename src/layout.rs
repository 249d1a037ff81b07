// Layout engine - walks the document tree once per pass and emits
// positioned primitives in document-coordinate space, plus the flattened
// text projection (`doc_text`) that selection and search share.
//
// One call produces one `LayoutResult` generation. The view swaps the
// generation in whole; nothing outside this module mutates it.

use crate::document::{Document, Node, NodeType};
use crate::draw_context::{DrawContext, ShapedText, TextFormat};
use crate::highlight::{HighlightState, Highlighter, TokenClass};
use crate::hittest::LineBuckets;
use crate::search::fold_case;
use crate::theme::{FontSettings, Theme};

/// Linear byte offset into the flattened `doc_text`. Kept distinct from
/// geometry so the two coordinate spaces cannot be mixed by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextOffset(pub usize);

/// A point in document space (before scroll offset is applied)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        DocPoint { x, y }
    }
}

/// An axis-aligned rectangle in document space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DocRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl DocRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        DocRect { x, y, w, h }
    }

    pub fn at_point(p: DocPoint) -> Self {
        DocRect {
            x: p.x,
            y: p.y,
            w: 0.0,
            h: 0.0,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.h / 2.0
    }

    pub fn contains(&self, p: DocPoint) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }
}

/// One shaped, positioned unit of text
#[derive(Debug, Clone)]
pub struct LayoutRun {
    pub shaped: ShapedText,
    pub rect: DocRect,
    pub format: TextFormat,
    pub color: u32,
    /// True for runs inside a link span (restyled on hover)
    pub link: bool,
    /// Offset of this run's text inside `doc_text`; `doc_len == 0` marks a
    /// decorative run that is not mappable (bullets, ruby annotations,
    /// code-block tokens which map at line granularity instead)
    pub doc_start: TextOffset,
    pub doc_len: usize,
}

/// A filled rectangle primitive (code backgrounds, quote bars)
#[derive(Debug, Clone, Copy)]
pub struct LayoutRect {
    pub rect: DocRect,
    pub color: u32,
}

/// A stroked line primitive (underlines, rules)
#[derive(Debug, Clone, Copy)]
pub struct LayoutLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: u32,
}

/// A placeholder box for an image; the renderer decides what to draw in it
#[derive(Debug, Clone)]
pub struct LayoutImage {
    pub rect: DocRect,
    pub destination: String,
    pub title: Option<String>,
}

/// One clickable rectangle of a link; a link wrapped over several visual
/// lines contributes one of these per line
#[derive(Debug, Clone)]
pub struct LinkArea {
    pub rect: DocRect,
    pub destination: String,
}

/// Bounding rectangle of one selectable span plus its location inside
/// `doc_text`. Invariant: `doc_start.0 + doc_len <= doc_text.len()`.
#[derive(Debug, Clone, Copy)]
pub struct TextRect {
    pub rect: DocRect,
    pub doc_start: TextOffset,
    pub doc_len: usize,
}

/// Everything one layout pass produces. Selection and search hold only
/// offsets and indices into the current generation, so a stale reference
/// is a bounds-check miss, never a dangling pointer.
#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub runs: Vec<LayoutRun>,
    pub rects: Vec<LayoutRect>,
    pub lines: Vec<LayoutLine>,
    pub images: Vec<LayoutImage>,
    pub links: Vec<LinkArea>,
    pub text_rects: Vec<TextRect>,
    pub buckets: LineBuckets,
    pub doc_text: String,
    pub doc_text_lower: String,
    pub content_width: f64,
    pub content_height: f64,
}

impl LayoutResult {
    pub fn empty() -> Self {
        LayoutResult {
            runs: Vec::new(),
            rects: Vec::new(),
            lines: Vec::new(),
            images: Vec::new(),
            links: Vec::new(),
            text_rects: Vec::new(),
            buckets: LineBuckets::new(),
            doc_text: String::new(),
            doc_text_lower: String::new(),
            content_width: 0.0,
            content_height: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text_rects.is_empty() && self.runs.is_empty()
    }

    /// The flattened text behind one selectable span. Bounds-checked so a
    /// stale `TextRect` from an older generation yields "" instead of a
    /// panic.
    pub fn span_text(&self, tr: &TextRect) -> &str {
        self.doc_text
            .get(tr.doc_start.0..tr.doc_start.0 + tr.doc_len)
            .unwrap_or("")
    }

    /// Find the link area containing a document-space point
    pub fn link_at(&self, p: DocPoint) -> Option<&LinkArea> {
        self.links.iter().find(|l| l.rect.contains(p))
    }
}

/// Lay the document out for the given viewport width. Deterministic and
/// idempotent: identical inputs produce geometrically identical output.
pub fn layout(
    doc: &Document,
    viewport_width: f64,
    theme: &Theme,
    zoom: f64,
    highlighter: &dyn Highlighter,
    ctx: &mut dyn DrawContext,
) -> LayoutResult {
    if doc.is_empty() {
        return LayoutResult::empty();
    }

    let left = theme.padding_horizontal * zoom;
    let mut engine = Engine {
        theme,
        zoom,
        highlighter,
        left,
        right: (viewport_width - theme.padding_horizontal * zoom).max(left + 1.0),
        out: LayoutResult::empty(),
    };

    let mut y = theme.padding_vertical * zoom;
    for child in &doc.root.children {
        y = engine.layout_block(child, engine.left, y, ctx);
    }

    let mut out = engine.out;
    out.content_height = y + theme.padding_vertical * zoom;
    let max_right = out
        .runs
        .iter()
        .map(|r| r.rect.right())
        .fold(0.0, f64::max);
    out.content_width = (max_right + theme.padding_horizontal * zoom).max(viewport_width);
    out.doc_text_lower = fold_case(&out.doc_text);
    out.buckets = LineBuckets::build(&out.text_rects);
    out
}

/// Mutable inline-flow state for one block's content. Tracks where the
/// current visual line began in each primitive list so the whole line can
/// be shifted when a ruby annotation reserves space above it.
struct Flow {
    x: f64,
    y: f64,
    start_x: f64,
    line_height: f64,
    /// Annotation space already reserved above the current line
    lift: f64,
    placed_on_line: bool,
    runs_start: usize,
    rects_start: usize,
    lines_start: usize,
    images_start: usize,
    trects_start: usize,
    link: Option<LinkSpan>,
}

struct LinkSpan {
    destination: String,
    span_start_x: f64,
}

struct Engine<'a> {
    theme: &'a Theme,
    zoom: f64,
    highlighter: &'a dyn Highlighter,
    left: f64,
    right: f64,
    out: LayoutResult,
}

impl<'a> Engine<'a> {
    // ------------------------------------------------------------------
    // Block layout
    // ------------------------------------------------------------------

    fn layout_block(&mut self, node: &Node, x: f64, y: f64, ctx: &mut dyn DrawContext) -> f64 {
        match &node.node_type {
            NodeType::Document => {
                let mut current_y = y;
                for child in &node.children {
                    current_y = self.layout_block(child, x, current_y, ctx);
                }
                current_y
            }

            NodeType::Paragraph => {
                let settings = self.theme.plain_text;
                let y_after = self.flow_block(node, x, y, settings, None, ctx);
                self.out.doc_text.push('\n');
                y_after + self.theme.paragraph_gap * self.zoom
            }

            NodeType::Heading { level } => {
                let settings = self.theme.heading_settings(*level);
                let y_start = y + self.theme.heading_leading(*level, self.zoom);
                let y_after = self.flow_block(node, x, y_start, settings, Some(settings), ctx);
                self.out.doc_text.push('\n');

                if *level <= 2 {
                    let underline_y = y_after + 2.0 * self.zoom;
                    self.out.lines.push(LayoutLine {
                        x1: x,
                        y1: underline_y,
                        x2: self.right,
                        y2: underline_y,
                        color: self.theme.heading_underline_color,
                    });
                }

                y_after + self.theme.heading_trailing_gap * self.zoom
            }

            NodeType::CodeBlock { language } => self.layout_code_block(node, language.as_deref(), x, y, ctx),

            NodeType::BlockQuote => {
                let indent = self.theme.quote_indent * self.zoom;
                let y_start = y + self.theme.paragraph_gap * self.zoom;
                let mut current_y = y_start;
                for child in &node.children {
                    current_y = self.layout_quoted_block(child, x + indent, current_y, ctx);
                }
                // Vertical bar spanning the quoted content
                self.out.rects.push(LayoutRect {
                    rect: DocRect::new(
                        x,
                        y_start,
                        self.theme.quote_bar_width * self.zoom,
                        (current_y - y_start).max(0.0),
                    ),
                    color: self.theme.quote_bar_color,
                });
                current_y + self.theme.paragraph_gap * self.zoom
            }

            NodeType::List { ordered, start } => {
                let mut current_y = y;
                let mut marker_no = *start;
                for child in &node.children {
                    if matches!(child.node_type, NodeType::ListItem) {
                        let marker = if *ordered {
                            format!("{}. ", marker_no)
                        } else {
                            "\u{2022} ".to_string()
                        };
                        current_y = self.layout_list_item(child, &marker, x, current_y, ctx);
                        marker_no += 1;
                    }
                }
                current_y + self.theme.list_gap * self.zoom
            }

            NodeType::ListItem => {
                // Reached only for malformed trees; lay out as a paragraph
                self.layout_block(&Node::with_children(NodeType::Paragraph, node.children.clone()), x, y, ctx)
            }

            NodeType::ThematicBreak => {
                let gap = self.theme.paragraph_gap * self.zoom;
                let rule_y = y + gap;
                self.out.lines.push(LayoutLine {
                    x1: x,
                    y1: rule_y,
                    x2: self.right,
                    y2: rule_y,
                    color: self.theme.rule_color,
                });
                rule_y + gap
            }

            NodeType::Table => self.layout_table(node, x, y, ctx),

            NodeType::Image { destination, title } => {
                let w = (self.theme.image_width * self.zoom).min(self.right - x);
                let h = self.theme.image_height * self.zoom;
                self.out.images.push(LayoutImage {
                    rect: DocRect::new(x, y, w, h),
                    destination: destination.clone(),
                    title: title.clone(),
                });
                y + h + self.theme.paragraph_gap * self.zoom
            }

            // Inline node at block level: wrap in an implicit paragraph
            _ => {
                let settings = self.theme.plain_text;
                let wrapper = Node::with_children(NodeType::Paragraph, vec![node.clone()]);
                let y_after = self.flow_block(&wrapper, x, y, settings, None, ctx);
                self.out.doc_text.push('\n');
                y_after + self.theme.paragraph_gap * self.zoom
            }
        }
    }

    fn layout_quoted_block(&mut self, node: &Node, x: f64, y: f64, ctx: &mut dyn DrawContext) -> f64 {
        match &node.node_type {
            NodeType::Paragraph => {
                let settings = self.theme.quote_text;
                let y_after = self.flow_block(node, x, y, settings, Some(settings), ctx);
                self.out.doc_text.push('\n');
                y_after + self.theme.paragraph_gap * self.zoom
            }
            _ => self.layout_block(node, x, y, ctx),
        }
    }

    fn layout_list_item(&mut self, item: &Node, marker: &str, x: f64, y: f64, ctx: &mut dyn DrawContext) -> f64 {
        let indent = self.theme.list_indent * self.zoom;
        let settings = self.theme.plain_text;
        let format = settings.format(self.zoom);

        // Marker run: decorative, excluded from doc_text
        if let Some(shaped) = ctx.shape(marker, format) {
            let line_height = self.theme.line_height_for(&settings, self.zoom);
            let rect = DocRect::new(x, y, shaped.width, line_height);
            self.out.runs.push(LayoutRun {
                shaped,
                rect,
                format,
                color: settings.color,
                link: false,
                doc_start: TextOffset(self.out.doc_text.len()),
                doc_len: 0,
            });
        }

        let mut current_y = y;
        let mut placed = false;
        // Contiguous inline children gather into one flow; each block child
        // (including a Paragraph of a loose list) interrupts and restarts
        // the gathering, so inlines after a block are not lost.
        let mut inline_run: Vec<Node> = Vec::new();
        for child in &item.children {
            if child.node_type.is_block() && !matches!(child.node_type, NodeType::Paragraph) {
                current_y =
                    self.flush_item_inlines(&mut inline_run, x + indent, current_y, settings, &mut placed, ctx);
                current_y = self.layout_block(child, x + indent, current_y, ctx);
                placed = true;
            } else if matches!(child.node_type, NodeType::Paragraph) {
                current_y =
                    self.flush_item_inlines(&mut inline_run, x + indent, current_y, settings, &mut placed, ctx);
                // Item paragraphs flow beside the marker without the
                // block-level paragraph gap
                let y_after = self.flow_block(child, x + indent, current_y, settings, None, ctx);
                self.out.doc_text.push('\n');
                current_y = y_after;
                placed = true;
            } else {
                inline_run.push(child.clone());
            }
        }
        current_y =
            self.flush_item_inlines(&mut inline_run, x + indent, current_y, settings, &mut placed, ctx);

        if !placed {
            // Item with no content: the marker still occupies a line
            current_y += self.theme.line_height_for(&settings, self.zoom);
        }

        current_y + self.theme.list_gap * self.zoom
    }

    /// Flow the gathered inline children of a list item as one paragraph.
    /// No-op when the run is empty; returns the Y below the flow.
    fn flush_item_inlines(
        &mut self,
        inline_run: &mut Vec<Node>,
        x: f64,
        y: f64,
        settings: FontSettings,
        placed: &mut bool,
        ctx: &mut dyn DrawContext,
    ) -> f64 {
        if inline_run.is_empty() {
            return y;
        }
        let wrapper = Node::with_children(NodeType::Paragraph, std::mem::take(inline_run));
        let y_after = self.flow_block(&wrapper, x, y, settings, None, ctx);
        self.out.doc_text.push('\n');
        *placed = true;
        y_after
    }

    fn layout_code_block(
        &mut self,
        node: &Node,
        _language: Option<&str>,
        x: f64,
        y: f64,
        ctx: &mut dyn DrawContext,
    ) -> f64 {
        let settings = self.theme.code_text;
        let format = settings.format(self.zoom);
        let line_height = self.theme.line_height_for(&settings, self.zoom);
        let padding = self.theme.code_padding * self.zoom;

        let text = node.flatten_text();
        let mut source_lines: Vec<&str> = text.split('\n').collect();
        if source_lines.last() == Some(&"") {
            source_lines.pop();
        }

        // Background first so the runs draw over it
        let bg_height = source_lines.len() as f64 * line_height + 2.0 * padding;
        self.out.rects.push(LayoutRect {
            rect: DocRect::new(x, y, self.right - x, bg_height),
            color: self.theme.code_background,
        });

        let mut state = HighlightState::default();
        let mut current_y = y + padding;

        for line in &source_lines {
            let doc_start = TextOffset(self.out.doc_text.len());
            self.out.doc_text.push_str(line);
            self.out.doc_text.push('\n');

            let tokens = self.highlighter.tokenize_line(line, &mut state);
            let mut run_x = x + padding;
            let mut line_right = run_x;

            for token in tokens {
                let Some(slice) = line.get(token.start..token.start + token.len) else {
                    continue;
                };
                let color = self.token_color(token.class);
                if let Some(shaped) = ctx.shape(slice, format) {
                    let rect = DocRect::new(run_x, current_y, shaped.width, line_height);
                    run_x += shaped.width;
                    line_right = rect.right();
                    // Tokens map at line granularity, not individually
                    self.out.runs.push(LayoutRun {
                        shaped,
                        rect,
                        format,
                        color,
                        link: false,
                        doc_start,
                        doc_len: 0,
                    });
                }
            }

            // Selection granularity is the whole source line
            self.out.text_rects.push(TextRect {
                rect: DocRect::new(x + padding, current_y, (line_right - x - padding).max(1.0), line_height),
                doc_start,
                doc_len: line.len(),
            });

            current_y += line_height;
        }

        y + bg_height + self.theme.code_gap * self.zoom
    }

    fn layout_table(&mut self, node: &Node, x: f64, y: f64, ctx: &mut dyn DrawContext) -> f64 {
        let cell_padding = self.theme.table_cell_padding * self.zoom;
        let plain = self.theme.plain_text;
        let bold = self.theme.bold_text;

        // First pass: column widths from the widest cell
        let mut col_widths: Vec<f64> = Vec::new();
        for row in node.children.iter().flat_map(row_iter) {
            let head = matches!(row.1, RowKind::Head);
            for (col, cell) in row.0.children.iter().enumerate() {
                let settings = if head { bold } else { plain };
                let w = ctx.text_width(
                    &cell.flatten_text(),
                    settings.format(self.zoom).font,
                    settings.format(self.zoom).size,
                );
                if col >= col_widths.len() {
                    col_widths.push(0.0);
                }
                col_widths[col] = col_widths[col].max(w + 2.0 * cell_padding);
            }
        }

        // Second pass: place cells
        let mut current_y = y + self.theme.paragraph_gap * self.zoom;
        for row in node.children.iter().flat_map(row_iter) {
            let head = matches!(row.1, RowKind::Head);
            let settings = if head { bold } else { plain };
            let format = settings.format(self.zoom);
            let line_height = self.theme.line_height_for(&settings, self.zoom);

            let mut cell_x = x;
            for (col, cell) in row.0.children.iter().enumerate() {
                let text = cell.flatten_text();
                let doc_start = TextOffset(self.out.doc_text.len());
                self.out.doc_text.push_str(&text);
                self.out.doc_text.push(' ');

                if let Some(shaped) = ctx.shape(&text, format) {
                    let rect = DocRect::new(cell_x + cell_padding, current_y, shaped.width, line_height);
                    self.out.text_rects.push(TextRect {
                        rect,
                        doc_start,
                        doc_len: text.len(),
                    });
                    self.out.runs.push(LayoutRun {
                        shaped,
                        rect,
                        format,
                        color: settings.color,
                        link: false,
                        doc_start,
                        doc_len: text.len(),
                    });
                }
                cell_x += col_widths.get(col).copied().unwrap_or(0.0);
            }
            self.out.doc_text.push('\n');
            current_y += line_height;

            if head {
                // Rule separating header from body
                self.out.lines.push(LayoutLine {
                    x1: x,
                    y1: current_y,
                    x2: cell_x.max(x),
                    y2: current_y,
                    color: self.theme.rule_color,
                });
                current_y += 2.0 * self.zoom;
            }
        }

        current_y + self.theme.paragraph_gap * self.zoom
    }

    // ------------------------------------------------------------------
    // Inline flow
    // ------------------------------------------------------------------

    /// Flow a block's inline children with greedy word wrap.
    /// Returns the Y below the last visual line.
    fn flow_block(
        &mut self,
        node: &Node,
        x: f64,
        y: f64,
        base: FontSettings,
        override_all: Option<FontSettings>,
        ctx: &mut dyn DrawContext,
    ) -> f64 {
        let line_height = self.theme.line_height_for(&base, self.zoom);
        let mut flow = Flow {
            x,
            y,
            start_x: x,
            line_height,
            lift: 0.0,
            placed_on_line: false,
            runs_start: self.out.runs.len(),
            rects_start: self.out.rects.len(),
            lines_start: self.out.lines.len(),
            images_start: self.out.images.len(),
            trects_start: self.out.text_rects.len(),
            link: None,
        };

        self.flow_inlines(&mut flow, &node.children, base, override_all, ctx);
        self.flush_link(&mut flow);

        if flow.placed_on_line {
            flow.y + flow.line_height
        } else {
            flow.y
        }
    }

    fn flow_inlines(
        &mut self,
        flow: &mut Flow,
        children: &[Node],
        base: FontSettings,
        override_all: Option<FontSettings>,
        ctx: &mut dyn DrawContext,
    ) {
        for child in children {
            match &child.node_type {
                NodeType::Text { content, style } => {
                    let settings = override_all.unwrap_or_else(|| {
                        if flow.link.is_some() {
                            self.theme.link_text
                        } else {
                            self.theme.text_settings(style)
                        }
                    });
                    for word in content.split_whitespace() {
                        let word_with_space = format!("{} ", word);
                        self.place_word(flow, &word_with_space, settings, ctx);
                    }
                }

                NodeType::Code { content } => {
                    self.place_code_span(flow, content, ctx);
                }

                NodeType::Link { destination, .. } | NodeType::WikiLink { destination } => {
                    self.flush_link(flow);
                    flow.link = Some(LinkSpan {
                        destination: destination.clone(),
                        span_start_x: flow.x,
                    });
                    if child.children.is_empty() {
                        // Bare wiki link: the destination doubles as text
                        let settings = self.theme.link_text;
                        for word in destination.split_whitespace() {
                            let word_with_space = format!("{} ", word);
                            self.place_word(flow, &word_with_space, settings, ctx);
                        }
                    } else {
                        self.flow_inlines(flow, &child.children, base, override_all, ctx);
                    }
                    self.flush_link(flow);
                }

                NodeType::Ruby { base: ruby_base, annotation } => {
                    self.place_ruby(flow, ruby_base, annotation, base, ctx);
                }

                // Markdown images arrive as inline nodes inside a paragraph
                NodeType::Image { destination, title } => {
                    self.place_image(flow, destination, title.as_deref());
                }

                NodeType::SoftBreak => {
                    let format = base.format(self.zoom);
                    flow.x += ctx.text_width(" ", format.font, format.size);
                    self.out.doc_text.push(' ');
                }

                NodeType::HardBreak => {
                    self.out.doc_text.push('\n');
                    self.wrap_line(flow);
                }

                _ if child.node_type.can_have_children() => {
                    self.flow_inlines(flow, &child.children, base, override_all, ctx);
                }

                _ => {}
            }
        }
    }

    /// Place one word (with its trailing space). Wraps first if the word
    /// would cross the right edge and at least one word is already on the
    /// line; a word wider than the whole line stays at line start.
    fn place_word(&mut self, flow: &mut Flow, word: &str, settings: FontSettings, ctx: &mut dyn DrawContext) {
        let format = settings.format(self.zoom);
        let doc_start = TextOffset(self.out.doc_text.len());
        self.out.doc_text.push_str(word);

        // Shaping failure: skip the visual run, keep the bookkeeping
        let Some(shaped) = ctx.shape(word, format) else {
            return;
        };

        if flow.x + shaped.width > self.right && flow.placed_on_line {
            self.wrap_line(flow);
        }

        let rect = DocRect::new(flow.x, flow.y, shaped.width, flow.line_height);
        self.out.text_rects.push(TextRect {
            rect,
            doc_start,
            doc_len: word.len(),
        });
        self.out.runs.push(LayoutRun {
            shaped,
            rect,
            format,
            color: settings.color,
            link: flow.link.is_some(),
            doc_start,
            doc_len: word.len(),
        });

        flow.x = rect.right();
        flow.placed_on_line = true;
    }

    /// Inline code: an atomic unbreakable unit with its own background
    fn place_code_span(&mut self, flow: &mut Flow, content: &str, ctx: &mut dyn DrawContext) {
        let settings = self.theme.code_text;
        let format = settings.format(self.zoom);
        let doc_start = TextOffset(self.out.doc_text.len());
        self.out.doc_text.push_str(content);
        self.out.doc_text.push(' ');

        let space = ctx.text_width(" ", format.font, format.size);
        let Some(shaped) = ctx.shape(content, format) else {
            return;
        };

        if flow.x + shaped.width > self.right && flow.placed_on_line {
            self.wrap_line(flow);
        }

        let rect = DocRect::new(flow.x, flow.y, shaped.width, flow.line_height);
        self.out.rects.push(LayoutRect {
            rect,
            color: self.theme.code_background,
        });
        self.out.text_rects.push(TextRect {
            rect,
            doc_start,
            doc_len: content.len(),
        });
        self.out.runs.push(LayoutRun {
            shaped,
            rect,
            format,
            color: settings.color,
            link: flow.link.is_some(),
            doc_start,
            doc_len: content.len(),
        });

        flow.x = rect.right() + space;
        flow.placed_on_line = true;
    }

    /// Ruby: atomic unit as wide as the wider of base and annotation; the
    /// annotation reserves space above the base line, shifting the whole
    /// visual line down.
    fn place_ruby(
        &mut self,
        flow: &mut Flow,
        base_text: &str,
        annotation: &str,
        settings: FontSettings,
        ctx: &mut dyn DrawContext,
    ) {
        let format = settings.format(self.zoom);
        let ann_size = ((f64::from(settings.size) * self.theme.ruby_annotation_scale).round() as u8).max(6);
        let ann_format = TextFormat::new(format.font, ((f64::from(ann_size)) * self.zoom) as u8);
        let ann_height = f64::from(ann_format.size) * 1.3;

        let doc_start = TextOffset(self.out.doc_text.len());
        self.out.doc_text.push_str(base_text);
        self.out.doc_text.push(' ');

        let space = ctx.text_width(" ", format.font, format.size);
        let base_shaped = ctx.shape(base_text, format);
        let ann_shaped = ctx.shape(annotation, ann_format);

        let Some(base_shaped) = base_shaped else {
            return;
        };

        let ann_width = ann_shaped.as_ref().map_or(0.0, |s| s.width);
        let unit_width = base_shaped.width.max(ann_width);

        if flow.x + unit_width > self.right && flow.placed_on_line {
            self.wrap_line(flow);
        }
        self.raise_line(flow, ann_height);

        let base_x = flow.x + (unit_width - base_shaped.width) / 2.0;
        let rect = DocRect::new(base_x, flow.y, base_shaped.width, flow.line_height);
        self.out.text_rects.push(TextRect {
            rect,
            doc_start,
            doc_len: base_text.len(),
        });
        self.out.runs.push(LayoutRun {
            shaped: base_shaped,
            rect,
            format,
            color: settings.color,
            link: flow.link.is_some(),
            doc_start,
            doc_len: base_text.len(),
        });

        if let Some(ann) = ann_shaped {
            let ann_x = flow.x + (unit_width - ann.width) / 2.0;
            let ann_rect = DocRect::new(ann_x, flow.y - ann_height, ann.width, ann_height);
            // Annotations are decorative: excluded from doc_text
            self.out.runs.push(LayoutRun {
                shaped: ann,
                rect: ann_rect,
                format: ann_format,
                color: settings.color,
                link: false,
                doc_start: TextOffset(self.out.doc_text.len()),
                doc_len: 0,
            });
        }

        flow.x += unit_width + space;
        flow.placed_on_line = true;
    }

    /// Inline image: an atomic placeholder box. The part of the box taller
    /// than the line reserves space above it, like a ruby annotation;
    /// decorative, so no `doc_text` contribution.
    fn place_image(&mut self, flow: &mut Flow, destination: &str, title: Option<&str>) {
        let w = (self.theme.image_width * self.zoom).min(self.right - flow.start_x);
        let h = self.theme.image_height * self.zoom;

        if flow.x + w > self.right && flow.placed_on_line {
            self.wrap_line(flow);
        }
        self.raise_line(flow, (h - flow.line_height).max(0.0));

        self.out.images.push(LayoutImage {
            rect: DocRect::new(flow.x, flow.y + flow.line_height - h, w, h),
            destination: destination.to_string(),
            title: title.map(String::from),
        });

        flow.x += w;
        flow.placed_on_line = true;
    }

    /// Close the current visual line: flush any open link span, then move
    /// the cursor to the start of the next line.
    fn wrap_line(&mut self, flow: &mut Flow) {
        if let Some(span) = &flow.link {
            self.emit_link_segment(span.destination.clone(), span.span_start_x, flow);
        }

        flow.y += flow.line_height;
        flow.x = flow.start_x;
        flow.placed_on_line = false;
        flow.lift = 0.0;
        flow.runs_start = self.out.runs.len();
        flow.rects_start = self.out.rects.len();
        flow.lines_start = self.out.lines.len();
        flow.images_start = self.out.images.len();
        flow.trects_start = self.out.text_rects.len();

        if let Some(span) = &mut flow.link {
            span.span_start_x = flow.x;
        }
    }

    /// End of a link: emit the final per-line underline and click rect
    fn flush_link(&mut self, flow: &mut Flow) {
        if let Some(span) = flow.link.take() {
            self.emit_link_segment(span.destination, span.span_start_x, flow);
        }
    }

    fn emit_link_segment(&mut self, destination: String, span_start_x: f64, flow: &Flow) {
        let end_x = flow.x;
        if end_x <= span_start_x {
            return;
        }
        let underline_y = flow.y + flow.line_height - 2.0;
        self.out.lines.push(LayoutLine {
            x1: span_start_x,
            y1: underline_y,
            x2: end_x,
            y2: underline_y,
            color: self.theme.link_color,
        });
        self.out.links.push(LinkArea {
            rect: DocRect::new(span_start_x, flow.y, end_x - span_start_x, flow.line_height),
            destination,
        });
    }

    /// Reserve `lift` document units above the current line, shifting every
    /// primitive already placed on it downwards.
    fn raise_line(&mut self, flow: &mut Flow, lift: f64) {
        if lift <= flow.lift {
            return;
        }
        let dy = lift - flow.lift;
        for run in &mut self.out.runs[flow.runs_start..] {
            run.rect.y += dy;
        }
        for rect in &mut self.out.rects[flow.rects_start..] {
            rect.rect.y += dy;
        }
        for line in &mut self.out.lines[flow.lines_start..] {
            line.y1 += dy;
            line.y2 += dy;
        }
        for image in &mut self.out.images[flow.images_start..] {
            image.rect.y += dy;
        }
        for tr in &mut self.out.text_rects[flow.trects_start..] {
            tr.rect.y += dy;
        }
        flow.y += dy;
        flow.lift = lift;
    }

    fn token_color(&self, class: TokenClass) -> u32 {
        match class {
            TokenClass::Plain => self.theme.code_text.color,
            TokenClass::Keyword => 0xAA00AAFF,
            TokenClass::Literal => 0x007744FF,
            TokenClass::Comment => 0x888888FF,
            TokenClass::String => 0xAA5500FF,
        }
    }
}

enum RowKind {
    Head,
    Body,
}

/// Iterate the rows of a table node, flattening TableHead wrappers
fn row_iter(node: &Node) -> Vec<(&Node, RowKind)> {
    match &node.node_type {
        NodeType::TableHead => node
            .children
            .iter()
            .map(|r| (r, RowKind::Head))
            .collect(),
        NodeType::TableRow => vec![(node, RowKind::Body)],
        _ => Vec::new(),
    }
}
