// Drawing backend trait - abstracts over the host toolkit's text shaping
// and drawing primitives. The layout engine only measures through it; the
// view's draw pass uses the full surface.

/// Font face identifier, resolved by the backend
pub type FontId = u8;

pub const FONT_CONTENT: FontId = 0;
pub const FONT_CONTENT_BOLD: FontId = 1;
pub const FONT_CONTENT_ITALIC: FontId = 2;
pub const FONT_CONTENT_BOLD_ITALIC: FontId = 3;
pub const FONT_CODE: FontId = 4;
pub const FONT_HEADING: FontId = 5;

/// Format descriptor for shaping and drawing a run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFormat {
    pub font: FontId,
    pub size: u8,
}

impl TextFormat {
    pub fn new(font: FontId, size: u8) -> Self {
        TextFormat { font, size }
    }
}

/// A shaped run of text: the string handed to the backend plus its
/// measured advance width. Owned by one layout generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedText {
    pub text: String,
    pub width: f64,
}

pub trait DrawContext {
    fn set_color(&mut self, color: u32);
    fn set_font(&mut self, font: FontId, size: u8);
    fn draw_text(&mut self, text: &str, x: i32, y: i32);
    fn draw_rect_filled(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32);
    fn draw_image_placeholder(&mut self, _x: i32, _y: i32, _w: i32, _h: i32, _destination: &str) {}
    fn text_width(&mut self, text: &str, font: FontId, size: u8) -> f64;
    fn text_height(&self, font: FontId, size: u8) -> i32;
    fn text_descent(&self, font: FontId, size: u8) -> i32;
    fn push_clip(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn pop_clip(&mut self);

    /// Shape a run for later drawing. `None` signals a shaping failure;
    /// layout skips the visual run but keeps its text bookkeeping.
    fn shape(&mut self, text: &str, format: TextFormat) -> Option<ShapedText> {
        let width = self.text_width(text, format.font, format.size);
        Some(ShapedText {
            text: text.to_string(),
            width,
        })
    }
}
