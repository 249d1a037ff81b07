//! Markdown document view: layout, hit-testing, selection and search for
//! a scrollable rendered-markdown widget. The host toolkit supplies a
//! [`draw_context::DrawContext`] backend and forwards mouse events to
//! [`view::RichTextView`]; everything else is toolkit-independent.

pub mod document;
pub mod draw_context;
pub mod highlight;
pub mod hittest;
pub mod layout;
pub mod link;
pub mod markdown;
pub mod search;
pub mod selection;
pub mod theme;
pub mod view;

#[cfg(test)]
pub(crate) mod test_util;

pub use document::{Document, Node, NodeType, TextStyle};
pub use draw_context::{DrawContext, FontId, ShapedText, TextFormat};
pub use layout::{DocPoint, DocRect, LayoutResult, TextOffset};
pub use link::LinkTarget;
pub use markdown::parse_markdown;
pub use selection::SelectionMode;
pub use theme::Theme;
pub use view::{EventOutcome, RichTextView};
