// Syntax highlighting seam for code blocks. The real tokenizer is an
// external collaborator; the layout engine only needs the per-line token
// stream and the per-block state that threads across lines.

/// Token classes a tokenizer may emit; mapped to colors by the theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Plain,
    Keyword,
    Literal,
    Comment,
    String,
}

/// One token inside a single source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the token inside its line
    pub start: usize,
    pub len: usize,
    pub class: TokenClass,
}

/// Tokenizer state threaded across the lines of one code block.
/// Reset at every block start; mutated per line by the tokenizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightState {
    pub in_block_comment: bool,
}

/// Per-line tokenizer. Stateless apart from the threaded `HighlightState`;
/// the layout engine calls it once per source line in order.
pub trait Highlighter {
    fn tokenize_line(&self, line: &str, state: &mut HighlightState) -> Vec<Token>;
}

/// Fallback tokenizer: the whole line is one plain token.
#[derive(Debug, Default)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn tokenize_line(&self, line: &str, _state: &mut HighlightState) -> Vec<Token> {
        if line.is_empty() {
            return Vec::new();
        }
        vec![Token {
            start: 0,
            len: line.len(),
            class: TokenClass::Plain,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_highlighter_emits_single_token() {
        let tokens = PlainHighlighter.tokenize_line("let x = 1;", &mut HighlightState::default());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].len, 10);
        assert_eq!(tokens[0].class, TokenClass::Plain);
    }

    #[test]
    fn plain_highlighter_skips_empty_lines() {
        let tokens = PlainHighlighter.tokenize_line("", &mut HighlightState::default());
        assert!(tokens.is_empty());
    }
}
