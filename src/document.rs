// Document tree - the read-only input of the layout engine
// Produced by the markdown adapter, shared as Rc<Document>

use std::rc::Rc;

/// Text styling attributes for inline text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
}

/// Alignment options for table cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Types of document nodes
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Root document node
    Document,

    /// Block-level elements
    Paragraph,
    Heading {
        level: u8,
    }, // 1-6
    CodeBlock {
        language: Option<String>,
    },
    BlockQuote,
    List {
        ordered: bool,
        start: u64,
    },
    ListItem,
    ThematicBreak,
    Table,
    TableHead,
    TableRow,
    TableCell {
        alignment: Option<Alignment>,
    },
    Image {
        destination: String,
        title: Option<String>,
    },

    /// Inline elements
    Text {
        content: String,
        style: TextStyle,
    },
    Code {
        content: String,
    },
    Link {
        destination: String,
        title: Option<String>,
    },
    WikiLink {
        destination: String,
    }, // [[page]]
    /// Base text with an annotation line reserved above it
    Ruby {
        base: String,
        annotation: String,
    },
    SoftBreak,
    HardBreak,
}

impl NodeType {
    /// Returns true if this node type is a block-level element
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeType::Document
                | NodeType::Paragraph
                | NodeType::Heading { .. }
                | NodeType::CodeBlock { .. }
                | NodeType::BlockQuote
                | NodeType::List { .. }
                | NodeType::ListItem
                | NodeType::ThematicBreak
                | NodeType::Table
                | NodeType::TableHead
                | NodeType::TableRow
                | NodeType::TableCell { .. }
                | NodeType::Image { .. }
        )
    }

    /// Returns true if this node type may contain children
    pub fn can_have_children(&self) -> bool {
        !matches!(
            self,
            NodeType::Text { .. }
                | NodeType::Code { .. }
                | NodeType::Ruby { .. }
                | NodeType::SoftBreak
                | NodeType::HardBreak
                | NodeType::ThematicBreak
                | NodeType::Image { .. }
        )
    }
}

/// A node in the document tree. Owns its children; a node never outlives
/// the document it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_type: NodeType,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(node_type: NodeType) -> Self {
        Node {
            node_type,
            children: Vec::new(),
        }
    }

    pub fn with_children(node_type: NodeType, children: Vec<Node>) -> Self {
        Node {
            node_type,
            children,
        }
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Shorthand for a plain text leaf
    pub fn text(content: impl Into<String>) -> Self {
        Node::new(NodeType::Text {
            content: content.into(),
            style: TextStyle::default(),
        })
    }

    /// Concatenate all selectable text below this node, in traversal order.
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.node_type {
            NodeType::Text { content, .. } => out.push_str(content),
            NodeType::Code { content } => out.push_str(content),
            NodeType::Ruby { base, .. } => out.push_str(base),
            NodeType::SoftBreak => out.push(' '),
            NodeType::HardBreak => out.push('\n'),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// A parsed document. Immutable once built; the view layer holds it as
/// `Rc<Document>` so layout passes can read it without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Node,
}

impl Document {
    pub fn new() -> Self {
        Document {
            root: Node::new(NodeType::Document),
        }
    }

    pub fn from_blocks(blocks: Vec<Node>) -> Rc<Self> {
        Rc::new(Document {
            root: Node::with_children(NodeType::Document, blocks),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
