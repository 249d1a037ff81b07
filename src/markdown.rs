// Markdown adapter - converts the pulldown-cmark event stream into the
// document tree. The parser is the external collaborator; this module is
// only the bridge between its events and our node types.

use crate::document::{Alignment, Document, Node, NodeType, TextStyle};
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd};
use std::rc::Rc;

fn map_alignment(a: pulldown_cmark::Alignment) -> Option<Alignment> {
    match a {
        pulldown_cmark::Alignment::None => None,
        pulldown_cmark::Alignment::Left => Some(Alignment::Left),
        pulldown_cmark::Alignment::Center => Some(Alignment::Center),
        pulldown_cmark::Alignment::Right => Some(Alignment::Right),
    }
}

/// Parse markdown text into a document tree
pub fn parse_markdown(text: &str) -> Rc<Document> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_WIKILINKS);
    let parser = Parser::new_ext(text, options);

    let mut doc = Document::new();
    // Open container nodes; finished nodes move to their parent
    let mut node_stack: Vec<Node> = Vec::new();
    // Current inline style, nested emphasis/strong compose
    let mut style_stack: Vec<TextStyle> = vec![TextStyle::default()];
    // Column alignments of the innermost open table
    let mut table_alignments: Vec<pulldown_cmark::Alignment> = Vec::new();
    let mut cell_index = 0usize;

    fn attach(node_stack: &mut Vec<Node>, doc: &mut Document, node: Node) {
        if let Some(parent) = node_stack.last_mut() {
            parent.add_child(node);
        } else {
            doc.root.add_child(node);
        }
    }

    for event in parser {
        match event {
            Event::Start(tag) => match tag {
                Tag::Emphasis => {
                    let mut style = style_stack.last().copied().unwrap_or_default();
                    style.italic = true;
                    style_stack.push(style);
                }
                Tag::Strong => {
                    let mut style = style_stack.last().copied().unwrap_or_default();
                    style.bold = true;
                    style_stack.push(style);
                }
                Tag::Strikethrough => {
                    let mut style = style_stack.last().copied().unwrap_or_default();
                    style.strikethrough = true;
                    style_stack.push(style);
                }
                Tag::Table(alignments) => {
                    table_alignments = alignments;
                    node_stack.push(Node::new(NodeType::Table));
                }
                Tag::TableHead => {
                    cell_index = 0;
                    node_stack.push(Node::new(NodeType::TableHead));
                }
                Tag::TableRow => {
                    cell_index = 0;
                    node_stack.push(Node::new(NodeType::TableRow));
                }
                Tag::TableCell => {
                    let alignment = table_alignments
                        .get(cell_index)
                        .copied()
                        .and_then(map_alignment);
                    node_stack.push(Node::new(NodeType::TableCell { alignment }));
                }
                other => node_stack.push(Node::new(node_type_for_tag(other))),
            },

            Event::End(tag_end) => match tag_end {
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                    if style_stack.len() > 1 {
                        style_stack.pop();
                    }
                }
                TagEnd::TableCell => {
                    cell_index += 1;
                    if let Some(done) = node_stack.pop() {
                        attach(&mut node_stack, &mut doc, done);
                    }
                }
                _ => {
                    if let Some(done) = node_stack.pop() {
                        attach(&mut node_stack, &mut doc, done);
                    }
                }
            },

            Event::Text(content) => {
                let style = style_stack.last().copied().unwrap_or_default();
                let node = Node::new(NodeType::Text {
                    content: content.to_string(),
                    style,
                });
                attach(&mut node_stack, &mut doc, node);
            }

            Event::Code(content) => {
                let node = Node::new(NodeType::Code {
                    content: content.to_string(),
                });
                attach(&mut node_stack, &mut doc, node);
            }

            Event::SoftBreak => {
                attach(&mut node_stack, &mut doc, Node::new(NodeType::SoftBreak));
            }

            Event::HardBreak => {
                attach(&mut node_stack, &mut doc, Node::new(NodeType::HardBreak));
            }

            Event::Rule => {
                attach(&mut node_stack, &mut doc, Node::new(NodeType::ThematicBreak));
            }

            // Raw HTML, footnotes, task markers and metadata are not
            // rendered by this view
            _ => {}
        }
    }

    // Unterminated containers (malformed input): attach what we have
    while let Some(done) = node_stack.pop() {
        attach(&mut node_stack, &mut doc, done);
    }

    Rc::new(doc)
}

fn node_type_for_tag(tag: Tag) -> NodeType {
    match tag {
        Tag::Paragraph => NodeType::Paragraph,
        Tag::Heading { level, .. } => NodeType::Heading { level: level as u8 },
        Tag::BlockQuote(_) => NodeType::BlockQuote,
        Tag::CodeBlock(kind) => {
            let language = match kind {
                pulldown_cmark::CodeBlockKind::Indented => None,
                pulldown_cmark::CodeBlockKind::Fenced(info) => {
                    info.split_whitespace().next().map(String::from)
                }
            };
            NodeType::CodeBlock { language }
        }
        Tag::List(start_number) => NodeType::List {
            ordered: start_number.is_some(),
            start: start_number.unwrap_or(1),
        },
        Tag::Item => NodeType::ListItem,
        Tag::Link {
            link_type: LinkType::WikiLink { .. },
            dest_url,
            ..
        } => NodeType::WikiLink {
            destination: dest_url.to_string(),
        },
        Tag::Link { dest_url, title, .. } => NodeType::Link {
            destination: dest_url.to_string(),
            title: (!title.is_empty()).then(|| title.to_string()),
        },
        Tag::Image { dest_url, title, .. } => NodeType::Image {
            destination: dest_url.to_string(),
            title: (!title.is_empty()).then(|| title.to_string()),
        },
        // Anything unrecognized flows as an anonymous paragraph
        _ => NodeType::Paragraph,
    }
}
