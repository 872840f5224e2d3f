use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{OverlayError, Result};

pub(super) type NodeId = usize;

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        id: Option<String>,
        class: Option<String>,
        title: Option<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Owned element tree of an hOCR document. Nodes are stored in document
/// order, so walking the arena by index is a pre-order traversal.
#[derive(Debug, Clone)]
pub(super) struct LayoutTree {
    nodes: Vec<Node>,
}

impl LayoutTree {
    pub(super) const ROOT: NodeId = 0;

    pub(super) fn parse(document: &str) -> Result<Self> {
        let mut tree = LayoutTree {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    name: "#document".to_string(),
                    id: None,
                    class: None,
                    title: None,
                },
                children: Vec::new(),
            }],
        };
        let mut reader = Reader::from_str(document);
        reader.trim_text(false);
        let mut stack = vec![Self::ROOT];

        loop {
            let parent = stack.last().copied().unwrap_or(Self::ROOT);
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = tree.push(parent, element_kind(&e));
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    tree.push(parent, element_kind(&e));
                }
                Ok(Event::End(e)) => {
                    if stack.len() <= 1 {
                        return Err(OverlayError::layout(format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape_with(html_entity)
                        .map(|value| value.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    tree.push(parent, NodeKind::Text(text));
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    tree.push(parent, NodeKind::Text(text));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    return Err(OverlayError::layout(format!(
                        "malformed hOCR at byte {}: {}",
                        reader.buffer_position(),
                        err
                    )));
                }
            }
        }

        if stack.len() > 1 {
            return Err(OverlayError::layout("hOCR document ended inside an open element"));
        }
        Ok(tree)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub(super) fn has_class(&self, node: NodeId, wanted: &str) -> bool {
        match &self.nodes[node].kind {
            NodeKind::Element {
                class: Some(class),
                ..
            } => class.split_whitespace().any(|value| value == wanted),
            _ => false,
        }
    }

    pub(super) fn title(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node].kind {
            NodeKind::Element { title, .. } => title.as_deref(),
            NodeKind::Text(_) => None,
        }
    }

    /// A short label for error messages: the element id, or its tag name.
    pub(super) fn label(&self, node: NodeId) -> String {
        match &self.nodes[node].kind {
            NodeKind::Element { id: Some(id), .. } => id.clone(),
            NodeKind::Element { name, .. } => format!("<{}> #{}", name, node),
            NodeKind::Text(_) => format!("text #{}", node),
        }
    }

    /// Strict descendants of `node` in document order.
    pub(super) fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending: Vec<NodeId> = self.nodes[node].children.iter().rev().copied().collect();
        while let Some(next) = pending.pop() {
            out.push(next);
            pending.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    pub(super) fn find_class(&self, node: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|id| self.has_class(*id, class))
            .collect()
    }

    /// Every descendant text fragment, trimmed, joined with single spaces.
    pub(super) fn text(&self, node: NodeId) -> String {
        let mut fragments = Vec::new();
        for id in self.descendants(node) {
            if let NodeKind::Text(value) = &self.nodes[id].kind {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    fragments.push(trimmed);
                }
            }
        }
        fragments.join(" ")
    }
}

fn element_kind(e: &BytesStart<'_>) -> NodeKind {
    let mut id = None;
    let mut class = None;
    let mut title = None;
    for attr in e.attributes().with_checks(false).flatten() {
        let slot = match attr.key.local_name().as_ref() {
            b"id" => &mut id,
            b"class" => &mut class,
            b"title" => &mut title,
            _ => continue,
        };
        let value = attr
            .unescape_value()
            .map(|value| value.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        *slot = Some(value);
    }
    NodeKind::Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        id,
        class,
        title,
    }
}

/// Named entities that HTML-flavoured hOCR writers emit beyond the XML five.
fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{00a0}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "shy" => Some("\u{00ad}"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_tree_in_document_order() {
        let tree = LayoutTree::parse(
            r#"<div class="page"><span class="a" id="one">x</span><span class="a" id="two"/></div>"#,
        )
        .expect("parse");
        let found = tree.find_class(LayoutTree::ROOT, "a");
        assert_eq!(found.len(), 2);
        assert_eq!(tree.label(found[0]), "one");
        assert_eq!(tree.label(found[1]), "two");
    }

    #[test]
    fn text_trims_and_joins_fragments() {
        let tree = LayoutTree::parse("<p>  Hello <b> big </b>\n <i>   </i>world&amp;co </p>")
            .expect("parse");
        assert_eq!(tree.text(LayoutTree::ROOT), "Hello big world&co");
    }

    #[test]
    fn resolves_html_entities() {
        let tree = LayoutTree::parse("<p>a&nbsp;b</p>").expect("parse");
        assert_eq!(tree.text(LayoutTree::ROOT), "a\u{00a0}b");
    }

    #[test]
    fn class_matching_uses_tokens() {
        let tree = LayoutTree::parse(r#"<span class="ocr_line extra"/>"#).expect("parse");
        let id = tree.descendants(LayoutTree::ROOT)[0];
        assert!(tree.has_class(id, "ocr_line"));
        assert!(!tree.has_class(id, "ocr"));
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = LayoutTree::parse("<div><span></div>").unwrap_err();
        assert!(matches!(err, OverlayError::InvalidLayout(_)));
    }

    #[test]
    fn rejects_unclosed_document() {
        let err = LayoutTree::parse("<div><span>").unwrap_err();
        assert!(matches!(err, OverlayError::InvalidLayout(_)));
    }
}
