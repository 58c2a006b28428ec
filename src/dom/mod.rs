//! Owned HTML page model
//!
//! Markup is parsed with `scraper` (html5ever) and converted into an owned,
//! mutable tree. Every element receives a [`NodeId`] that is unique for the
//! whole process, so elements taken from a freshly fetched page keep their
//! identity once they are mounted into the live page.

pub mod selector;

use std::sync::atomic::{AtomicU64, Ordering};

pub use selector::{Selector, SelectorError};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide element identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: NodeId,
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

/// Return value of traversal callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    SkipChildren,
    Stop,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: NodeId::fresh(),
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Deep copy with fresh identities. `Clone` keeps the originals and is
    /// only meant for snapshots.
    pub fn duplicate(&self) -> Element {
        Element {
            id: NodeId::fresh(),
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: self
                .children
                .iter()
                .map(|child| match child {
                    Node::Element(el) => Node::Element(el.duplicate()),
                    Node::Text(text) => Node::Text(text.clone()),
                })
                .collect(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(index).1)
    }

    /// The element's `id` attribute (not to be confused with [`Element::id`])
    pub fn html_id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    pub fn append(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Depth-first walk over this element and its descendants.
    ///
    /// The callback receives each element with its ancestors inside this
    /// subtree, outermost first.
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Element, &[&'a Element]) -> Walk,
    {
        let mut ancestors = Vec::new();
        self.walk_inner(&mut ancestors, f);
    }

    fn walk_inner<'a, F>(&'a self, ancestors: &mut Vec<&'a Element>, f: &mut F) -> bool
    where
        F: FnMut(&'a Element, &[&'a Element]) -> Walk,
    {
        match f(self, ancestors) {
            Walk::Stop => return false,
            Walk::SkipChildren => return true,
            Walk::Continue => {}
        }
        ancestors.push(self);
        for child in self.child_elements() {
            if !child.walk_inner(ancestors, f) {
                ancestors.pop();
                return false;
            }
        }
        ancestors.pop();
        true
    }

    /// Descendants (not including `self`) in document order
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.walk(&mut |el, _| {
            if el.id != self.id {
                out.push(el);
            }
            Walk::Continue
        });
        out
    }

    /// Whether `id` is this element or one of its descendants
    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    pub fn find(&self, id: NodeId) -> Option<&Element> {
        if self.id == id {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(el) => el.find_mut(id),
            Node::Text(_) => None,
        })
    }

    /// Ancestor chain of `id` inside this subtree, outermost first.
    /// `None` when `id` is not part of the subtree.
    pub fn path_to(&self, id: NodeId) -> Option<Vec<&Element>> {
        let mut found = None;
        self.walk(&mut |el, ancestors| {
            if el.id == id {
                found = Some(ancestors.to_vec());
                Walk::Stop
            } else {
                Walk::Continue
            }
        });
        found
    }

    /// All matching elements in document order, including `self`
    pub fn select(&self, selector: &Selector) -> Vec<&Element> {
        let mut out = Vec::new();
        self.walk(&mut |el, ancestors| {
            if selector.matches(el, ancestors) {
                out.push(el);
            }
            Walk::Continue
        });
        out
    }

    pub fn select_first(&self, selector: &Selector) -> Option<&Element> {
        let mut found = None;
        self.walk(&mut |el, ancestors| {
            if selector.matches(el, ancestors) {
                found = Some(el);
                Walk::Stop
            } else {
                Walk::Continue
            }
        });
        found
    }

    /// Detach the descendant `id`, returning it
    pub fn remove(&mut self, id: NodeId) -> Option<Element> {
        let position = self.children.iter().position(|node| match node {
            Node::Element(el) => el.id == id,
            Node::Text(_) => false,
        });
        if let Some(index) = position {
            return match self.children.remove(index) {
                Node::Element(el) => Some(el),
                Node::Text(_) => None,
            };
        }
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(el) => el.remove(id),
            Node::Text(_) => None,
        })
    }

    /// Insert `node` right after the descendant `sibling`.
    /// Returns the node back when `sibling` is not found.
    pub fn insert_after(&mut self, sibling: NodeId, node: Element) -> Result<(), Element> {
        let position = self.children.iter().position(|child| match child {
            Node::Element(el) => el.id == sibling,
            Node::Text(_) => false,
        });
        if let Some(index) = position {
            self.children.insert(index + 1, Node::Element(node));
            return Ok(());
        }
        for child in self.children.iter_mut() {
            if let Node::Element(el) = child {
                if el.contains(sibling) {
                    return el.insert_after(sibling, node);
                }
            }
        }
        Err(node)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value, true));
            out.push('"');
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return;
        }
        let raw = RAW_TEXT_ELEMENTS.contains(&self.tag.as_str());
        for child in &self.children {
            match child {
                Node::Text(text) if raw => out.push_str(text),
                Node::Text(text) => out.push_str(&escape(text, false)),
                Node::Element(el) => el.write_html(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// A parsed page rooted at its `<html>` element
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse a full HTML document. html5ever recovers from malformed input,
    /// so this never fails.
    pub fn parse(markup: &str) -> Self {
        let html = scraper::Html::parse_document(markup);
        Self {
            root: convert(html.root_element()),
        }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn head(&self) -> Option<&Element> {
        self.root.child_elements().find(|el| el.tag == "head")
    }

    pub fn body(&self) -> Option<&Element> {
        self.root.child_elements().find(|el| el.tag == "body")
    }

    pub fn title(&self) -> Option<String> {
        let head = self.head()?;
        let title = head.descendants().into_iter().find(|el| el.tag == "title")?;
        Some(title.text().trim().to_string())
    }

    pub fn set_title(&mut self, title: &str) {
        let Some(head) = self
            .root
            .children
            .iter_mut()
            .find_map(|node| match node {
                Node::Element(el) if el.tag == "head" => Some(el),
                _ => None,
            })
        else {
            return;
        };
        let existing = head.child_elements().find(|el| el.tag == "title").map(|el| el.id);
        match existing.and_then(|id| head.find_mut(id)) {
            Some(el) => {
                el.clear_children();
                el.children.push(Node::Text(title.to_string()));
            }
            None => head.append(Element::new("title").with_text(title)),
        }
    }

    pub fn find(&self, id: NodeId) -> Option<&Element> {
        self.root.find(id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.root.find_mut(id)
    }

    pub fn ancestors_of(&self, id: NodeId) -> Option<Vec<&Element>> {
        self.root.path_to(id)
    }

    pub fn select(&self, selector: &Selector) -> Vec<&Element> {
        self.root.select(selector)
    }

    pub fn select_first(&self, selector: &Selector) -> Option<&Element> {
        self.root.select_first(selector)
    }

    /// Element carrying the given `id` attribute
    pub fn element_by_html_id(&self, html_id: &str) -> Option<&Element> {
        let mut found = None;
        self.root.walk(&mut |el, _| {
            if el.html_id() == Some(html_id) {
                found = Some(el);
                Walk::Stop
            } else {
                Walk::Continue
            }
        });
        found
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Element> {
        self.root.remove(id)
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: Element) -> Result<(), Element> {
        self.root.insert_after(sibling, node)
    }

    /// Append to `<body>`, creating it when absent
    pub fn append_to_body(&mut self, node: Element) {
        let body = self.root.children.iter_mut().find_map(|child| match child {
            Node::Element(el) if el.tag == "body" => Some(el),
            _ => None,
        });
        match body {
            Some(body) => body.append(node),
            None => self.root.append(Element::new("body").with_child(node)),
        }
    }

    pub fn to_html(&self) -> String {
        format!("<!DOCTYPE html>{}", self.root.to_html())
    }
}

fn convert(source: scraper::ElementRef<'_>) -> Element {
    let value = source.value();
    let mut element = Element::new(value.name());
    for (name, attr) in value.attrs() {
        element.attrs.push((name.to_ascii_lowercase(), attr.to_string()));
    }
    for child in source.children() {
        if let scraper::Node::Text(text) = child.value() {
            let text: &str = text;
            element.children.push(Node::Text(text.to_string()));
        } else if let Some(child) = scraper::ElementRef::wrap(child) {
            element.children.push(Node::Element(convert(child)));
        }
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title> Page A </title></head>
<body>
  <div id="page-wrapper">
    <main id="content"><p class="lead intro">Hello <b>world</b></p><img src="a.jpg"></main>
  </div>
</body></html>"#;

    #[test]
    fn test_parse_and_title() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.root().tag(), "html");
        assert_eq!(doc.title().as_deref(), Some("Page A"));
        assert!(doc.body().is_some());
    }

    #[test]
    fn test_select_and_text() {
        let doc = Document::parse(PAGE);
        let selector = Selector::parse("p.lead").unwrap();
        let lead = doc.select_first(&selector).unwrap();
        assert_eq!(lead.text(), "Hello world");
        assert!(lead.has_class("intro"));
    }

    #[test]
    fn test_duplicate_assigns_fresh_ids() {
        let doc = Document::parse(PAGE);
        let main = doc.element_by_html_id("content").unwrap();
        let copy = main.duplicate();

        assert_ne!(copy.id(), main.id());
        assert_eq!(copy.to_html(), main.to_html());
        assert!(copy.descendants().iter().all(|el| !main.contains(el.id())));
    }

    #[test]
    fn test_node_ids_are_unique_across_documents() {
        let a = Document::parse(PAGE);
        let b = Document::parse(PAGE);
        let sel = Selector::parse("#content").unwrap();
        assert_ne!(a.select_first(&sel).unwrap().id(), b.select_first(&sel).unwrap().id());
    }

    #[test]
    fn test_remove_and_insert_after() {
        let mut doc = Document::parse(PAGE);
        let content = Selector::parse("#content").unwrap();
        let old_id = doc.select_first(&content).unwrap().id();

        let replacement = Element::new("main").with_attr("id", "content").with_text("B");
        let new_id = replacement.id();
        doc.insert_after(old_id, replacement).unwrap();
        assert!(doc.remove(old_id).is_some());

        let found = doc.select(&content);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), new_id);
        assert_eq!(found[0].text(), "B");
    }

    #[test]
    fn test_insert_after_unknown_sibling_returns_node() {
        let mut doc = Document::parse(PAGE);
        let orphan = Element::new("div");
        let missing = Element::new("span").id();
        assert!(doc.insert_after(missing, orphan).is_err());
    }

    #[test]
    fn test_ancestors_of() {
        let doc = Document::parse(PAGE);
        let img = doc.select_first(&Selector::parse("img").unwrap()).unwrap();
        let path = doc.ancestors_of(img.id()).unwrap();
        let tags: Vec<&str> = path.iter().map(|el| el.tag()).collect();
        assert_eq!(tags, vec!["html", "body", "div", "main"]);
    }

    #[test]
    fn test_set_title_and_serialize() {
        let mut doc = Document::parse(PAGE);
        doc.set_title("Page <B>");
        assert_eq!(doc.title().as_deref(), Some("Page <B>"));
        let html = doc.to_html();
        assert!(html.contains("<title>Page &lt;B&gt;</title>"));
        assert!(html.contains(r#"<img src="a.jpg">"#));
        assert!(!html.contains("</img>"));
    }

    #[test]
    fn test_reparse_preserves_structure() {
        let doc = Document::parse(PAGE);
        let again = Document::parse(&doc.to_html());
        assert_eq!(again.title(), doc.title());
        assert!(again.element_by_html_id("page-wrapper").is_some());
    }
}
