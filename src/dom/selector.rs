//! Small CSS selector engine
//!
//! Supports the subset the navigation engine and its configuration need:
//! type and universal selectors, `#id`, `.class`, attribute selectors
//! (`[a]`, `[a=v]`, `[a^=v]`), the descendant combinator, and comma
//! separated selector lists.

use super::Element;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character '{found}' at {position} in selector '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        position: usize,
    },

    #[error("unterminated attribute selector in '{selector}'")]
    UnterminatedAttribute { selector: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    groups: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    /// Compounds left to right, each a descendant of the one before
    parts: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    html_id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut groups = Vec::new();
        for group in split_groups(source) {
            let group = group.trim();
            if group.is_empty() {
                return Err(SelectorError::Empty);
            }
            groups.push(Parser::new(source, group).complex()?);
        }
        if groups.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self {
            source: source.trim().to_string(),
            groups,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `element` matches, given its ancestors outermost first
    pub fn matches(&self, element: &Element, ancestors: &[&Element]) -> bool {
        self.groups
            .iter()
            .any(|group| match_parts(&group.parts, element, ancestors))
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

fn match_parts(parts: &[Compound], element: &Element, ancestors: &[&Element]) -> bool {
    let Some((compound, rest)) = parts.split_last() else {
        return true;
    };
    if !compound.matches(element) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    (0..ancestors.len())
        .rev()
        .any(|i| match_parts(rest, ancestors[i], &ancestors[..i]))
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag() != tag {
                return false;
            }
        }
        if let Some(id) = &self.html_id {
            if element.html_id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|attr| attr.matches(element))
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.html_id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }
}

impl AttrMatch {
    fn matches(&self, element: &Element) -> bool {
        let Some(actual) = element.attr(&self.name) else {
            return false;
        };
        let expected = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
        }
    }
}

/// Split on top-level commas (commas inside quotes or brackets are kept)
fn split_groups(source: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&source[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    groups.push(&source[start..]);
    groups
}

struct Parser<'a> {
    selector: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(selector: &'a str, group: &'a str) -> Self {
        Self {
            selector,
            chars: group.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.selector.to_string(),
            found,
            position: self.chars.get(self.pos).map(|(i, _)| *i).unwrap_or(0),
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
            skipped = true;
        }
        skipped
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = Vec::new();
        self.skip_whitespace();
        loop {
            parts.push(self.compound()?);

            let had_space = self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(_) if had_space => {}
                Some(other) => return Err(self.unexpected(other)),
            }
        }
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;
        match self.peek() {
            Some('*') => {
                self.bump();
                universal = true;
            }
            Some(c) if is_ident_char(c) => compound.tag = Some(self.ident().to_ascii_lowercase()),
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.html_id = Some(self.required_ident()?);
                }
                Some('.') => {
                    self.bump();
                    let class = self.required_ident()?;
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.bump();
                    let attr = self.attribute()?;
                    compound.attrs.push(attr);
                }
                _ => break,
            }
        }
        if compound.is_empty() && !universal {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(compound)
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn required_ident(&mut self) -> Result<String, SelectorError> {
        let ident = self.ident();
        if ident.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(ident)
    }

    fn attribute(&mut self) -> Result<AttrMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.required_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op = match self.bump() {
            Some(']') => {
                return Ok(AttrMatch {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                });
            }
            Some('=') => AttrOp::Equals,
            Some('^') => {
                if self.bump() != Some('=') {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.unexpected('^'));
                }
                AttrOp::Prefix
            }
            Some(c) => {
                self.pos -= 1;
                return Err(self.unexpected(c));
            }
            None => return Err(self.unterminated()),
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == q => break,
                        Some(c) => value.push(c),
                        None => return Err(self.unterminated()),
                    }
                }
                value
            }
            _ => self.ident(),
        };
        self.skip_whitespace();
        match self.bump() {
            Some(']') => Ok(AttrMatch { name, op, value }),
            Some(c) => {
                self.pos -= 1;
                Err(self.unexpected(c))
            }
            None => Err(self.unterminated()),
        }
    }

    fn unterminated(&self) -> SelectorError {
        SelectorError::UnterminatedAttribute {
            selector: self.selector.to_string(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
