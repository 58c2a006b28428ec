//! Link interception rules
//!
//! Decides whether activating a link keeps the browser default or is
//! handled in page. Checks run in a fixed order and the first hit wins:
//! region, placeholder, in-page anchor, exclusions, then origin.

use log::debug;
use once_cell::sync::Lazy;
use url::Url;

use crate::dom::{Document, Element, NodeId, Selector, SelectorError};

/// Links that always keep default browser navigation
pub const BUILTIN_EXCLUSIONS: &[&str] = &[
    "[data-no-pjax]",
    ".no-pjax",
    "[data-lightbox]",
    "[data-gallery]",
    ".lang-switcher a",
    "[hreflang]",
    "[target=\"_blank\"]",
    "[download]",
    "[href^=\"mailto:\"]",
    "[href^=\"tel:\"]",
];

static BUILTIN_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    BUILTIN_EXCLUSIONS
        .iter()
        .map(|source| Selector::parse(source).expect("built-in exclusion selectors are valid"))
        .collect()
});

/// Why a link keeps its default behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassThrough {
    /// Not inside the navigable region
    OutsideRegion,
    /// `href="#"`
    Placeholder,
    /// Jump within the current document; carries the decoded fragment
    InPageAnchor(String),
    /// Matched an exclusion rule
    Excluded(String),
    ForeignOrigin,
    MissingHref,
    InvalidHref(String),
}

impl std::fmt::Display for PassThrough {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassThrough::OutsideRegion => write!(f, "outside the navigable region"),
            PassThrough::Placeholder => write!(f, "placeholder link"),
            PassThrough::InPageAnchor(fragment) => write!(f, "in-page anchor '#{}'", fragment),
            PassThrough::Excluded(rule) => write!(f, "excluded by '{}'", rule),
            PassThrough::ForeignOrigin => write!(f, "different origin"),
            PassThrough::MissingHref => write!(f, "no href"),
            PassThrough::InvalidHref(href) => write!(f, "unresolvable href '{}'", href),
        }
    }
}

/// Built-in exclusions plus externally supplied selectors, de-duplicated
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    external: Vec<Selector>,
}

impl ExclusionRules {
    pub fn new(external: &[String]) -> Result<Self, SelectorError> {
        let mut rules: Vec<Selector> = Vec::new();
        for source in external {
            let source = source.trim();
            if source.is_empty()
                || BUILTIN_EXCLUSIONS.contains(&source)
                || rules.iter().any(|rule| rule.as_str() == source)
            {
                continue;
            }
            rules.push(Selector::parse(source)?);
        }
        Ok(Self { external: rules })
    }

    pub fn builtin() -> Self {
        Self { external: Vec::new() }
    }

    /// The first rule matching `element`
    pub fn matching(&self, element: &Element, ancestors: &[&Element]) -> Option<&str> {
        BUILTIN_SELECTORS
            .iter()
            .chain(self.external.iter())
            .find(|rule| rule.matches(element, ancestors))
            .map(Selector::as_str)
    }

    pub fn len(&self) -> usize {
        BUILTIN_SELECTORS.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The interception predicate
#[derive(Debug, Clone)]
pub struct InterceptionPolicy {
    region: Selector,
    rules: ExclusionRules,
}

impl InterceptionPolicy {
    pub fn new(region: Selector, rules: ExclusionRules) -> Self {
        Self { region, rules }
    }

    /// `Some(reason)` when the link keeps default behavior, `None` when it
    /// is intercepted
    pub fn evaluate(&self, document: &Document, page_url: &Url, link: NodeId) -> Option<PassThrough> {
        let (Some(element), Some(ancestors)) = (document.find(link), document.ancestors_of(link)) else {
            return Some(PassThrough::OutsideRegion);
        };
        let reason = self.check(element, &ancestors, page_url);
        if let Some(reason) = &reason {
            debug!("Link {} passes through: {}", link, reason);
        }
        reason
    }

    fn check(&self, element: &Element, ancestors: &[&Element], page_url: &Url) -> Option<PassThrough> {
        if !self.in_region(element, ancestors) {
            return Some(PassThrough::OutsideRegion);
        }

        let href = element.attr("href").map(str::trim);
        if href == Some("#") {
            return Some(PassThrough::Placeholder);
        }

        let target = href.map(|href| page_url.join(href).map_err(|_| href.to_string()));
        if let Some(fragment) = in_page_fragment(href, target.as_ref().and_then(|t| t.as_ref().ok()), page_url) {
            return Some(PassThrough::InPageAnchor(fragment));
        }

        if let Some(rule) = self.rules.matching(element, ancestors) {
            return Some(PassThrough::Excluded(rule.to_string()));
        }

        match target {
            None => Some(PassThrough::MissingHref),
            Some(Err(href)) => Some(PassThrough::InvalidHref(href)),
            Some(Ok(url)) if url.origin() != page_url.origin() => Some(PassThrough::ForeignOrigin),
            Some(Ok(_)) => None,
        }
    }

    fn in_region(&self, element: &Element, ancestors: &[&Element]) -> bool {
        if self.region.matches(element, ancestors) {
            return true;
        }
        (0..ancestors.len()).any(|i| self.region.matches(ancestors[i], &ancestors[..i]))
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }
}

/// Decoded fragment when `href` only moves within the current document
fn in_page_fragment(href: Option<&str>, target: Option<&Url>, page_url: &Url) -> Option<String> {
    let href = href?;
    if let Some(fragment) = href.strip_prefix('#') {
        return Some(decode_fragment(fragment));
    }
    let target = target?;
    let fragment = target.fragment()?;
    let same_document = target.origin() == page_url.origin()
        && target.path() == page_url.path()
        && target.query() == page_url.query();
    same_document.then(|| decode_fragment(fragment))
}

fn decode_fragment(fragment: &str) -> String {
    urlencoding::decode(fragment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| fragment.to_string())
}
