use url::Url;

use crate::dom::{Document, Element, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// User activated a link
    Click,
    Programmatic,
    /// Scrolled to the end of the page onto the next-page teaser
    Auto,
    /// Back/forward; no history entry is pushed
    History,
}

/// One navigation attempt. Immutable once the lifecycle starts.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    /// Snapshot of the activated element
    pub trigger: Option<Element>,
    pub url: Url,
    pub strategy: String,
    pub kind: TriggerKind,
    pub scroll_offset: Option<u32>,
    pub correlation_id: String,
}

impl NavigationRequest {
    pub fn new(url: Url, kind: TriggerKind) -> Self {
        Self {
            trigger: None,
            url,
            strategy: String::new(),
            kind,
            scroll_offset: None,
            correlation_id: String::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: Option<Element>) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_scroll_offset(mut self, offset: u32) -> Self {
        self.scroll_offset = Some(offset);
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}

/// Markup and resolved regions of one side of a transition
#[derive(Debug, Clone, Default)]
pub struct PageRecord {
    pub html: String,
    pub dom: Option<Document>,
    pub container: Option<NodeId>,
    pub content: Option<NodeId>,
}

impl PageRecord {
    pub fn container_element(&self) -> Option<&Element> {
        self.dom.as_ref()?.find(self.container?)
    }

    /// Detach the container from the parsed document for mounting elsewhere
    pub fn take_container(&mut self) -> Option<Element> {
        let id = self.container?;
        self.dom.as_mut()?.remove(id)
    }
}

/// Working record threaded through the phases
#[derive(Debug, Clone)]
pub struct PageTransferData {
    pub request: NavigationRequest,
    pub current: PageRecord,
    pub next: PageRecord,
    /// Live container being replaced
    pub outgoing: Option<NodeId>,
}

impl PageTransferData {
    pub fn new(request: NavigationRequest) -> Self {
        Self {
            request,
            current: PageRecord::default(),
            next: PageRecord::default(),
            outgoing: None,
        }
    }

    pub fn url(&self) -> &str {
        self.request.url.as_str()
    }

    pub fn strategy(&self) -> &str {
        &self.request.strategy
    }
}
