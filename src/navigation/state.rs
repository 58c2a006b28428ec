//! Shared navigation state
//!
//! One instance per controller. The flags are atomics; the live page sits
//! behind a mutex that is never held across an await.

use log::debug;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

use crate::dom::{Document, Element, NodeId};
use crate::util::lock;

/// The page currently shown in the window
#[derive(Debug, Clone)]
pub struct LivePage {
    pub url: Url,
    pub document: Document,
    pub container: Option<NodeId>,
    pub content: Option<NodeId>,
    /// Transitional elements appended to the body for the running transition
    pub fixtures: Vec<NodeId>,
}

#[derive(Debug)]
pub struct NavigationState {
    running: AtomicBool,
    seamless: AtomicBool,
    page: Mutex<LivePage>,
}

impl NavigationState {
    pub fn new(url: Url, document: Document) -> Self {
        Self {
            running: AtomicBool::new(false),
            seamless: AtomicBool::new(false),
            page: Mutex::new(LivePage {
                url,
                document,
                container: None,
                content: None,
                fixtures: Vec::new(),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_seamless(&self) -> bool {
        self.seamless.load(Ordering::SeqCst)
    }

    /// Claim the running flag; false when a navigation is already running
    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn set_seamless(&self, seamless: bool) {
        self.seamless.store(seamless, Ordering::SeqCst);
    }

    /// Clear both flags
    pub fn finish(&self) {
        self.seamless.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    /// Replace the whole page (initial load)
    pub fn load_page(&self, url: Url, document: Document, container: Option<NodeId>, content: Option<NodeId>) {
        let mut page = lock(&self.page);
        *page = LivePage {
            url,
            document,
            container,
            content,
            fixtures: Vec::new(),
        };
    }

    /// Point the container/content references at the next page.
    /// Returns the previous container.
    pub fn swap_references(&self, url: Url, container: NodeId, content: Option<NodeId>) -> Option<NodeId> {
        let mut page = lock(&self.page);
        debug!("Swapping references to {} ({})", container, url);
        page.url = url;
        page.content = content.or(Some(container));
        page.container.replace(container)
    }

    /// Mount `next` right after the current container, or at the end of the
    /// body when there is none
    pub fn mount_after_container(&self, next: Element) {
        let mut page = lock(&self.page);
        let current = page.container;
        let next = match current {
            Some(current) => match page.document.insert_after(current, next) {
                Ok(()) => return,
                Err(next) => next,
            },
            None => next,
        };
        page.document.append_to_body(next);
    }

    pub fn remove_element(&self, id: NodeId) -> Option<Element> {
        lock(&self.page).document.remove(id)
    }

    pub fn set_title(&self, title: &str) {
        lock(&self.page).document.set_title(title);
    }

    pub fn add_fixture(&self, fixture: Element) -> NodeId {
        let mut page = lock(&self.page);
        let id = fixture.id();
        page.document.append_to_body(fixture);
        page.fixtures.push(id);
        id
    }

    /// Snapshots of the mounted fixtures
    pub fn fixtures(&self) -> Vec<Element> {
        let page = lock(&self.page);
        page.fixtures
            .iter()
            .filter_map(|id| page.document.find(*id).cloned())
            .collect()
    }

    pub fn remove_fixtures(&self) -> usize {
        let mut page = lock(&self.page);
        let ids: Vec<NodeId> = page.fixtures.drain(..).collect();
        ids.into_iter()
            .filter(|id| page.document.remove(*id).is_some())
            .count()
    }

    pub fn with_page<R>(&self, f: impl FnOnce(&LivePage) -> R) -> R {
        f(&lock(&self.page))
    }

    pub fn url(&self) -> Url {
        lock(&self.page).url.clone()
    }

    pub fn container(&self) -> Option<NodeId> {
        lock(&self.page).container
    }

    pub fn content(&self) -> Option<NodeId> {
        lock(&self.page).content
    }

    /// Snapshot of the live container
    pub fn container_element(&self) -> Option<Element> {
        let page = lock(&self.page);
        page.document.find(page.container?).cloned()
    }

    pub fn document_html(&self) -> String {
        lock(&self.page).document.to_html()
    }
}
