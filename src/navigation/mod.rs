//! In-page navigation engine
//!
//! [`NavigationController`] decides whether a link activation is
//! intercepted, picks a [`TransitionStrategy`] and hands the request to
//! [`NavigationLifecycle`], which runs the five transition phases and falls
//! back to a hard navigation when any of them fails.

pub mod controller;
pub mod events;
pub mod lifecycle;
pub mod request;
pub mod rules;
pub mod state;
pub mod strategies;

use crate::dom::SelectorError;

pub use controller::{Activation, NavigationController, NavigationControllerBuilder};
pub use events::{EventBus, NavigationEvent, NavigationEventKind};
pub use lifecycle::{NavigationLifecycle, NavigationOutcome};
pub use request::{NavigationRequest, PageRecord, PageTransferData, TriggerKind};
pub use rules::{ExclusionRules, InterceptionPolicy, PassThrough};
pub use state::{LivePage, NavigationState};
pub use strategies::{
    AutoScrollNext, FlyingImage, General, SelectionContext, StrategySet, TransitionStrategy,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no element matching '{selector}' in {url}")]
    MissingContainer { url: String, selector: String },

    #[error("{url} responded with HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("invalid navigation target '{target}': {reason}")]
    InvalidUrl { target: String, reason: String },

    #[error(transparent)]
    Selector(#[from] SelectorError),
}
