//! Which link activations the engine takes over

mod common;

use common::{Harness, HarnessBuilder, url};
use page_transitions::config::Config;
use page_transitions::dom::{Document, Selector};
use page_transitions::navigation::{
    Activation, ExclusionRules, InterceptionPolicy, NavigationController, PassThrough,
};
use ::url::Url;

fn reason(h: &Harness, html_id: &str) -> Option<PassThrough> {
    h.controller.should_prevent(h.element(html_id))
}

/// Plain same-origin links inside the region are intercepted
#[tokio::test]
async fn test_plain_link_is_intercepted() {
    let h = Harness::boot().await;
    assert_eq!(reason(&h, "to-b"), None);
    assert_eq!(reason(&h, "next-teaser"), None);
}

/// Links outside the wrapper keep default navigation
#[tokio::test]
async fn test_link_outside_region_passes_through() {
    let h = Harness::boot().await;
    assert_eq!(reason(&h, "home"), Some(PassThrough::OutsideRegion));
}

#[tokio::test]
async fn test_placeholder_and_anchor_links() {
    let h = Harness::boot().await;
    assert_eq!(reason(&h, "placeholder"), Some(PassThrough::Placeholder));
    assert_eq!(
        reason(&h, "anchor"),
        Some(PassThrough::InPageAnchor("team".to_string()))
    );
}

/// Built-in exclusions cover opt-outs, new windows and downloads
#[tokio::test]
async fn test_builtin_exclusions() {
    let h = Harness::boot().await;
    assert_eq!(
        reason(&h, "opt-out"),
        Some(PassThrough::Excluded("[data-no-pjax]".to_string()))
    );
    assert_eq!(
        reason(&h, "new-window"),
        Some(PassThrough::Excluded("[target=\"_blank\"]".to_string()))
    );
    assert_eq!(
        reason(&h, "download"),
        Some(PassThrough::Excluded("[download]".to_string()))
    );
    assert_eq!(reason(&h, "foreign"), Some(PassThrough::ForeignOrigin));
}

/// External selectors from the configuration extend the built-ins
#[tokio::test]
async fn test_configured_exclusions() {
    let h = Harness::boot().await;
    assert_eq!(reason(&h, "modal"), None);

    let mut config = Config::instant();
    config.add_exclusion(".modal-open");
    config.add_exclusion(" .modal-open ");
    config.add_exclusion("[data-no-pjax]");
    assert_eq!(config.interception.exclusions.len(), 2);

    let h = HarnessBuilder::new().config(config).boot().await;
    assert_eq!(
        reason(&h, "modal"),
        Some(PassThrough::Excluded(".modal-open".to_string()))
    );
    // The duplicate of a built-in rule adds nothing
    assert_eq!(
        h.controller.policy().rules().len(),
        ExclusionRules::builtin().len() + 1
    );
}

/// Passing through leaves the engine idle and fetches nothing
#[tokio::test]
async fn test_pass_through_activation_does_not_navigate() {
    let h = Harness::boot().await;

    let activation = h.controller.handle_activation(h.element("new-window")).await;

    assert!(matches!(activation, Activation::PassThrough(PassThrough::Excluded(_))));
    assert!(h.fetcher.requests().is_empty());
    assert!(!h.controller.state().is_running());
    assert_eq!(h.controller.state().url().as_str(), url("/a"));
}

/// Same-document links with a fragment are in-page jumps; the fragment is
/// percent-decoded
#[test]
fn test_same_document_fragment_is_decoded() {
    let document = Document::parse(
        r#"<html><body><div id="page-wrapper">
            <a id="same" href="/a#%C3%A9quipe">Équipe</a>
            <a id="other-query" href="/a?lang=fr#team">Team</a>
        </div></body></html>"#,
    );
    let policy = InterceptionPolicy::new(Selector::parse("#page-wrapper").unwrap(), ExclusionRules::builtin());
    let page = Url::parse(&url("/a")).unwrap();

    let same = document.element_by_html_id("same").unwrap().id();
    assert_eq!(
        policy.evaluate(&document, &page, same),
        Some(PassThrough::InPageAnchor("équipe".to_string()))
    );

    // A different query is a different document
    let other = document.element_by_html_id("other-query").unwrap().id();
    assert_eq!(policy.evaluate(&document, &page, other), None);
}

/// Exclusion rules that do not parse are rejected when building
#[test]
fn test_invalid_exclusion_fails_build() {
    let mut config = Config::instant();
    config.add_exclusion("a[href");
    assert!(NavigationController::builder(config).build().is_err());
}
