use anyhow::{Context, Result};
use colored::*;
use url::Url;

use page_transitions::browser::{HeadlessViewport, HttpPageFetcher, PageFetcher, capability_header};
use page_transitions::config::Config;
use page_transitions::dom::{Document, NodeId, Selector, Walk};
use page_transitions::navigation::{ExclusionRules, InterceptionPolicy};

use super::CheckCommands;

pub async fn handle_check_command(args: CheckCommands, config: Config) -> Result<()> {
    let page = Url::parse(&args.page).with_context(|| format!("Invalid page URL: {}", args.page))?;
    let policy = InterceptionPolicy::new(
        Selector::parse(&config.selectors.wrapper).context("Invalid wrapper selector")?,
        ExclusionRules::new(&config.interception.exclusions).context("Invalid exclusion selector")?,
    );

    let fetcher = HttpPageFetcher::new(&config.fetch)?;
    let markup = fetcher
        .fetch(&page, &capability_header(&HeadlessViewport::new()))
        .await
        .with_context(|| format!("Failed to load {}", page))?;
    let document = Document::parse(&markup);

    let Some(link) = find_link(&document, &args.href) else {
        anyhow::bail!("No link with href '{}' on {}", args.href, page);
    };

    match policy.evaluate(&document, &page, link) {
        None => println!("{} '{}' is handled in page", "✓".bright_green().bold(), args.href.cyan()),
        Some(reason) => println!(
            "{} '{}' keeps default navigation: {}",
            "↪".yellow().bold(),
            args.href.cyan(),
            reason
        ),
    }
    Ok(())
}

/// First element whose href is exactly `href`
pub fn find_link(document: &Document, href: &str) -> Option<NodeId> {
    let mut found = None;
    document.root().walk(&mut |el, _| {
        if el.attr("href") == Some(href) {
            found = Some(el.id());
            Walk::Stop
        } else {
            Walk::Continue
        }
    });
    found
}
