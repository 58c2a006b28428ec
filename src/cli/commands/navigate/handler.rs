use anyhow::{Context, Result};
use colored::*;
use log::info;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use page_transitions::browser::{HeadlessViewport, HttpPageFetcher, PageFetcher, ViewportCall, capability_header};
use page_transitions::components::{Inert, Storage};
use page_transitions::config::{Config, EffectConfig};
use page_transitions::navigation::{Activation, NavigationController, NavigationOutcome};

use super::NavigateCommands;
use crate::cli::commands::check::find_link;

pub async fn handle_navigate_command(args: NavigateCommands, mut config: Config) -> Result<()> {
    if args.instant {
        config.effects = EffectConfig::instant();
    }
    let from = Url::parse(&args.from).with_context(|| format!("Invalid page URL: {}", args.from))?;

    let viewport = Arc::new(HeadlessViewport::new());
    let fetcher = Arc::new(HttpPageFetcher::new(&config.fetch)?);

    let component_names: Vec<String> = config.components.keys().cloned().collect();
    let mut builder = NavigationController::builder(config)
        .fetcher(fetcher.clone())
        .viewport(viewport.clone());
    for name in &component_names {
        builder = builder.component(name, Inert::factory());
    }
    let controller = builder.build()?;

    println!("🌐 Booting {}", from.as_str().cyan());
    let markup = fetcher
        .fetch(&from, &capability_header(viewport.as_ref()))
        .await
        .with_context(|| format!("Failed to load {}", from))?;
    controller.boot(from.as_str(), &markup).await?;
    println!(
        "   {} persistent, {} disposable component(s)",
        controller.registry().persistent_count(),
        controller.registry().disposable_count()
    );

    let mut events = controller.subscribe();
    let started = Instant::now();
    let activation = if args.click {
        let link = controller
            .state()
            .with_page(|page| find_link(&page.document, &args.to))
            .with_context(|| format!("No link with href '{}' on {}", args.to, from))?;
        controller.handle_activation(link).await
    } else {
        controller.navigate(&args.to).await?
    };
    let elapsed = started.elapsed();

    while let Ok(event) = events.try_recv() {
        println!("   {} {:?}", "•".dimmed(), event.kind);
    }

    match activation {
        Activation::PassThrough(reason) => {
            println!("{} Not intercepted: {}", "↪".yellow().bold(), reason);
        }
        Activation::Busy => {
            println!("{} Another navigation is running", "✗".bright_red().bold());
        }
        Activation::Navigated(NavigationOutcome::Completed) => {
            println!(
                "{} Navigated to {} in {:.2}ms",
                "✓".bright_green().bold(),
                controller.state().url().as_str().cyan(),
                elapsed.as_secs_f64() * 1000.0
            );
            let pushed = viewport
                .calls()
                .into_iter()
                .filter(|call| matches!(call, ViewportCall::PushHistory(_)))
                .count();
            println!(
                "   {} history entr{} pushed, components now: {}",
                pushed,
                if pushed == 1 { "y" } else { "ies" },
                controller.registry().live_names(Storage::Disposable).join(", ")
            );
        }
        Activation::Navigated(NavigationOutcome::FellBack { url, reason }) => {
            println!("{} Fell back to hard navigation: {}", "✗".bright_red().bold(), url.as_str().cyan());
            println!("   {}", reason.red());
        }
    }

    if args.stats {
        let snapshot = controller.metrics().snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    info!("Navigate command finished");
    Ok(())
}
