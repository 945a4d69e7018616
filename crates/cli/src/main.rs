//! Command-line tooling for site definitions.
//!
//! `validate` checks an SDD file offline; `render` runs the extraction engine
//! against a saved page or the live site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sitefeed_client::{FeedEngine, FetchDefaults, FetchPlan, PageSource};
use sitefeed_core::sdd::{SiteDefinition, parse_sdd};
use sitefeed_core::store::compute_url_key;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { sdd } => cmd_validate(&sdd),
        Commands::Render { sdd, html, output, records } => {
            cmd_render(&sdd, html.as_deref(), output.as_deref(), records).await
        }
    }
}

fn load_sdd(path: &Path) -> Result<SiteDefinition> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let sdd = parse_sdd(&text).with_context(|| format!("validating {}", path.display()))?;
    Ok(sdd)
}

fn cmd_validate(path: &Path) -> Result<()> {
    let sdd = load_sdd(path)?;
    print!("{}", summarize(&sdd));
    Ok(())
}

fn summarize(sdd: &SiteDefinition) -> String {
    let key = compute_url_key(&sdd.url).unwrap_or_else(|_| "-".into());
    let fields: Vec<&str> = sdd.fields.keys().map(String::as_str).collect();

    let mut out = String::from("SDD is valid\n");
    out.push_str(&format!("  Title:    {}\n", sdd.title));
    out.push_str(&format!("  URL:      {}\n", sdd.url));
    out.push_str(&format!("  Key:      {key}\n"));
    out.push_str(&format!("  Fetch:    {:?}\n", sdd.fetch.strategy));
    out.push_str(&format!("  Items:    {}\n", sdd.item_list.selector.css));
    out.push_str(&format!("  Fields:   {}\n", fields.join(", ")));
    if !sdd.page_metadata.is_empty() {
        let meta: Vec<&str> = sdd.page_metadata.keys().map(String::as_str).collect();
        out.push_str(&format!("  Metadata: {}\n", meta.join(", ")));
    }
    out
}

async fn cmd_render(sdd_path: &Path, html: Option<&Path>, output: Option<&Path>, records: bool) -> Result<()> {
    let sdd = load_sdd(sdd_path)?;

    let html = match html {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => fetch_live(&sdd).await?,
    };

    let engine = FeedEngine::new(&sdd);
    let rendered = if records {
        let mut json = serde_json::to_string_pretty(&engine.extract_records(&html))?;
        json.push('\n');
        json
    } else {
        engine.run(&html)
    };

    match output {
        Some(path) => {
            fs::write(path, &rendered).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

async fn fetch_live(sdd: &SiteDefinition) -> Result<String> {
    let config = sitefeed_core::AppConfig::load().context("loading configuration")?;
    let plan = FetchPlan::resolve(sdd, &FetchDefaults::from(&config))?;

    #[allow(unused_mut)]
    let mut acquirer = sitefeed_client::Acquirer::from_config(&config)?;

    #[cfg(feature = "render")]
    {
        if plan.strategy == sitefeed_core::sdd::FetchStrategy::Headless {
            let renderer = sitefeed_client::HeadlessRenderer::new().await.context("launching headless browser")?;
            acquirer = acquirer.with_renderer(std::sync::Arc::new(renderer));
        }
    }

    tracing::info!(url = %plan.url, "fetching page");
    let html = acquirer.fetch_page(&plan).await?;
    Ok(html)
}
