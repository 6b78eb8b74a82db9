use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use flagsum_core::config::{Settings, mask_secret};
use flagsum_core::publish::{PublishOptions, PublishStatus, preview_summary, publish_summary};

#[derive(Debug, Parser)]
#[command(
    name = "flagsum",
    version,
    about = "Publishes a feature flag summary table to a Confluence page"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Fetch flags and update the summary page")]
    Publish(PublishArgs),
    #[command(about = "Fetch flags and print the rendered table without updating the wiki")]
    Preview,
    #[command(about = "Show the resolved configuration with secrets masked")]
    Check,
}

#[derive(Debug, Args)]
struct PublishArgs {
    #[arg(long, help = "Resolve the target page but skip the update call")]
    dry_run: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Publish(args)) => run_publish(args),
        Some(Commands::Preview) => run_preview(),
        Some(Commands::Check) => run_check(),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_publish(args: PublishArgs) -> Result<()> {
    let settings = Settings::from_env()?;
    let report = publish_summary(&settings, &PublishOptions { dry_run: args.dry_run })?;

    match report.status {
        PublishStatus::Updated => {
            if let Some(url) = report.page_url.as_deref() {
                println!("Confluence page updated: {url}");
            }
        }
        PublishStatus::PageNotFound => {
            println!(
                "Couldn't find page with title \"{}\" in Confluence space {}",
                report.page_title, report.space_key
            );
        }
        PublishStatus::SkippedDryRun => {
            println!("Dry run: resolved the target page, update skipped");
        }
    }
    println!("status: {}", report.status.as_str());
    println!("flags: {}", report.flag_count);
    println!("page_title: {}", report.page_title);
    println!("space_key: {}", report.space_key);
    println!("page_id: {}", report.page_id.as_deref().unwrap_or("<none>"));
    println!("page_version: {}", format_version(report.page_version));
    println!("requests: {}", report.request_count);

    Ok(())
}

fn run_preview() -> Result<()> {
    let settings = Settings::from_env()?;
    let report = preview_summary(&settings)?;

    println!("flags: {}", report.flag_count);
    println!("requests: {}", report.request_count);
    println!();
    println!("{}", report.table);

    Ok(())
}

fn run_check() -> Result<()> {
    let settings = Settings::from_env()?;

    println!("flagsum configuration");
    println!("flag_project_key: {}", settings.flag_project_key);
    println!("flag_environment: {}", settings.flag_environment);
    println!("flag_base_url: {}", settings.flag_base_url);
    println!("flag_api_key: {}", mask_secret(&settings.flag_api_key));
    println!("wiki_base_url: {}", settings.wiki_base_url);
    println!("wiki_space_key: {}", settings.wiki_space_key);
    println!("wiki_username: {}", settings.wiki_username);
    println!("wiki_api_key: {}", mask_secret(&settings.wiki_api_key));
    println!("page_title: {}", settings.page_title);
    println!("timeout_ms: {}", settings.timeout_ms);
    println!("user_agent: {}", settings.user_agent);

    Ok(())
}

fn format_version(version: Option<i64>) -> String {
    match version {
        Some(number) => number.to_string(),
        None => "<none>".to_string(),
    }
}
