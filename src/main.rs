use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    shelfscrape::logging::init().context("init logging")?;

    let cli = shelfscrape::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; finishing current request");
                cancel.cancel();
            }
        }
    });

    tokio::task::spawn_blocking(move || match cli.command {
        shelfscrape::cli::Command::Crawl(args) => {
            shelfscrape::crawl::run(args, cancel).context("crawl")
        }
        shelfscrape::cli::Command::Category(args) => {
            shelfscrape::crawl::run_category(args, cancel).context("category")
        }
        shelfscrape::cli::Command::Book(args) => {
            shelfscrape::crawl::run_book(args, cancel).context("book")
        }
        shelfscrape::cli::Command::Books(args) => {
            shelfscrape::crawl::run_books(args, cancel).context("books")
        }
    })
    .await
    .context("join scraper task")??;

    Ok(())
}
