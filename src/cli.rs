use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_MAX_PAGES, DEFAULT_SITE_ROOT, DEFAULT_TIMEOUT_SECS, NAV_ANCHOR_COUNT};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover every category, then scrape all of their books.
    Crawl(CrawlArgs),
    /// Traverse one category and write its title/link CSV.
    Category(CategoryArgs),
    /// Extract one book detail page into a record CSV.
    Book(BookArgs),
    /// Scrape every book listed in a category CSV.
    Books(BooksArgs),
}

/// Site layout and traversal bounds shared by every command.
#[derive(Debug, Clone, Args)]
pub struct LayoutArgs {
    /// Site root that relative catalogue links are rewritten onto.
    #[arg(long, default_value = DEFAULT_SITE_ROOT)]
    pub site_root: String,

    /// Anchors preceding the first item link on a category page.
    #[arg(long, default_value_t = NAV_ANCHOR_COUNT)]
    pub nav_anchor_count: usize,

    /// Maximum listing pages per category.
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Optional wall-clock budget per category traversal.
    #[arg(long)]
    pub max_duration_secs: Option<u64>,

    /// Per-request timeout.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Output directory (one subdirectory per category plus `crawl.jsonl`).
    #[arg(long)]
    pub out: String,

    /// Category page whose side navigation lists every category.
    /// Defaults to the last category under `--site-root`.
    #[arg(long)]
    pub index_url: Option<String>,

    /// Write records only; do not download cover images.
    #[arg(long)]
    pub skip_images: bool,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

#[derive(Debug, Args)]
pub struct CategoryArgs {
    /// Entry page of the category (must be http/https).
    #[arg(long)]
    pub url: String,

    /// Output directory; the CSV lands in `<out>/<Category>/<Category>.csv`.
    #[arg(long)]
    pub out: String,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

#[derive(Debug, Args)]
pub struct BookArgs {
    /// Book detail page URL.
    #[arg(long)]
    pub url: String,

    /// Title as listed on the category page.
    #[arg(long)]
    pub title: String,

    /// Output CSV path.
    #[arg(long)]
    pub out: String,

    /// Also download the cover image to this path.
    #[arg(long)]
    pub image: Option<String>,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

#[derive(Debug, Args)]
pub struct BooksArgs {
    /// Category CSV written by `category` (title,link rows).
    #[arg(long)]
    pub category_csv: String,

    /// Output directory.
    #[arg(long)]
    pub out: String,

    /// Write records only; do not download cover images.
    #[arg(long)]
    pub skip_images: bool,

    #[command(flatten)]
    pub layout: LayoutArgs,
}
