use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cli::{BookArgs, BooksArgs, CategoryArgs, CrawlArgs};
use crate::config::Settings;
use crate::detail::DetailExtractor;
use crate::discover::discover;
use crate::fetch::{Fetch, HttpFetcher, Resource, fetch_page};
use crate::formats::{BookRecord, BookSummary, Category, CrawlOutcome, OutcomeStatus};
use crate::paginate::CategoryPaginator;
use crate::store::{self, CategoryPaths};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub categories: usize,
    pub categories_failed: usize,
    pub books_complete: usize,
    pub books_partial: usize,
    pub books_failed: usize,
}

impl CrawlSummary {
    fn record(&mut self, outcome: &CrawlOutcome) {
        match outcome.status {
            OutcomeStatus::Complete => self.books_complete += 1,
            OutcomeStatus::Partial => self.books_partial += 1,
            OutcomeStatus::Failed => self.books_failed += 1,
        }
    }
}

pub struct Scraper<'a> {
    fetcher: &'a dyn Fetch,
    paginator: CategoryPaginator<'a>,
    extractor: DetailExtractor,
    cancel: CancellationToken,
}

impl<'a> Scraper<'a> {
    pub fn new(
        fetcher: &'a dyn Fetch,
        settings: &'a Settings,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        let paginator = CategoryPaginator::new(
            fetcher,
            &settings.layout,
            settings.limits.clone(),
            cancel.clone(),
        )
        .context("build category paginator")?;
        let extractor = DetailExtractor::new(&settings.layout).context("build detail extractor")?;
        Ok(Self {
            fetcher,
            paginator,
            extractor,
            cancel,
        })
    }

    pub fn collect_category(
        &self,
        entry_url: &Url,
        out_dir: &Path,
    ) -> anyhow::Result<(Category, CategoryPaths)> {
        let category = self
            .paginator
            .traverse(entry_url)
            .with_context(|| format!("traverse category {entry_url}"))?;
        let paths = CategoryPaths::new(out_dir, &category.name);
        store::write_category_csv(&paths.listing_csv, &category)?;
        Ok((category, paths))
    }

    pub fn extract_book(&self, summary: &BookSummary) -> anyhow::Result<BookRecord> {
        if self.cancel.is_cancelled() {
            anyhow::bail!("cancelled before fetching {}", summary.link);
        }
        let url = Url::parse(&summary.link)
            .with_context(|| format!("parse book link: {}", summary.link))?;
        let page = fetch_page(self.fetcher, &url)?;
        let record = self
            .extractor
            .extract(&page.document, &summary.title, &page.url)?;
        Ok(record)
    }

    pub fn scrape_book(
        &self,
        summary: &BookSummary,
        stem: &str,
        category: &str,
        paths: &CategoryPaths,
        download_images: bool,
    ) -> CrawlOutcome {
        let mut outcome = CrawlOutcome {
            category: category.to_owned(),
            title: summary.title.clone(),
            url: summary.link.clone(),
            status: OutcomeStatus::Failed,
            substituted: Vec::new(),
            error: None,
            record_path: None,
            image_path: None,
            finished_at: String::new(),
        };

        if let Err(err) = self.save_book(summary, stem, paths, download_images, &mut outcome) {
            tracing::error!(url = %summary.link, "book failed: {err:#}");
            outcome.status = OutcomeStatus::Failed;
            outcome.error = Some(format!("{err:#}"));
        }

        outcome.finished_at = chrono::Utc::now().to_rfc3339();
        outcome
    }

    fn save_book(
        &self,
        summary: &BookSummary,
        stem: &str,
        paths: &CategoryPaths,
        download_images: bool,
        outcome: &mut CrawlOutcome,
    ) -> anyhow::Result<()> {
        let record = self.extract_book(summary)?;

        let record_path = paths.record_path(stem);
        store::write_book_record(&record_path, &record)?;
        outcome.record_path = Some(record_path.to_string_lossy().to_string());
        outcome.substituted = record.substitutions().iter().map(|s| s.field).collect();
        outcome.status = if record.is_partial() {
            OutcomeStatus::Partial
        } else {
            OutcomeStatus::Complete
        };

        if download_images {
            let image_path = paths.image_path(stem);
            self.save_image(&record, &image_path)?;
            outcome.image_path = Some(image_path.to_string_lossy().to_string());
        }
        Ok(())
    }

    fn scrape_items(
        &self,
        category: &str,
        items: &[BookSummary],
        paths: &CategoryPaths,
        download_images: bool,
        log: &mut OutcomeLog,
        summary: &mut CrawlSummary,
    ) -> anyhow::Result<()> {
        let stems = store::file_stems(items);
        for (item, stem) in items.iter().zip(&stems) {
            if self.cancel.is_cancelled() {
                tracing::warn!(category, "cancelled; skipping remaining books");
                break;
            }
            let outcome = self.scrape_book(item, stem, category, paths, download_images);
            summary.record(&outcome);
            log.append(&outcome)?;
        }
        Ok(())
    }

    // An existing file is left alone so an interrupted run can resume.
    pub fn save_image(&self, record: &BookRecord, path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            tracing::debug!(path = %path.display(), "image already saved");
            return Ok(());
        }
        let url = Url::parse(&record.image_url)
            .with_context(|| format!("parse image url: {}", record.image_url))?;
        let bytes = self.fetcher.fetch(&url, Resource::Image)?;
        store::write_image(path, &bytes)
    }
}

struct OutcomeLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OutcomeLog {
    fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open crawl log: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn append(&mut self, outcome: &CrawlOutcome) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, outcome).context("write crawl outcome json")?;
        self.writer
            .write_all(b"\n")
            .context("write crawl outcome newline")?;
        Ok(())
    }

    fn finish(mut self) -> anyhow::Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("flush crawl log: {}", self.path.display()))
    }
}

pub fn crawl_site(
    fetcher: &dyn Fetch,
    settings: &Settings,
    index_url: &Url,
    out_dir: &Path,
    download_images: bool,
    cancel: CancellationToken,
) -> anyhow::Result<CrawlSummary> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;
    let scraper = Scraper::new(fetcher, settings, cancel.clone())?;

    let index = fetch_page(fetcher, index_url).context("fetch category index")?;
    let entries = discover(&index.document, &index.url, &settings.layout);
    if entries.is_empty() {
        anyhow::bail!("no categories found on {index_url}");
    }
    tracing::info!(categories = entries.len(), "discovered categories");

    let mut log = OutcomeLog::open(&out_dir.join("crawl.jsonl"))?;
    let mut summary = CrawlSummary::default();

    for entry_url in entries {
        if cancel.is_cancelled() {
            tracing::warn!("cancelled; skipping remaining categories");
            break;
        }
        summary.categories += 1;

        let (category, paths) = match scraper.collect_category(&entry_url, out_dir) {
            Ok(collected) => collected,
            Err(err) => {
                tracing::error!(url = %entry_url, "category failed: {err:#}");
                summary.categories_failed += 1;
                continue;
            }
        };

        scraper.scrape_items(
            &category.name,
            &category.items,
            &paths,
            download_images,
            &mut log,
            &mut summary,
        )?;
    }

    log.finish()?;
    tracing::info!(
        categories = summary.categories,
        categories_failed = summary.categories_failed,
        complete = summary.books_complete,
        partial = summary.books_partial,
        failed = summary.books_failed,
        "crawl finished"
    );
    Ok(summary)
}

pub fn run(args: CrawlArgs, cancel: CancellationToken) -> anyhow::Result<()> {
    let settings = Settings::from_args(&args.layout)?;
    let fetcher = HttpFetcher::new(&settings.fetch)?;
    let index_url = match args.index_url.as_deref() {
        Some(url) => Url::parse(url).context("parse --index-url")?,
        None => settings.layout.default_index_url()?,
    };

    let summary = crawl_site(
        &fetcher,
        &settings,
        &index_url,
        Path::new(&args.out),
        !args.skip_images,
        cancel,
    )?;
    if summary.categories > 0 && summary.categories_failed == summary.categories {
        anyhow::bail!("every category failed ({})", summary.categories);
    }
    Ok(())
}

pub fn run_category(args: CategoryArgs, cancel: CancellationToken) -> anyhow::Result<()> {
    let settings = Settings::from_args(&args.layout)?;
    let fetcher = HttpFetcher::new(&settings.fetch)?;
    let entry_url = Url::parse(&args.url).context("parse --url")?;

    let scraper = Scraper::new(&fetcher, &settings, cancel)?;
    let (category, paths) = scraper.collect_category(&entry_url, Path::new(&args.out))?;
    tracing::info!(
        category = %category.name,
        items = category.items.len(),
        csv = %paths.listing_csv.display(),
        "category saved"
    );
    Ok(())
}

pub fn run_book(args: BookArgs, cancel: CancellationToken) -> anyhow::Result<()> {
    let settings = Settings::from_args(&args.layout)?;
    let fetcher = HttpFetcher::new(&settings.fetch)?;
    let scraper = Scraper::new(&fetcher, &settings, cancel)?;

    let summary = BookSummary {
        title: args.title,
        link: args.url,
    };
    let record = scraper.extract_book(&summary)?;
    for substitution in record.substitutions() {
        tracing::warn!(
            field = substitution.field.name(),
            reason = %substitution.reason,
            "field substituted"
        );
    }

    let out = Path::new(&args.out);
    store::write_book_record(out, &record)?;
    if let Some(image) = args.image.as_deref() {
        scraper.save_image(&record, Path::new(image))?;
    }
    tracing::info!(out = %out.display(), "book saved");
    Ok(())
}

pub fn run_books(args: BooksArgs, cancel: CancellationToken) -> anyhow::Result<()> {
    let settings = Settings::from_args(&args.layout)?;
    let fetcher = HttpFetcher::new(&settings.fetch)?;
    let scraper = Scraper::new(&fetcher, &settings, cancel)?;

    let listing = Path::new(&args.category_csv);
    let category = listing
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow::anyhow!("category csv needs a file name: {}", listing.display()))?
        .to_owned();
    let items = store::read_category_csv(listing)?;

    let out_dir = Path::new(&args.out);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;
    let paths = CategoryPaths::new(out_dir, &category);
    let mut log = OutcomeLog::open(&out_dir.join("crawl.jsonl"))?;
    let mut summary = CrawlSummary::default();

    scraper.scrape_items(
        &category,
        &items,
        &paths,
        !args.skip_images,
        &mut log,
        &mut summary,
    )?;
    log.finish()?;

    tracing::info!(
        category = %category,
        complete = summary.books_complete,
        partial = summary.books_partial,
        failed = summary.books_failed,
        "books finished"
    );
    Ok(())
}
