use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use url::Url;

use crate::formats::{BookRecord, BookSummary, Category};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPaths {
    pub dir: PathBuf,
    pub listing_csv: PathBuf,
    pub books_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl CategoryPaths {
    pub fn new(out_dir: &Path, category_name: &str) -> Self {
        let dir = out_dir.join(category_name);
        Self {
            listing_csv: dir.join(format!("{category_name}.csv")),
            books_dir: dir.join("books"),
            images_dir: dir.join(format!("{category_name}_images")),
            dir,
        }
    }

    pub fn record_path(&self, stem: &str) -> PathBuf {
        self.books_dir.join(format!("{stem}.csv"))
    }

    pub fn image_path(&self, stem: &str) -> PathBuf {
        self.images_dir.join(format!("{stem}.jpg"))
    }
}

// Unique within the list, case-insensitively. A colliding title gets the
// link's slug appended, then a counter.
pub fn file_stems(items: &[BookSummary]) -> Vec<String> {
    let mut taken = HashSet::new();
    items
        .iter()
        .map(|item| {
            let base = sanitize_file_stem(&item.title);
            let with_slug = link_slug(&item.link).map(|slug| format!("{base}_{slug}"));
            let stem = std::iter::once(base.clone())
                .chain(with_slug)
                .chain((2..).map(|n| format!("{base}_{n}")))
                .find(|candidate| !taken.contains(&candidate.to_lowercase()))
                .unwrap_or(base);
            taken.insert(stem.to_lowercase());
            stem
        })
        .collect()
}

fn link_slug(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let slug = url
        .path_segments()?
        .filter(|segment| !segment.is_empty() && *segment != "index.html")
        .next_back()?;
    Some(sanitize_file_stem(slug))
}

pub fn sanitize_file_stem(title: &str) -> String {
    let stem = title
        .trim()
        .chars()
        .map(|ch| match ch {
            ' ' | ':' | '<' | '"' | '>' | '*' | '\\' => '_',
            '/' | '?' | '|' => '-',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect::<String>();
    if stem.is_empty() {
        "untitled".to_owned()
    } else {
        stem
    }
}

pub fn write_category_csv(path: &Path, category: &Category) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create category csv: {}", path.display()))?;
    for summary in &category.items {
        writer
            .serialize(summary)
            .with_context(|| format!("write category row: {}", summary.link))?;
    }
    if category.items.is_empty() {
        writer
            .write_record(["title", "link"])
            .context("write category csv header")?;
    }
    writer
        .flush()
        .with_context(|| format!("flush category csv: {}", path.display()))?;
    Ok(())
}

pub fn read_category_csv(path: &Path) -> anyhow::Result<Vec<BookSummary>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open category csv: {}", path.display()))?;
    reader
        .deserialize()
        .map(|row| row.context("parse category csv row"))
        .collect()
}

pub fn write_book_record(path: &Path, record: &BookRecord) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create book record: {}", path.display()))?;
    writer
        .serialize(record)
        .with_context(|| format!("write book record: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flush book record: {}", path.display()))?;
    Ok(())
}

pub fn read_book_record(path: &Path) -> anyhow::Result<BookRecord> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open book record: {}", path.display()))?;
    match reader.deserialize().next() {
        Some(row) => row.with_context(|| format!("parse book record: {}", path.display())),
        None => anyhow::bail!("book record has no data row: {}", path.display()),
    }
}

pub fn write_image(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes).with_context(|| format!("write image: {}", path.display()))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    let parent_dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("output path must have parent: {}", path.display()))?;
    if parent_dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("create output dir: {}", parent_dir.display()))?;
    Ok(())
}
