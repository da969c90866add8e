use std::ops::Range;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::cli::LayoutArgs;

pub const DEFAULT_SITE_ROOT: &str = "https://books.toscrape.com/";

// Its side navigation lists every category, including a self link.
pub const DEFAULT_INDEX_PATH: &str = "catalogue/category/books/crime_51/index.html";

// Header logo, two breadcrumb links, then "Books" and fifty categories in the
// side navigation. Observed on the live layout.
pub const NAV_ANCHOR_COUNT: usize = 54;

pub const CATEGORY_NAV_START: usize = 4;

// "next" on the first page; "previous" and "next" after it.
pub const FIRST_PAGE_TRAILING_ANCHORS: usize = 1;
pub const NEXT_PAGE_TRAILING_ANCHORS: usize = 2;

pub const ITEM_LINK_PREFIX: &str = "../../../";
pub const IMAGE_PATH_PREFIX: &str = "../../";
pub const NEXT_CONTROL_SELECTOR: &str = ".next";
pub const IMAGE_CONTAINER_SELECTOR: &str = ".item.active";

pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = concat!("shelfscrape/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub site_root: Url,
    pub catalogue_base: Url,
    pub nav_anchor_count: usize,
    pub category_nav_start: usize,
    pub first_page_trailing_anchors: usize,
    pub next_page_trailing_anchors: usize,
    pub item_link_prefix: String,
    pub image_path_prefix: String,
    pub next_control_selector: String,
    pub image_container_selector: String,
}

impl SiteLayout {
    pub fn new(site_root: &str) -> anyhow::Result<Self> {
        let mut site_root = Url::parse(site_root).context("parse site root")?;
        if site_root.scheme() != "http" && site_root.scheme() != "https" {
            anyhow::bail!("site root must be http/https: {site_root}");
        }
        if !site_root.path().ends_with('/') {
            let path = format!("{}/", site_root.path());
            site_root.set_path(&path);
        }
        let catalogue_base = site_root
            .join("catalogue/")
            .context("derive catalogue base")?;

        Ok(Self {
            site_root,
            catalogue_base,
            nav_anchor_count: NAV_ANCHOR_COUNT,
            category_nav_start: CATEGORY_NAV_START,
            first_page_trailing_anchors: FIRST_PAGE_TRAILING_ANCHORS,
            next_page_trailing_anchors: NEXT_PAGE_TRAILING_ANCHORS,
            item_link_prefix: ITEM_LINK_PREFIX.to_owned(),
            image_path_prefix: IMAGE_PATH_PREFIX.to_owned(),
            next_control_selector: NEXT_CONTROL_SELECTOR.to_owned(),
            image_container_selector: IMAGE_CONTAINER_SELECTOR.to_owned(),
        })
    }

    pub fn category_nav_range(&self) -> Range<usize> {
        self.category_nav_start..self.nav_anchor_count
    }

    pub fn default_index_url(&self) -> anyhow::Result<Url> {
        self.site_root
            .join(DEFAULT_INDEX_PATH)
            .context("derive default index url")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalLimits {
    pub max_pages: usize,
    pub max_duration: Option<Duration>,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_duration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: SiteLayout,
    pub limits: TraversalLimits,
    pub fetch: FetchConfig,
}

impl Settings {
    pub fn from_args(args: &LayoutArgs) -> anyhow::Result<Self> {
        let mut layout = SiteLayout::new(&args.site_root).context("build site layout")?;
        layout.nav_anchor_count = args.nav_anchor_count;
        if layout.category_nav_start > layout.nav_anchor_count {
            anyhow::bail!(
                "--nav-anchor-count must be at least {}",
                layout.category_nav_start
            );
        }
        if args.max_pages == 0 {
            anyhow::bail!("--max-pages must be positive");
        }

        Ok(Self {
            layout,
            limits: TraversalLimits {
                max_pages: args.max_pages,
                max_duration: args.max_duration_secs.map(Duration::from_secs),
            },
            fetch: FetchConfig {
                timeout: Duration::from_secs(args.timeout_secs.max(1)),
                ..FetchConfig::default()
            },
        })
    }
}
