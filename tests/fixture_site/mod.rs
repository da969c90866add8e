use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

pub const MYSTERY_ENTRY: &str = "catalogue/category/books/mystery_3/index.html";
pub const POETRY_ENTRY: &str = "catalogue/category/books/poetry_23/index.html";
pub const COVER_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct FixtureBook {
    pub slug: String,
    pub title: String,
    pub category_slug: &'static str,
    pub category: &'static str,
    pub upc: String,
    pub price: String,
    pub available: usize,
    pub reviews: usize,
    pub description: String,
}

pub fn mystery_books() -> Vec<FixtureBook> {
    (1..=25)
        .map(|n| FixtureBook {
            slug: format!("mystery-book-{n:02}_{}", 900 + n),
            title: format!("Mystery Book {n:02}"),
            category_slug: "mystery_3",
            category: "Mystery",
            upc: format!("{:016x}", 0xa000 + n),
            price: format!("{}.{:02}", 10 + n, (n * 7) % 100),
            available: n,
            reviews: n % 3,
            description: format!("Case number {n} keeps the detective up at night."),
        })
        .collect()
}

pub fn poetry_books() -> Vec<FixtureBook> {
    [
        ("olio_984", "Olio: Poems"),
        ("the-black-maria_991", "The Black Maria"),
        ("shakespeares-sonnets_989", "Shakespeare's Sonnets"),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (slug, title))| FixtureBook {
        slug: slug.to_owned(),
        title: title.to_owned(),
        category_slug: "poetry_23",
        category: "Poetry",
        upc: format!("{:016x}", 0xb000 + index),
        price: format!("{}.50", 40 + index),
        available: 3,
        reviews: 0,
        description: format!("Verses collected in {title}."),
    })
    .collect()
}

pub struct FixtureSite {
    pub base_url: String,
    accepts: Arc<Mutex<Vec<(String, String)>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FixtureSite {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start fixture site");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let accepts = Arc::new(Mutex::new(Vec::new()));

        let handle = thread::spawn({
            let accepts = Arc::clone(&accepts);
            move || {
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }

                    let request = match server.recv_timeout(Duration::from_millis(50)) {
                        Ok(Some(req)) => req,
                        Ok(None) => continue,
                        Err(_) => break,
                    };

                    let path = request.url().split('?').next().unwrap_or_default().to_owned();
                    let accept = request
                        .headers()
                        .iter()
                        .find(|header| header.field.equiv("Accept"))
                        .map(|header| header.value.as_str().to_owned())
                        .unwrap_or_default();
                    accepts
                        .lock()
                        .expect("lock accepts")
                        .push((path.trim_start_matches('/').to_owned(), accept));
                    let Some((content_type, body)) = route(&path) else {
                        let _ = request.respond(
                            tiny_http::Response::from_string("not found").with_status_code(404),
                        );
                        continue;
                    };

                    let header =
                        tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                            .expect("build header");
                    let _ = request.respond(
                        tiny_http::Response::from_data(body)
                            .with_status_code(200)
                            .with_header(header),
                    );
                }
            }
        });

        Self {
            base_url,
            accepts,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[allow(dead_code)]
    pub fn accept_sent_for(&self, path: &str) -> Option<String> {
        self.accepts
            .lock()
            .expect("lock accepts")
            .iter()
            .find(|(requested, _)| requested == path)
            .map(|(_, accept)| accept.clone())
    }
}

impl Drop for FixtureSite {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn route(path: &str) -> Option<(&'static str, Vec<u8>)> {
    const HTML: &str = "text/html; charset=utf-8";

    let path = path.trim_start_matches('/');
    if path == MYSTERY_ENTRY {
        let books = mystery_books();
        let page = listing("Mystery", &books[..PAGE_SIZE], Pager::First("page-2.html"));
        return Some((HTML, page.into_bytes()));
    }
    if path == "catalogue/category/books/mystery_3/page-2.html" {
        let books = mystery_books();
        let page = listing("Mystery", &books[PAGE_SIZE..], Pager::Last("index.html"));
        return Some((HTML, page.into_bytes()));
    }
    if path == POETRY_ENTRY {
        return Some((HTML, listing("Poetry", &poetry_books(), Pager::None).into_bytes()));
    }

    let known = |slug: &str| {
        mystery_books()
            .into_iter()
            .chain(poetry_books())
            .find(|book| book.slug == slug)
    };
    if let Some(slug) = path
        .strip_prefix("media/cache/")
        .and_then(|rest| rest.strip_suffix(".jpg"))
    {
        return known(slug).map(|_| ("image/jpeg", COVER_BYTES.to_vec()));
    }
    let slug = path.strip_prefix("catalogue/")?.strip_suffix("/index.html")?;
    known(slug).map(|book| (HTML, detail(&book).into_bytes()))
}

enum Pager {
    None,
    First(&'static str),
    Last(&'static str),
}

fn listing(category: &str, books: &[FixtureBook], pager: Pager) -> String {
    let side_nav = (0..50)
        .map(|index| {
            let (slug, name) = if index % 2 == 0 {
                ("mystery_3", "Mystery")
            } else {
                ("poetry_23", "Poetry")
            };
            format!(r#"<li><a href="../{slug}/index.html">{name}</a></li>"#)
        })
        .collect::<String>();

    let articles = books
        .iter()
        .map(|book| {
            format!(
                r#"<li><article class="product_pod">
  <div class="image_container"><a href="../../../{slug}/index.html"><img src="../../../../media/cache/{slug}.jpg" alt="{title}" class="thumbnail"></a></div>
  <p class="star-rating Three"><i class="icon-star"></i></p>
  <h3><a href="../../../{slug}/index.html" title="{title}">{title}</a></h3>
  <div class="product_price"><p class="price_color">£{price}</p><form><button type="submit">Add to basket</button></form></div>
</article></li>"#,
                slug = book.slug,
                title = book.title,
                price = book.price,
            )
        })
        .collect::<String>();

    let pager = match pager {
        Pager::None => String::new(),
        Pager::First(next) => format!(
            r#"<ul class="pager"><li class="current">Page 1 of 2</li><li class="next"><a href="{next}">next</a></li></ul>"#
        ),
        Pager::Last(previous) => format!(
            r#"<ul class="pager"><li class="previous"><a href="{previous}">previous</a></li><li class="current">Page 2 of 2</li></ul>"#
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en-us">
<head><title>{category} | Books to Scrape - Sandbox</title></head>
<body id="default" class="default">
<header class="header container-fluid"><div class="page_inner"><div class="row">
  <div class="col-sm-8 h1"><a href="../../../../index.html">Books to Scrape</a><small> We love being scraped!</small></div>
</div></div></header>
<div class="container-fluid page"><div class="page_inner">
<ul class="breadcrumb">
  <li><a href="../../../../index.html">Home</a></li>
  <li><a href="../../books_1/index.html">Books</a></li>
  <li class="active">{category}</li>
</ul>
<div class="row">
<aside class="sidebar col-sm-4 col-md-3">
  <div class="side_categories"><ul class="nav nav-list"><li>
    <a href="../../books_1/index.html">Books</a>
    <ul>{side_nav}</ul>
  </li></ul></div>
</aside>
<div class="col-sm-8 col-md-9">
  <div class="page-header action"><h1>{category}</h1></div>
  <section><ol class="row">{articles}</ol>
  <div>{pager}</div></section>
</div>
</div>
</div></div>
</body>
</html>
"#
    )
}

fn detail(book: &FixtureBook) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en-us">
<head><title>{title} | Books to Scrape - Sandbox</title></head>
<body id="default" class="default">
<div class="container-fluid page"><div class="page_inner">
<ul class="breadcrumb">
  <li><a href="../../index.html">Home</a></li>
  <li><a href="../category/books_1/index.html">Books</a></li>
  <li><a href="../category/books/{category_slug}/index.html">{category}</a></li>
  <li class="active">{title}</li>
</ul>
<article class="product_page">
<div class="row">
  <div class="col-sm-6">
    <div id="product_gallery" class="carousel"><div class="thumbnail"><div class="carousel-inner">
      <div class="item active"><img src="../../media/cache/{slug}.jpg" alt="{title}" /></div>
    </div></div></div>
  </div>
  <div class="col-sm-6 product_main">
    <h1>{title}</h1>
    <p class="price_color">£{price}</p>
    <p class="instock availability"><i class="icon-ok"></i>
      In stock ({available} available)
    </p>
    <p class="star-rating Three"><i class="icon-star"></i></p>
  </div>
</div>
<div id="product_description" class="sub-header"><h2>Product Description</h2></div>
<p>{description}</p>
<div class="sub-header"><h2>Product Information</h2></div>
<table class="table table-striped">
  <tr><th>UPC</th><td>{upc}</td></tr>
  <tr><th>Product Type</th><td>Books</td></tr>
  <tr><th>Price (excl. tax)</th><td>£{price}</td></tr>
  <tr><th>Price (incl. tax)</th><td>£{price}</td></tr>
  <tr><th>Tax</th><td>£0.00</td></tr>
  <tr><th>Availability</th><td>In stock ({available} available)</td></tr>
  <tr><th>Number of reviews</th><td>{reviews}</td></tr>
</table>
</article>
</div></div>
</body>
</html>
"#,
        title = book.title,
        slug = book.slug,
        category = book.category,
        category_slug = book.category_slug,
        price = book.price,
        available = book.available,
        reviews = book.reviews,
        description = book.description,
        upc = book.upc,
    )
}
