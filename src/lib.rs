#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod crawl;
pub mod detail;
pub mod discover;
pub mod fetch;
pub mod formats;
pub mod html;
pub mod image;
pub mod links;
pub mod logging;
pub mod paginate;
pub mod store;
