//! Content module for fetching pages and extracting article text
//!
//! Both halves sit behind traits so the pipeline can run against any
//! transport or HTML backend:
//! - `ContentFetcher`: URL to raw HTML bytes (`HttpFetcher` over reqwest)
//! - `ContentExtractor`: HTML to plain article text (`SelectorExtractor` over scraper)

mod extractor;
mod fetcher;

pub use extractor::{ContentExtractor, SelectorExtractor};
pub use fetcher::{build_http_client, ContentFetcher, FetchError, FetchSettings, HttpFetcher};
