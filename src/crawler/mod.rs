//! HTML crawling module
//!
//! This module contains the streaming core of fcrawl:
//! - the incremental tag/attribute segmenter that recognizes URI-bearing
//!   attribute values as the page bytes arrive
//! - the crawl driver that owns the URI table and schedules one
//!   sub-download per distinct URI on the job pool

mod driver;
mod fsm;

pub use driver::{HtmlCrawler, UriRecord};
pub use fsm::{AttributeSink, Segmenter};
