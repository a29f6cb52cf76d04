pub mod config;
mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use config::{ConfigError, ScraperConfig};
pub use parser::ParseError;
pub use scraper::{ScraperError, SearchResults, Session, WebScraper};
pub use types::{DevelopmentApplication, Field};
pub use utils::{MonthRange, RunReport};

/// The portal sets up its server-side search state on this page. Every other
/// page of the portal fails until it has been visited in the same session.
pub(crate) const SEARCH_URL: &str =
    "https://eservices.cairns.qld.gov.au/eservice/daEnquiryInit.do?nodeNum=227";

pub(crate) const FEEDBACK_URL: &str = "mailto:townplanner@cairns.qld.gov.au";

pub(crate) const PORTAL_DATE_FORMAT: &str = "%d/%m/%Y";
