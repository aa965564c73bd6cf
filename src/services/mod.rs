//! Service layer: orchestration between repositories, scrapers, and
//! notifications.

mod alerts;
mod scheduled;
mod scrape;

pub use alerts::AlertService;
pub use scheduled::{BackgroundOutcome, ScheduledScrapeService, SweepSummary};
pub use scrape::ScrapeService;

use thiserror::Error;

use crate::repository::DieselError;
use crate::scrapers::ScrapeError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing trip, or a trip owned by someone else. The two cases are
    /// deliberately indistinguishable.
    #[error("trip not found")]
    TripNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid provider: {0}")]
    InvalidProvider(ScrapeError),

    #[error("scraping failed: {0}")]
    ScrapeFailed(#[source] ScrapeError),

    #[error(transparent)]
    Database(#[from] DieselError),
}
