//! Domain models for trips, watches, snapshots, and alerts.

mod alert;
mod money;
mod snapshot;
mod trip;
mod user;
mod watch;

pub use alert::{Alert, AlertChannel, AlertStatus, AlertType};
pub use money::format_cents;
pub use snapshot::{CabinClass, PriceSnapshot};
pub use trip::{Trip, TripType};
pub use user::User;
pub use watch::{PriceWatch, WatchValidationError, COOLDOWN_HOURS_MAX, COOLDOWN_HOURS_MIN};
