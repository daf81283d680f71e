//! Course registrations: the row model, the CSV store and dashboard statistics.

mod record;
mod stats;
mod store;

pub use record::{
    title_case, Registration, RegistrationForm, ValidationError, CONFIRMED_STATUS, CSV_HEADER,
    DEFAULT_FORMAT, REQUIRED_FIELDS, UNKNOWN,
};
pub use stats::{RecentRegistration, RegistrationStats, EXPORT_URL};
pub use store::{Appended, RegistrationStore};
