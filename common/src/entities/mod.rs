pub mod dates;
pub mod months;

pub use dates::{DateExtractor, DateRange, DateRule};
pub use months::{last_day_of_month, month_number, MONTH_NAMES};
