pub mod date;
pub mod id_number;
pub mod normalize;

pub use date::{canonical_date, canonical_date_range, find_dates, parse_date};
pub use id_number::{IdNumber, Sex};
pub use normalize::normalize;
