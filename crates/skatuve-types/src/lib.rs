pub mod content;
pub mod date;
pub mod ordering;

pub use date::DateError;
pub use ordering::OrderingError;
