pub mod app;
pub mod config;
pub mod dates;
pub mod formatter;
pub mod logger;
pub mod page;

pub use dates::{MONTH_NAMES, ParsedDate, parse_date_attribute};
pub use formatter::{DateLabeler, PassSummary, SlotError, SlotPolicy};
pub use page::{LabelledPage, PageReport, label_page};
