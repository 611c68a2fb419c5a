//! Shelfscope application crate

mod dashboard;
pub mod logging;

pub use dashboard::Dashboard;
