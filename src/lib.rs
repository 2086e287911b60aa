pub mod browser;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod promo;
pub mod reporting;
pub mod retailer;
pub mod retry;
pub mod utils;
pub mod workflow;
