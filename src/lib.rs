pub mod aggregate;
mod api;
pub mod args;
mod backup;
mod cache;
pub mod commands;
mod config;
mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod normalize;
mod render;
mod session;
pub mod store;
mod utils;


pub use api::{Mode, TEST_MODE_ENV};
pub use config::{Config, StoreKind, StoreSettings};
pub use error::{Error, ErrorType, Result};
pub use render::{forecast_message, render as render_report};
