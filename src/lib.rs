pub mod config;
pub mod controller;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod i18n;
pub mod ids;
pub mod models;
pub mod store;

pub use error::{Error, Result};
