//! Workbook module for wifiwatch.
//!
//! Provides the dated, sheet-partitioned Excel workbook.

mod models;
mod store;

pub use models::*;
pub use store::*;
