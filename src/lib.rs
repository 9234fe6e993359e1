//! Splits concatenated scanned statements into one PDF per
//! "LIQUIDACIÓN PROVISIONAL" page.

pub mod cli;
pub mod commands;
pub mod detect;
pub mod model;
pub mod pdf;
pub mod util;
