pub mod config;
pub mod flags;
pub mod matrix;
pub mod records;
pub mod templates;
