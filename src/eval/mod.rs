mod app;
pub mod models;

pub use app::{main, run_app, Cli, DEFAULT_LABEL, DEFAULT_TAG};
