mod app;
mod effects;
pub mod logging;
pub mod ui;

pub use app::{run_health, run_interactive, run_search};
