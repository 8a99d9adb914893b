//! Headless front-end: command line, effect execution, logging and the relay store.
mod app;
mod cli;
mod effects;
mod logging;
mod persistence;
mod ui;

pub use app::run;
