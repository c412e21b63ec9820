/// Command-line behavior tests.
mod cli;
/// Helpers.
mod common;
