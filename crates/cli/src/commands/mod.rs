//! CLI commands.
//!
//! - **ask**: Run one question through the pipeline in process.
//! - **history**: List a user's recorded runs, newest first.

mod ask;
mod history;

pub use ask::ask;
pub use history::history;

#[cfg(test)]
mod tests;
