//! Command line front end for lore retrieval.

pub mod commands;
pub mod loader;

pub use commands::LoreCli;
