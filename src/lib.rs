//! Ninja build graph generator for a static JavaScript site.
//!
//! The crate discovers the site's script sources, maps them onto a fixed rule
//! catalogue and renders the resulting [`ir::BuildGraph`] as a Ninja file
//! (or as DOT for inspection). The pipeline is:
//!
//! [`config`] → [`discover`] → [`emit`] → [`ninja_gen`] / [`dot_gen`]
//!
//! with [`runner`] driving it from the parsed [`cli::Cli`].

pub mod cli;
pub mod config;
pub mod discover;
pub mod dot_gen;
pub mod emit;
pub mod ir;
pub mod ninja_gen;
pub mod rules;
pub mod runner;
