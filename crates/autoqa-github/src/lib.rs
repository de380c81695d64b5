//! AutoQA GitHub Provider
//!
//! Implements the core's provider capabilities against the GitHub REST
//! API: installation-token exchange and the repository surface the
//! correlation pipeline calls (comments, diffs, artifacts, merges).

pub mod client;

pub use client::{GitHubClient, GitHubExchange, DEFAULT_API_BASE};
