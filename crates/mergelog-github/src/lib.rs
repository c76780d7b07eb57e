//! GitHub REST client for mergelog.
//!
//! Lists an organisation's repositories and exposes each repository's closed
//! pull requests as a paginated [`mergelog_core::source::PullRequestSource`].

mod client;
mod pages;
mod wire;

pub mod error;

pub use client::{DEFAULT_API_URL, GithubClient, GithubConfig};
pub use error::{Error, Result};
pub use pages::PullRequestPages;
pub use wire::{Organization, Repository};
