mod client;
mod fetch;
pub mod types;
#[cfg(test)]
pub mod mock;

pub use client::{PageSource, WpClient};
pub use fetch::{fetch_comments, fetch_post, fetch_posts, fetch_terms};
