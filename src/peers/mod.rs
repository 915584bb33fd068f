//! Peer integration module
//!
//! Protocol adapters to the rating engine (RatingSv1) and the account
//! balance management function (AccountSv1). Both are reached through one
//! JSON-RPC 2.0 over HTTP client; the charging core only sees the
//! `RatingClient` and `AccountClient` traits.

mod accounts;
mod client;
mod rating;
pub mod types;

pub use accounts::AccountClient;
pub use client::{PeerClient, PeerError};
pub use rating::RatingClient;
pub use types::*;

#[cfg(test)]
pub use accounts::MockAccountClient;
#[cfg(test)]
pub use rating::MockRatingClient;
