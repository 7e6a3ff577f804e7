//! The repository engine.
//!
//! This module provides:
//! - The framed message protocol every producer speaks
//! - The mailbox serializing all mutations and queries
//! - The search query grammar
//! - The repository itself with its single processing thread

mod mailbox;
mod message;
mod query;
mod repository;

pub use mailbox::Mailbox;
pub use message::{Message, SearchQuery};
pub use query::{parse_query, ParsedQuery};
pub use repository::FileRepository;
