//! turbo-core
//!
//! Shared building blocks for the sharded search engine: configuration,
//! the error taxonomy, domain types, collaborator traits and the
//! consistent-hash ring used to place documents on shards.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod layout;
pub mod ring;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use ring::HashRing;
