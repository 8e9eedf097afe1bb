//! Types shared between the chatrelay crates

#![allow(clippy::must_use_candidate)]

mod context;
mod error;

pub use context::{CLIENT_PRINCIPAL_HEADER, ClientPrincipal, DEFAULT_USERNAME};
pub use error::HttpError;
