//! Client for the NSTBrowser agent that hosts one-shot browser profiles
//! during a detection challenge.

pub mod client;
pub mod error;

pub use client::NstClient;
pub use error::{NstError, Result};
