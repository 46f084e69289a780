//! Create, list, open, update and delete GitHub gists.
//!
//! [`GistClient`] talks to the gist API, [`filter`] names and filters listings
//! the way a quick panel shows them, and [`UpdateQueue`] pushes edits in the
//! background without reordering them.

mod error;
pub use error::{Error, Result};

pub mod env;
pub mod settings;
pub use settings::{Settings, SettingsHandle};

pub mod client;
pub use client::{GistClient, Reply};

pub mod transport;
pub use transport::Method;

pub mod catalog;
pub mod filter;
pub mod model;
pub mod naming;
pub mod open;
pub mod queue;
pub use queue::UpdateQueue;

pub mod testing;
pub mod watch;

mod serde;

include!(concat!(env!("OUT_DIR"), "/", "version.rs"));

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
