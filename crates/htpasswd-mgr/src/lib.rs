#![warn(missing_docs)]

//! Manage Apache-style `htpasswd` credential files.
//!
//! A [`Manager`] is bound to one file. It loads the `username:encoded-secret`
//! lines into memory, lets callers add, update, upsert and remove users, and
//! writes the whole file back on every mutation unless told to defer.
//! Secrets are encoded with one of the schemes basic-auth servers understand:
//! APR1-MD5 (the default), bcrypt, traditional crypt, or unsalted SHA-1.
//!
//! # Example
//!
//! ```no_run
//! use htpasswd_mgr::{Algorithm, Manager, Options};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open a credential file; a missing file starts out empty
//! let mut manager = Manager::open(".htpasswd")?;
//!
//! // Add a user and write the file
//! manager.add("alice", "password123", Options::new().algorithm(Algorithm::Bcrypt))?;
//!
//! // Batch several changes, then write once
//! manager.upsert("bob", "hunter2", Options::deferred())?;
//! manager.remove("carol", Options::deferred())?;
//! manager.export()?;
//!
//! for user in manager.list() {
//!     println!("{}", user);
//! }
//! # Ok(())
//! # }
//! ```

pub mod apr1_md5;
mod encoder;
pub mod format;
mod manager;

pub use encoder::{Algorithm, DEFAULT_BCRYPT_COST, Encoder, Error as EncodeError, encode};
pub use manager::{Error as ManagerError, Manager, Options};
