//! Everything that talks to the remote host: the command channel, the copy
//! channel, the metadata probe built on top of the command channel, and the
//! `RemoteSession` seam that lets the rest of the crate depend on neither.

pub mod command;
pub mod copy;
pub mod session;
pub mod stat;

pub use session::{FakeSession, RemoteSession, Ssh2Session};
pub use stat::AttributeRecord;
