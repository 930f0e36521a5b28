//! The `RemoteSession` seam: everything the cache and the dispatcher need
//! from "a connected remote host" is captured here as a trait, so the rest
//! of the crate never touches `ssh2::Session` directly. Production code
//! gets `Ssh2Session`; tests get `FakeSession`, an in-memory stand-in that
//! needs no live transport.

use std::collections::HashMap;
use std::net::TcpStream;
use std::path::Path;
use std::sync::Mutex;

use crate::config::Endpoint;
use crate::error::CoreError;
use crate::remote::{command, copy};

/// The three remote primitives every higher-level module is built on: a
/// textual command, a whole-file pull, and a whole-file push.
pub trait RemoteSession: Send + Sync {
    fn exec(&self, command: &str) -> Result<Vec<u8>, CoreError>;
    fn copy_in(&self, remote_path: &str) -> Result<Vec<u8>, CoreError>;
    fn copy_out(&self, remote_path: &str, data: &[u8]) -> Result<(), CoreError>;
}

/// A live `ssh2` session over a connected TCP stream, authenticated once at
/// startup and reused for the life of the mount (Design Notes: one
/// multiplexed connection, not one connection per operation).
pub struct Ssh2Session {
    session: ssh2::Session,
    remote_command_buf_max: usize,
}

impl Ssh2Session {
    /// Connects, performs the transport handshake, and authenticates as
    /// `endpoint.user`. Tries the running SSH agent first, then falls back
    /// to the user's default key pair, mirroring `ssh_userauth_publickey_auto`
    /// in the C original.
    pub fn connect(endpoint: &Endpoint, port: u16, remote_command_buf_max: usize) -> Result<Self, CoreError> {
        let tcp = TcpStream::connect((endpoint.host.as_str(), port))
            .map_err(|e| CoreError::Session(format!("tcp connect to {}:{port} failed: {e}", endpoint.host)))?;

        let mut session = ssh2::Session::new()
            .map_err(|e| CoreError::Session(format!("session allocation failed: {e}")))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| CoreError::Session(format!("handshake failed: {e}")))?;

        if session.userauth_agent(&endpoint.user).is_err() {
            let home = std::env::var("HOME").unwrap_or_default();
            let private_key = Path::new(&home).join(".ssh/id_rsa");
            let public_key = Path::new(&home).join(".ssh/id_rsa.pub");
            session
                .userauth_pubkey_file(&endpoint.user, Some(&public_key), &private_key, None)
                .map_err(|e| CoreError::Session(format!("authentication failed for {}: {e}", endpoint.user)))?;
        }

        if !session.authenticated() {
            return Err(CoreError::Session(format!("authentication failed for {}", endpoint.user)));
        }

        Ok(Self {
            session,
            remote_command_buf_max,
        })
    }
}

impl RemoteSession for Ssh2Session {
    fn exec(&self, cmd: &str) -> Result<Vec<u8>, CoreError> {
        command::exec(&self.session, cmd, self.remote_command_buf_max)
    }

    fn copy_in(&self, remote_path: &str) -> Result<Vec<u8>, CoreError> {
        copy::copy_in(&self.session, remote_path)
    }

    fn copy_out(&self, remote_path: &str, data: &[u8]) -> Result<(), CoreError> {
        copy::copy_out(&self.session, remote_path, data)
    }
}

/// An in-memory stand-in for a remote host, used by unit tests that need a
/// `RemoteSession` without a live network endpoint. Commands are served from
/// a fixed lookup table; files live in a flat path-to-bytes map.
#[derive(Default)]
pub struct FakeSession {
    commands: Mutex<HashMap<String, String>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_command_response(&self, command: &str, response: String) {
        self.commands.lock().unwrap().insert(command.to_string(), response);
    }

    pub fn set_file(&self, remote_path: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(remote_path.to_string(), data);
    }

    pub fn get_file(&self, remote_path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(remote_path).cloned()
    }
}

impl RemoteSession for FakeSession {
    fn exec(&self, command: &str) -> Result<Vec<u8>, CoreError> {
        self.commands
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .map(|s| s.into_bytes())
            .ok_or_else(|| CoreError::RemoteCommand(format!("no fake response configured for: {command}")))
    }

    fn copy_in(&self, remote_path: &str) -> Result<Vec<u8>, CoreError> {
        self.files
            .lock()
            .unwrap()
            .get(remote_path)
            .cloned()
            .ok_or_else(|| CoreError::RemoteCopy(format!("no fake file at {remote_path}")))
    }

    fn copy_out(&self, remote_path: &str, data: &[u8]) -> Result<(), CoreError> {
        self.files.lock().unwrap().insert(remote_path.to_string(), data.to_vec());
        Ok(())
    }
}
