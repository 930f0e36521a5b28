//! Entry point: parses arguments, refuses a privileged invocation,
//! authenticates the remote session, and hands control to the operation
//! dispatcher (§4.G Session & Lifecycle).

mod cache;
mod cli;
mod config;
mod error;
mod fs;
mod handle;
mod path;
mod remote;
mod shell;

use std::fs::File;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use fuser::MountOption;
use tracing_subscriber::EnvFilter;

use cache::CacheTable;
use cli::Args;
use config::{Endpoint, Tunables};
use fs::{FsState, FsWrapper};
use remote::Ssh2Session;

const SSH_PORT: u16 = 22;

fn init_tracing(logfile: &std::path::Path) -> Result<(), std::io::Error> {
    let file = File::create(logfile)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(move || file.try_clone().expect("log file handle"))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run() -> Result<(), error::CoreError> {
    let args = Args::parse_from_args(std::env::args_os())?;

    // §6: "Running as the privileged user is refused with a non-zero exit
    // status" — checked before any session is allocated or the mount point
    // is touched.
    if unsafe { libc::geteuid() } == 0 {
        return Err(error::CoreError::Argument(
            "refusing to run as the privileged user".to_string(),
        ));
    }

    init_tracing(&args.logfile).map_err(error::CoreError::from)?;

    let endpoint = Endpoint::parse(&args.endpoint)?;
    let tunables = Tunables::load(args.config.as_deref());

    tracing::info!(host = %endpoint.host, user = %endpoint.user, root = %endpoint.remote_root, "connecting");
    let session = Ssh2Session::connect(&endpoint, SSH_PORT, tunables.remote_command_buf_max)?;
    let session: Arc<dyn remote::RemoteSession> = Arc::new(session);

    let scratch_dir = std::env::temp_dir();
    let cache = CacheTable::new(tunables.cache_max, scratch_dir);
    let state = FsState::new(session, endpoint.remote_root.clone(), cache, tunables);
    let filesystem = FsWrapper(Arc::new(Mutex::new(state)));

    let mut options = vec![MountOption::FSName("remote-fs".to_string())];
    for raw in &args.mount_options {
        options.push(MountOption::CUSTOM(raw.clone()));
    }

    tracing::info!(mountpoint = %args.mountpoint.display(), "mounting");
    fuser::mount2(filesystem, &args.mountpoint, &options).map_err(error::CoreError::from)?;
    tracing::info!("unmounted, shutting down");

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("remote-fs: {e}");
            ExitCode::FAILURE
        }
    }
}
