//! Logging utilities

pub use log::{debug, error, info, trace, warn};

/// Initialize logging from `RUST_LOG`
///
/// Returns `false` when a logger was already installed; that logger stays active.
pub fn init() -> bool {
    installed(env_logger::try_init())
}

/// Initialize logging with a fallback filter used when `RUST_LOG` is unset
///
/// Returns `false` when a logger was already installed; that logger stays active.
pub fn init_with_filter(default_filter: &str) -> bool {
    installed(
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .try_init(),
    )
}

fn installed(result: Result<(), log::SetLoggerError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            debug!("Keeping the existing logger ({err})");
            false
        }
    }
}
