//! Logging utilities

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Defaults to `info` and honours `RUST_LOG`. Safe to call more than once;
/// only the first call installs the logger.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init();
        init();
        info!("logger initialised twice without panicking");
    }
}
