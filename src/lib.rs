pub mod builder;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;
pub mod zone_directory;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{Result, ZoneStatsError};

/// Initialise tracing for the binaries, honouring `RUST_LOG` and defaulting to `info`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
