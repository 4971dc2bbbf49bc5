pub mod error;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod resolver;

pub(crate) mod ast;
mod callable;
mod limits;
mod printer;
pub(crate) mod env;
mod value;

pub use error::Error;
pub use lox::{Lox, RunStatus};

#[cfg(test)]
pub mod test_utils {
    /// Call this at the start of a test to see the pipeline's tracing output, filtered by
    /// `RUST_LOG` (default `debug`).
    pub fn init_test_logging() {
        use tracing_subscriber::{fmt, EnvFilter};

        // Only the first call in a test binary installs the subscriber
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
