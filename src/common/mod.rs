//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;

pub use io::{open_read_maybe_gz, open_write_maybe_gz};

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let me = procfs::process::Process::myself().unwrap();
    let page_size = procfs::page_size();
    tracing::debug!(
        "RSS now: {}",
        byte_unit::Byte::from_u64(me.stat().unwrap().rss * page_size)
            .get_appropriate_unit(byte_unit::UnitType::Binary)
    );
}

/// The version of the `vcfslice` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
