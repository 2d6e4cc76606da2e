//! CLI commands. Each one makes API calls through [`TrelloApi`], writes one
//! line per item to `out`, and returns the rate-limit state of its last call.

use anyhow::Result;
use std::io::Write;

use crate::http::RateLimitInfo;

mod boards;
mod cards;
mod members;
mod search;

pub use boards::{boards, lists};
pub use cards::{CardFields, card, cards, comment, create_card, move_card};
pub use members::me;
pub use search::search;

/// What a command leaves behind for the caller to report.
pub type Outcome = Option<RateLimitInfo>;

fn write_row(out: &mut dyn Write, id: &str, name: &str) -> Result<()> {
    writeln!(out, "{}  {}", id, name)?;
    Ok(())
}

/// Writes `rate limit: remaining/limit` when the service reported one.
pub fn print_rate_limit(err: &mut dyn Write, rate_limit: Option<&RateLimitInfo>) -> Result<()> {
    if let Some(info) = rate_limit {
        writeln!(err, "rate limit: {}/{}", info.remaining, info.limit)?;
    }
    Ok(())
}
