use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use crate::trello::TrelloApi;

use super::{Outcome, write_row};

/// Show the member the token belongs to
#[tracing::instrument(skip(api, out))]
pub async fn me(api: &dyn TrelloApi, out: &mut dyn Write) -> Result<Outcome> {
    let response = api.get_me().await.context("Failed to fetch current member")?;
    let member = &response.data;
    debug!("Authenticated as {}", member.username);

    match &member.full_name {
        Some(full_name) => write_row(out, &member.id, &format!("{} ({})", member.username, full_name))?,
        None => write_row(out, &member.id, &member.username)?,
    }
    Ok(response.rate_limit)
}
