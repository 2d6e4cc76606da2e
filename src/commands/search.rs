use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use crate::trello::{SearchQuery, TrelloApi};

use super::{Outcome, write_row};

/// Search boards and cards
#[tracing::instrument(skip(api, out))]
pub async fn search(
    api: &dyn TrelloApi,
    query: &str,
    limit: Option<u32>,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let mut params = SearchQuery::new(query);
    params.limit = limit;

    let response = api
        .search(&params)
        .await
        .with_context(|| format!("Search for {:?} failed", query))?;
    let results = &response.data;
    debug!(
        "Search returned {} board(s) and {} card(s)",
        results.boards.len(),
        results.cards.len()
    );

    if results.boards.is_empty() && results.cards.is_empty() {
        writeln!(out, "No matches.")?;
    }
    for board in &results.boards {
        write_row(out, &board.id, &board.name)?;
    }
    for card in &results.cards {
        write_row(out, &card.id, &card.name)?;
    }
    Ok(response.rate_limit)
}
