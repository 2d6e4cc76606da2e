use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;

use crate::trello::{Card, CreateCard, MoveCard, TrelloApi};

use super::{Outcome, write_row};

/// Optional fields for a new card.
#[derive(Debug, Clone, Default)]
pub struct CardFields {
    pub desc: Option<String>,
    pub due: Option<String>,
}

/// List the cards on a list
#[tracing::instrument(skip(api, out))]
pub async fn cards(api: &dyn TrelloApi, list_id: &str, out: &mut dyn Write) -> Result<Outcome> {
    let response = api
        .get_cards_on_list(list_id)
        .await
        .with_context(|| format!("Failed to list cards on list {}", list_id))?;
    debug!("Found {} card(s) on {}", response.data.len(), list_id);

    for card in &response.data {
        write_row(out, &card.id, &card.name)?;
    }
    Ok(response.rate_limit)
}

/// Show one card in detail
#[tracing::instrument(skip(api, out))]
pub async fn card(api: &dyn TrelloApi, card_id: &str, out: &mut dyn Write) -> Result<Outcome> {
    let response = api
        .get_card(card_id)
        .await
        .with_context(|| format!("Failed to fetch card {}", card_id))?;
    print_card(out, &response.data)?;
    Ok(response.rate_limit)
}

fn print_card(out: &mut dyn Write, card: &Card) -> Result<()> {
    write_row(out, &card.id, &card.name)?;
    if let Some(list) = &card.id_list {
        writeln!(out, "List: {}", list)?;
    }
    if let Some(due) = &card.due {
        let done = if card.due_complete { " (complete)" } else { "" };
        writeln!(out, "Due: {}{}", due, done)?;
    }
    if !card.labels.is_empty() {
        let labels: Vec<&str> = card
            .labels
            .iter()
            .map(|l| if l.name.is_empty() { l.id.as_str() } else { l.name.as_str() })
            .collect();
        writeln!(out, "Labels: {}", labels.join(", "))?;
    }
    if card.closed {
        writeln!(out, "Archived")?;
    }
    if let Some(url) = &card.url {
        writeln!(out, "URL: {}", url)?;
    }
    if !card.desc.is_empty() {
        writeln!(out, "\n{}", card.desc)?;
    }
    Ok(())
}

/// Create a card at the bottom of a list
#[tracing::instrument(skip(api, fields, out))]
pub async fn create_card(
    api: &dyn TrelloApi,
    list_id: &str,
    name: &str,
    fields: CardFields,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let params = CreateCard {
        desc: fields.desc,
        due: fields.due,
        ..CreateCard::new(list_id, name)
    };
    let response = api
        .create_card(&params)
        .await
        .with_context(|| format!("Failed to create card on list {}", list_id))?;
    info!("Created card {}", response.data.id);

    write_row(out, &response.data.id, &response.data.name)?;
    Ok(response.rate_limit)
}

/// Move a card to another list
#[tracing::instrument(skip(api, out))]
pub async fn move_card(
    api: &dyn TrelloApi,
    card_id: &str,
    list_id: &str,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let response = api
        .move_card(card_id, &MoveCard::to_list(list_id))
        .await
        .with_context(|| format!("Failed to move card {} to list {}", card_id, list_id))?;
    info!("Moved card {} to list {}", card_id, list_id);

    write_row(out, &response.data.id, &response.data.name)?;
    Ok(response.rate_limit)
}

/// Add a comment to a card
#[tracing::instrument(skip(api, text, out))]
pub async fn comment(
    api: &dyn TrelloApi,
    card_id: &str,
    text: &str,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let response = api
        .add_comment(card_id, text)
        .await
        .with_context(|| format!("Failed to comment on card {}", card_id))?;

    write_row(out, &response.data.id, response.data.text().unwrap_or(text))?;
    Ok(response.rate_limit)
}
