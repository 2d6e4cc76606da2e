use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use crate::trello::TrelloApi;

use super::{Outcome, write_row};

/// List the open boards of the current member
#[tracing::instrument(skip(api, out))]
pub async fn boards(api: &dyn TrelloApi, out: &mut dyn Write) -> Result<Outcome> {
    let response = api.list_boards().await.context("Failed to list boards")?;
    debug!("Found {} board(s)", response.data.len());

    if response.data.is_empty() {
        writeln!(out, "No open boards.")?;
    }
    for board in &response.data {
        write_row(out, &board.id, &board.name)?;
    }
    Ok(response.rate_limit)
}

/// List the open lists on a board
#[tracing::instrument(skip(api, out))]
pub async fn lists(api: &dyn TrelloApi, board_id: &str, out: &mut dyn Write) -> Result<Outcome> {
    let response = api
        .get_lists(board_id)
        .await
        .with_context(|| format!("Failed to list lists on board {}", board_id))?;
    debug!("Found {} list(s) on {}", response.data.len(), board_id);

    for list in &response.data {
        write_row(out, &list.id, &list.name)?;
    }
    Ok(response.rate_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_utils::{limited, output, response};
    use crate::http::{ApiError, ErrorKind};
    use crate::trello::{Board, List, MockTrelloApi};
    use mockall::predicate::eq;

    fn board(id: &str, name: &str) -> Board {
        Board {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_boards() {
        let mut api = MockTrelloApi::new();
        api.expect_list_boards().times(1).returning(|| {
            Ok(limited(
                vec![board("b1", "Roadmap"), board("b2", "Operations")],
                95,
                100,
            ))
        });

        let mut out = Vec::new();
        let outcome = boards(&api, &mut out).await.unwrap();

        assert_eq!(output(out), "b1  Roadmap\nb2  Operations\n");
        assert_eq!(outcome.unwrap().remaining, 95);
    }

    #[tokio::test]
    async fn test_boards_empty() {
        let mut api = MockTrelloApi::new();
        api.expect_list_boards()
            .returning(|| Ok(response(Vec::new())));

        let mut out = Vec::new();
        boards(&api, &mut out).await.unwrap();

        assert_eq!(output(out), "No open boards.\n");
    }

    #[tokio::test]
    async fn test_boards_error_keeps_api_message() {
        let mut api = MockTrelloApi::new();
        api.expect_list_boards().returning(|| {
            Err(ApiError::new(
                ErrorKind::Authentication,
                "Authentication failed: the API key or token was rejected.",
            ))
        });

        let mut out = Vec::new();
        let err = boards(&api, &mut out).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to list boards");
        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.kind(), ErrorKind::Authentication);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_lists() {
        let mut api = MockTrelloApi::new();
        api.expect_get_lists()
            .with(eq("b1"))
            .times(1)
            .returning(|_| {
                Ok(response(vec![
                    List {
                        id: "l1".into(),
                        name: "To Do".into(),
                        ..Default::default()
                    },
                    List {
                        id: "l2".into(),
                        name: "Done".into(),
                        ..Default::default()
                    },
                ]))
            });

        let mut out = Vec::new();
        lists(&api, "b1", &mut out).await.unwrap();

        assert_eq!(output(out), "l1  To Do\nl2  Done\n");
    }
}
