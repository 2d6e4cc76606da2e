//! Trello REST operations on top of the resilient HTTP client.
//!
//! Every operation here only builds an endpoint and parameters and declares
//! the response type; retries and error classification happen in
//! [`crate::http`].

mod params;
mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::http::{ApiRequest, ApiResult, CallOptions, Endpoint, HttpClient};

pub use params::{CreateCard, CreateList, ModelType, MoveCard, Position, SearchQuery, UpdateCard};
pub use types::{
    Action, Board, Card, CheckItem, Checklist, Label, List, Member, Organization, SearchResults,
};

/// Operations available against the remote board service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrelloApi: Send + Sync {
    /// The member who owns the token.
    async fn get_me(&self) -> ApiResult<Member>;
    /// Open boards of the authenticated member.
    async fn list_boards(&self) -> ApiResult<Vec<Board>>;
    async fn list_organizations(&self) -> ApiResult<Vec<Organization>>;
    async fn list_board_members(&self, board_id: &str) -> ApiResult<Vec<Member>>;

    async fn get_board(&self, board_id: &str) -> ApiResult<Board>;
    /// Most recent actions on a board, newest first.
    async fn get_board_activity(&self, board_id: &str, limit: u32) -> ApiResult<Vec<Action>>;

    /// Open lists on a board.
    async fn get_lists(&self, board_id: &str) -> ApiResult<Vec<List>>;
    async fn create_list(&self, params: &CreateList) -> ApiResult<List>;
    async fn archive_list(&self, list_id: &str) -> ApiResult<List>;

    async fn get_cards_on_list(&self, list_id: &str) -> ApiResult<Vec<Card>>;
    async fn get_cards_on_board(&self, board_id: &str) -> ApiResult<Vec<Card>>;
    async fn get_card(&self, card_id: &str) -> ApiResult<Card>;
    async fn create_card(&self, params: &CreateCard) -> ApiResult<Card>;
    async fn update_card(&self, card_id: &str, params: &UpdateCard) -> ApiResult<Card>;
    async fn move_card(&self, card_id: &str, params: &MoveCard) -> ApiResult<Card>;
    async fn archive_card(&self, card_id: &str) -> ApiResult<Card>;
    async fn delete_card(&self, card_id: &str) -> ApiResult<()>;

    async fn add_comment(&self, card_id: &str, text: &str) -> ApiResult<Action>;
    async fn get_comments(&self, card_id: &str) -> ApiResult<Vec<Action>>;

    async fn add_member_to_card(&self, card_id: &str, member_id: &str) -> ApiResult<Vec<Member>>;
    async fn remove_member_from_card(&self, card_id: &str, member_id: &str) -> ApiResult<()>;

    async fn get_labels(&self, board_id: &str) -> ApiResult<Vec<Label>>;
    /// Returns the card's label ids after the change.
    async fn add_label_to_card(&self, card_id: &str, label_id: &str) -> ApiResult<Vec<String>>;

    async fn get_checklists(&self, card_id: &str) -> ApiResult<Vec<Checklist>>;
    async fn create_checklist(&self, card_id: &str, name: &str) -> ApiResult<Checklist>;
    async fn add_check_item(&self, checklist_id: &str, name: &str) -> ApiResult<CheckItem>;

    async fn search(&self, query: &SearchQuery) -> ApiResult<SearchResults>;
}

/// [`TrelloApi`] backed by an [`HttpClient`].
#[derive(Clone)]
pub struct TrelloClient {
    http: HttpClient,
    options: CallOptions,
}

impl TrelloClient {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            options: CallOptions::default(),
        }
    }

    /// A copy of this client whose calls all observe `options`.
    pub fn with_call_options(&self, options: CallOptions) -> Self {
        Self {
            http: self.http.clone(),
            options,
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        self.http
            .request(request.with_options(self.options.clone()))
            .await
    }

    /// For endpoints whose response body carries nothing useful.
    async fn call_discarding(&self, request: ApiRequest) -> ApiResult<()> {
        Ok(self.call::<serde_json::Value>(request).await?.map(|_| ()))
    }
}

fn board(board_id: &str) -> Endpoint {
    Endpoint::new("boards").segment(board_id)
}

fn card(card_id: &str) -> Endpoint {
    Endpoint::new("cards").segment(card_id)
}

fn list(list_id: &str) -> Endpoint {
    Endpoint::new("lists").segment(list_id)
}

#[async_trait]
impl TrelloApi for TrelloClient {
    async fn get_me(&self) -> ApiResult<Member> {
        self.call(ApiRequest::get(
            "Get current member",
            Endpoint::new("members").segment("me"),
        ))
        .await
    }

    async fn list_boards(&self) -> ApiResult<Vec<Board>> {
        self.call(
            ApiRequest::get(
                "List boards",
                Endpoint::new("members").segment("me").segment("boards"),
            )
            .query("filter", "open"),
        )
        .await
    }

    async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        self.call(ApiRequest::get(
            "List workspaces",
            Endpoint::new("members").segment("me").segment("organizations"),
        ))
        .await
    }

    async fn list_board_members(&self, board_id: &str) -> ApiResult<Vec<Member>> {
        self.call(ApiRequest::get(
            "List board members",
            board(board_id).segment("members"),
        ))
        .await
    }

    async fn get_board(&self, board_id: &str) -> ApiResult<Board> {
        self.call(ApiRequest::get("Get board", board(board_id))).await
    }

    async fn get_board_activity(&self, board_id: &str, limit: u32) -> ApiResult<Vec<Action>> {
        self.call(
            ApiRequest::get("Get board activity", board(board_id).segment("actions"))
                .query("limit", limit),
        )
        .await
    }

    async fn get_lists(&self, board_id: &str) -> ApiResult<Vec<List>> {
        self.call(
            ApiRequest::get("Get lists", board(board_id).segment("lists")).query("filter", "open"),
        )
        .await
    }

    async fn create_list(&self, params: &CreateList) -> ApiResult<List> {
        self.call(ApiRequest::post("Create list", Endpoint::new("lists")).json(params)?)
            .await
    }

    async fn archive_list(&self, list_id: &str) -> ApiResult<List> {
        self.call(
            ApiRequest::put("Archive list", list(list_id).segment("closed"))
                .json(&serde_json::json!({ "value": true }))?,
        )
        .await
    }

    async fn get_cards_on_list(&self, list_id: &str) -> ApiResult<Vec<Card>> {
        self.call(ApiRequest::get(
            "Get cards on list",
            list(list_id).segment("cards"),
        ))
        .await
    }

    async fn get_cards_on_board(&self, board_id: &str) -> ApiResult<Vec<Card>> {
        self.call(ApiRequest::get(
            "Get cards on board",
            board(board_id).segment("cards"),
        ))
        .await
    }

    async fn get_card(&self, card_id: &str) -> ApiResult<Card> {
        self.call(ApiRequest::get("Get card", card(card_id))).await
    }

    async fn create_card(&self, params: &CreateCard) -> ApiResult<Card> {
        self.call(ApiRequest::post("Create card", Endpoint::new("cards")).json(params)?)
            .await
    }

    async fn update_card(&self, card_id: &str, params: &UpdateCard) -> ApiResult<Card> {
        self.call(ApiRequest::put("Update card", card(card_id)).json(params)?)
            .await
    }

    async fn move_card(&self, card_id: &str, params: &MoveCard) -> ApiResult<Card> {
        self.call(ApiRequest::put("Move card", card(card_id)).json(params)?)
            .await
    }

    async fn archive_card(&self, card_id: &str) -> ApiResult<Card> {
        let params = UpdateCard {
            closed: Some(true),
            ..Default::default()
        };
        self.call(ApiRequest::put("Archive card", card(card_id)).json(&params)?)
            .await
    }

    async fn delete_card(&self, card_id: &str) -> ApiResult<()> {
        self.call_discarding(ApiRequest::delete("Delete card", card(card_id)))
            .await
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> ApiResult<Action> {
        self.call(
            ApiRequest::post(
                "Add comment",
                card(card_id).segment("actions").segment("comments"),
            )
            .query("text", text),
        )
        .await
    }

    async fn get_comments(&self, card_id: &str) -> ApiResult<Vec<Action>> {
        self.call(
            ApiRequest::get("Get comments", card(card_id).segment("actions"))
                .query("filter", "commentCard"),
        )
        .await
    }

    async fn add_member_to_card(&self, card_id: &str, member_id: &str) -> ApiResult<Vec<Member>> {
        self.call(
            ApiRequest::post("Assign member", card(card_id).segment("idMembers"))
                .query("value", member_id),
        )
        .await
    }

    async fn remove_member_from_card(&self, card_id: &str, member_id: &str) -> ApiResult<()> {
        self.call_discarding(ApiRequest::delete(
            "Unassign member",
            card(card_id).segment("idMembers").segment(member_id),
        ))
        .await
    }

    async fn get_labels(&self, board_id: &str) -> ApiResult<Vec<Label>> {
        self.call(ApiRequest::get("Get labels", board(board_id).segment("labels")))
            .await
    }

    async fn add_label_to_card(&self, card_id: &str, label_id: &str) -> ApiResult<Vec<String>> {
        self.call(
            ApiRequest::post("Add label", card(card_id).segment("idLabels"))
                .query("value", label_id),
        )
        .await
    }

    async fn get_checklists(&self, card_id: &str) -> ApiResult<Vec<Checklist>> {
        self.call(ApiRequest::get(
            "Get checklists",
            card(card_id).segment("checklists"),
        ))
        .await
    }

    async fn create_checklist(&self, card_id: &str, name: &str) -> ApiResult<Checklist> {
        self.call(
            ApiRequest::post("Create checklist", Endpoint::new("checklists"))
                .query("idCard", card_id)
                .query("name", name),
        )
        .await
    }

    async fn add_check_item(&self, checklist_id: &str, name: &str) -> ApiResult<CheckItem> {
        self.call(
            ApiRequest::post(
                "Add checklist item",
                Endpoint::new("checklists")
                    .segment(checklist_id)
                    .segment("checkItems"),
            )
            .query("name", name),
        )
        .await
    }

    async fn search(&self, query: &SearchQuery) -> ApiResult<SearchResults> {
        self.call(
            ApiRequest::get("Search", Endpoint::new("search"))
                .query("query", &query.query)
                .query("modelTypes", query.model_types_param())
                .query_opt("cards_limit", query.limit)
                .query_opt("boards_limit", query.limit)
                .query("partial", query.partial),
        )
        .await
    }
}
