//! Typed parameters for write operations and search.

use serde::{Serialize, Serializer};

/// Where a new or moved item lands within its list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Top,
    Bottom,
    At(f64),
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Position::Top => serializer.serialize_str("top"),
            Position::Bottom => serializer.serialize_str("bottom"),
            Position::At(pos) => serializer.serialize_f64(*pos),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateCard {
    pub id_list: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// ISO 8601 due date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Position>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_members: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub id_labels: Vec<String>,
}

impl CreateCard {
    pub fn new(id_list: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id_list: id_list.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Fields to change on a card. Unset fields are left alone.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Position>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MoveCard {
    pub id_list: String,
    /// Required only when the target list lives on another board.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_board: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Position>,
}

impl MoveCard {
    pub fn to_list(id_list: impl Into<String>) -> Self {
        Self {
            id_list: id_list.into(),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateList {
    pub id_board: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<Position>,
}

/// Kinds of objects a search can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Boards,
    Cards,
    Members,
}

impl ModelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelType::Boards => "boards",
            ModelType::Cards => "cards",
            ModelType::Members => "members",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    /// Empty means boards and cards.
    pub model_types: Vec<ModelType>,
    /// Per-type result cap.
    pub limit: Option<u32>,
    pub partial: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            model_types: Vec::new(),
            limit: None,
            partial: false,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn model_types_param(&self) -> String {
        let types = if self.model_types.is_empty() {
            vec![ModelType::Boards, ModelType::Cards]
        } else {
            self.model_types.clone()
        };
        types
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_card_skips_unset_fields() {
        let params = CreateCard::new("l1", "Write docs");
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"idList": "l1", "name": "Write docs"})
        );
    }

    #[test]
    fn test_create_card_full() {
        let params = CreateCard {
            desc: Some("details".into()),
            due: Some("2024-05-01T12:00:00Z".into()),
            pos: Some(Position::Top),
            id_members: vec!["m1".into()],
            id_labels: vec!["lb1".into()],
            ..CreateCard::new("l1", "Write docs")
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "idList": "l1",
                "name": "Write docs",
                "desc": "details",
                "due": "2024-05-01T12:00:00Z",
                "pos": "top",
                "idMembers": ["m1"],
                "idLabels": ["lb1"]
            })
        );
    }

    #[test]
    fn test_position_serialization() {
        assert_eq!(serde_json::to_value(Position::Bottom).unwrap(), json!("bottom"));
        assert_eq!(serde_json::to_value(Position::At(16384.0)).unwrap(), json!(16384.0));
    }

    #[test]
    fn test_update_card_only_changed_fields() {
        let params = UpdateCard {
            closed: Some(true),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&params).unwrap(), json!({"closed": true}));
    }

    #[test]
    fn test_move_card() {
        let params = MoveCard {
            pos: Some(Position::Bottom),
            ..MoveCard::to_list("l2")
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"idList": "l2", "pos": "bottom"})
        );
    }

    #[test]
    fn test_search_model_types() {
        assert_eq!(SearchQuery::new("x").model_types_param(), "boards,cards");

        let query = SearchQuery {
            model_types: vec![ModelType::Members],
            ..SearchQuery::new("x")
        };
        assert_eq!(query.model_types_param(), "members");
    }
}
