//! Request/Response bodies

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCircleRequest {
    pub name: String,
    /// User id of the owner; the requesting administrator when absent or empty
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCircleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLevelRequest {
    pub level: i32,
}

/// Plain `{ "message": ... }` body used for confirmations and failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_optional_fields() {
        let req: CreateCircleRequest = serde_json::from_str(r#"{"name":"Team A"}"#).unwrap();
        assert_eq!(req.name, "Team A");
        assert!(req.owner.is_none());
        assert!(req.description.is_none());

        assert!(serde_json::from_str::<CreateCircleRequest>(r#"{"owner":"alice"}"#).is_err());
    }

    #[test]
    fn test_member_request_uses_camel_case() {
        let req: AddMemberRequest = serde_json::from_str(r#"{"userId":"bob"}"#).unwrap();
        assert_eq!(req.user_id, "bob");
        assert!(serde_json::from_str::<AddMemberRequest>(r#"{"user_id":"bob"}"#).is_err());
    }
}
