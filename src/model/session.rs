use serde::{Deserialize, Serialize};

/// The signed-in user as returned by the backend.
///
/// Only the fields the client reads are typed; everything else the backend
/// sends is kept in `extra` so the stored blob round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Who is signed in for this run of the app.
///
/// Passed explicitly to whatever needs auth; hydrated from storage at
/// start and cleared on logout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl Session {
    pub fn signed_in(user: User, token: String) -> Self {
        Session {
            user: Some(user),
            token: Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_keeps_unknown_fields() {
        let json = r#"{"_id":"u1","firstName":"Nimal","lastName":"Perera","email":"n@p.lk","role":"vendor"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id.as_deref(), Some("u1"));
        assert_eq!(user.display_name(), "Nimal Perera");
        assert_eq!(user.extra["role"], "vendor");

        let back: serde_json::Value = serde_json::to_value(&user).unwrap();
        assert_eq!(back["role"], "vendor");
        assert_eq!(back["_id"], "u1");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user: User = serde_json::from_str(r#"{"email":"x@y.lk"}"#).unwrap();
        assert_eq!(user.display_name(), "x@y.lk");
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let session = Session {
            user: None,
            token: Some(String::new()),
        };
        assert!(!session.is_authenticated());
        assert!(!Session::default().is_authenticated());
    }
}
