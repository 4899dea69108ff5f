use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::io::api::ApiError;
use crate::io::session_store::{
    KeyValueStore, StoreError, clear_session, load_session, save_session,
};
use crate::model::session::{Session, User};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of a successful signup or login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// The two auth endpoints.
#[allow(async_fn_in_trait)]
pub trait AuthApi {
    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError>;
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
}

/// Error type for auth flows
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0} is required")]
    Incomplete(&'static str),
    /// Server rejection or transport failure, already phrased for the user
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err.server_message() {
            Some(message) => AuthError::Rejected(message.to_string()),
            None => AuthError::Rejected(err.to_string()),
        }
    }
}

/// Session as last persisted.
pub fn hydrate<K: KeyValueStore + ?Sized>(store: &K) -> Result<Session, StoreError> {
    load_session(store)
}

/// Sign in and persist the user and token. Storage is untouched on failure.
pub async fn login<A, K>(
    api: &A,
    store: &mut K,
    request: &LoginRequest,
) -> Result<Session, AuthError>
where
    A: AuthApi + ?Sized,
    K: KeyValueStore + ?Sized,
{
    require("Email", &request.email)?;
    require("Password", &request.password)?;
    let response = api.login(request).await.inspect_err(|e| {
        warn!(error = %e, "login rejected");
    })?;
    establish(store, response)
}

/// Create an account and persist the returned user and token.
pub async fn signup<A, K>(
    api: &A,
    store: &mut K,
    request: &SignupRequest,
) -> Result<Session, AuthError>
where
    A: AuthApi + ?Sized,
    K: KeyValueStore + ?Sized,
{
    require("First name", &request.first_name)?;
    require("Last name", &request.last_name)?;
    require("Email", &request.email)?;
    require("Password", &request.password)?;
    let response = api.signup(request).await.inspect_err(|e| {
        warn!(error = %e, "signup rejected");
    })?;
    establish(store, response)
}

/// Clear storage and return the signed-out session.
pub fn logout<K: KeyValueStore + ?Sized>(store: &mut K) -> Result<Session, StoreError> {
    clear_session(store)?;
    info!("signed out");
    Ok(Session::default())
}

fn establish<K: KeyValueStore + ?Sized>(
    store: &mut K,
    response: AuthResponse,
) -> Result<Session, AuthError> {
    let session = Session::signed_in(response.user, response.token);
    save_session(store, &session)?;
    info!(user = %session.user.as_ref().map(User::display_name).unwrap_or_default(), "signed in");
    Ok(session)
}

fn require(label: &'static str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Incomplete(label));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::session_store::{MemoryStore, TOKEN_KEY, USER_KEY};
    use pretty_assertions::assert_eq;

    struct Backend {
        accept: bool,
    }

    impl Backend {
        fn respond(&self, email: &str) -> Result<AuthResponse, ApiError> {
            if !self.accept {
                return Err(ApiError::Rejected {
                    status: 401,
                    message: Some("Invalid credentials".to_string()),
                });
            }
            let user = serde_json::from_value(serde_json::json!({
                "_id": "u1", "firstName": "Nimal", "lastName": "Perera", "email": email
            }))
            .unwrap();
            Ok(AuthResponse {
                user,
                token: "jwt-1".to_string(),
                message: None,
            })
        }
    }

    impl AuthApi for Backend {
        async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
            self.respond(&request.email)
        }

        async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
            self.respond(&request.email)
        }
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            email: "n@p.lk".to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_persists_then_logout_clears() {
        let mut store = MemoryStore::default();
        let session = login(&Backend { accept: true }, &mut store, &login_request())
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));
        assert_eq!(hydrate(&store).unwrap(), session);

        assert_eq!(logout(&mut store).unwrap(), Session::default());
        assert_eq!(store.get(USER_KEY).unwrap(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_storage_alone() {
        let mut store = MemoryStore::default();
        store.set(TOKEN_KEY, "old").unwrap();

        let err = login(&Backend { accept: false }, &mut store, &login_request())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_signup_requires_every_field() {
        let mut store = MemoryStore::default();
        let request = SignupRequest {
            first_name: "Nimal".to_string(),
            last_name: " ".to_string(),
            email: "n@p.lk".to_string(),
            password: "pw".to_string(),
        };
        let err = signup(&Backend { accept: true }, &mut store, &request)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Last name is required");
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_signup_body_is_camel_case() {
        let request = SignupRequest {
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "e".to_string(),
            password: "p".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["firstName"], "A");
        assert_eq!(json["lastName"], "B");
    }
}
