//! Request handlers for the REST endpoints.

use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use mist_core::export::JSON_CONTENT_TYPE;
use mist_core::model::{
    hash_password, public_user, Credentials, LOGIN_FIELD, PASSWORD_FIELD, USER_COLLECTION,
};
use mist_core::{
    export, import_contacts, import_notes, Dao, ImportFormat, NoteFormat, Representation,
    UpdateResult,
};
use mist_store::{Document, Filter, ObjectId, Store, Update};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::auth::{token_from_headers, TokenValidator};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{Action, Resource, Route};

/// Response type produced by every handler.
pub type Reply = Response<Vec<u8>>;

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Document store shared by every handler.
    pub store: Store,
    /// Token issuer and validator.
    pub tokens: TokenValidator,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Store) -> Self {
        let tokens = TokenValidator::new(config.auth_config());
        Self {
            config,
            store,
            tokens,
        }
    }

    /// Returns a Dao on `collection` of the default database.
    pub fn dao(&self, collection: &str) -> Dao {
        Dao::new(self.store.clone(), collection)
    }
}

/// Handler for API requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Runs the handler for a resolved route.
    ///
    /// # Errors
    ///
    /// Every failure is a [`ServerError`] whose status becomes the
    /// response status.
    pub fn dispatch(&self, route: Route, request: &Request<Vec<u8>>) -> ServerResult<Reply> {
        let body = request.body().as_slice();
        match route {
            Route::Preflight => Ok(empty(StatusCode::OK)),
            Route::Login => self.login(body),
            Route::Register => self.register(body),
            Route::CurrentUser => self.current_user(&self.authenticate(request.headers())?),
            Route::UpdateUser => self.update_user(&self.authenticate(request.headers())?, body),
            Route::RemoveUser => self.remove_user(&self.authenticate(request.headers())?),
            Route::Resource(resource, action) => {
                let owner = self.authenticate(request.headers())?;
                self.resource(resource, action, &owner, request)
            }
        }
    }

    /// Returns the owner id carried by the request token.
    fn authenticate(&self, headers: &HeaderMap) -> ServerResult<String> {
        let token = token_from_headers(headers)
            .ok_or_else(|| ServerError::NotAuthorized("missing token".into()))?;
        let claims = self.context.tokens.validate_token(token)?;
        ObjectId::parse(&claims.iss)
            .map(|id| id.to_hex())
            .map_err(|_| ServerError::NotAuthorized("invalid token issuer".into()))
    }

    // ---- notes and contacts ----

    fn resource(
        &self,
        resource: Resource,
        action: Action,
        owner: &str,
        request: &Request<Vec<u8>>,
    ) -> ServerResult<Reply> {
        let dao = self.context.dao(resource.collection());
        let not_found =
            |id: &str| ServerError::NotFound(format!("unable to find {} with id {id}", resource.collection()));

        match action {
            Action::FindAll => json(StatusCode::OK, &dao.find_all(owner)?),
            Action::Find(id) => match dao.find_by_id(owner, &id)? {
                Some(document) => json(StatusCode::OK, &document),
                None => Err(not_found(&id)),
            },
            Action::Insert => self.insert(&dao, owner, request.body()),
            Action::Update(id) => {
                match dao.update_checked(owner, &id, document_body(request.body())?)? {
                    UpdateResult::Updated(modified) => json(StatusCode::OK, &modified),
                    UpdateResult::Conflict(current) => Err(ServerError::Conflict(current)),
                    UpdateResult::NotFound => Err(not_found(&id)),
                }
            }
            Action::Remove(id) => match dao.remove(owner, &id)? {
                0 => Err(not_found(&id)),
                removed => json(StatusCode::OK, &removed),
            },
            Action::Import => self.import(resource, &dao, owner, request),
            Action::Export => {
                let accept = header(request.headers(), ACCEPT);
                let representation = Representation::negotiate(accept).ok_or_else(|| {
                    ServerError::NotAcceptable(format!(
                        "cannot export {} as {}",
                        resource.export_root(),
                        accept.unwrap_or_default()
                    ))
                })?;
                let export = export(dao.find_all(owner)?, resource.export_root(), representation)?;
                Ok(reply(StatusCode::OK, export.content_type, export.body.into_bytes()))
            }
        }
    }

    fn insert(&self, dao: &Dao, owner: &str, body: &[u8]) -> ServerResult<Reply> {
        match json_body(body)? {
            Value::Array(items) => {
                let documents = items
                    .into_iter()
                    .map(into_document)
                    .collect::<ServerResult<Vec<_>>>()?;
                json(StatusCode::OK, &dao.insert(owner, documents)?)
            }
            value => {
                let inserted = dao.insert(owner, vec![into_document(value)?])?;
                let document = inserted
                    .into_iter()
                    .next()
                    .ok_or_else(|| ServerError::InvalidRequest("document rejected by the store".into()))?;
                json(StatusCode::OK, &document)
            }
        }
    }

    fn import(
        &self,
        resource: Resource,
        dao: &Dao,
        owner: &str,
        request: &Request<Vec<u8>>,
    ) -> ServerResult<Reply> {
        let content_type = header(request.headers(), CONTENT_TYPE).unwrap_or_default();
        let unsupported = || {
            ServerError::UnsupportedMediaType(format!(
                "cannot import {} from {content_type:?}",
                resource.export_root()
            ))
        };
        let inserted = match resource {
            Resource::Note => {
                let format = NoteFormat::from_content_type(content_type).ok_or_else(unsupported)?;
                import_notes(dao, owner, format, request.body())?
            }
            Resource::Contact => {
                let format = ImportFormat::from_content_type(content_type).ok_or_else(unsupported)?;
                import_contacts(dao, owner, format, request.body())?
            }
        };
        json(StatusCode::OK, &inserted)
    }

    // ---- users ----

    fn users(&self) -> Dao {
        self.context.dao(USER_COLLECTION)
    }

    fn login(&self, body: &[u8]) -> ServerResult<Reply> {
        let credentials: Credentials = serde_json::from_slice(body)
            .map_err(|e| ServerError::InvalidRequest(format!("malformed credentials: {e}")))?;
        let Some(user) = self.users().raw_find_one(&credentials.to_filter())? else {
            debug!(login = %credentials.login, "login refused");
            return Err(ServerError::NotAuthorized("invalid login or password".into()));
        };
        let id = user
            .id()
            .ok_or_else(|| ServerError::Internal("user document without id".into()))?;
        let issued = self.context.tokens.create_token(&id.to_hex())?;
        info!(login = %credentials.login, user = %id, "user logged in");
        json(
            StatusCode::OK,
            &json!({
                "token": issued.token,
                "expires": issued.expires,
                "user": public_user(user),
            }),
        )
    }

    fn register(&self, body: &[u8]) -> ServerResult<Reply> {
        let mut user = document_body(body)?;
        let login = required_str(&user, LOGIN_FIELD)?;
        let password = required_str(&user, PASSWORD_FIELD)?;

        let users = self.users();
        if users
            .raw_find_one(&Filter::all().eq(LOGIN_FIELD, login.as_str()))?
            .is_some()
        {
            return Err(ServerError::AlreadyExists(format!("login {login}")));
        }

        user.insert(PASSWORD_FIELD, hash_password(&password));
        let mut outcome = users.raw_insert(vec![user], false)?;
        if let Some(failure) = outcome.failures.pop() {
            return Err(ServerError::InvalidRequest(failure.message));
        }
        let user = outcome
            .inserted
            .pop()
            .ok_or_else(|| ServerError::Internal("user was not written".into()))?;
        info!(%login, "user registered");
        json(StatusCode::OK, &public_user(user))
    }

    fn current_user(&self, owner: &str) -> ServerResult<Reply> {
        match self.users().raw_find_one(&user_filter(owner)?)? {
            Some(user) => json(StatusCode::OK, &public_user(user)),
            None => Err(ServerError::NotFound("unable to find user".into())),
        }
    }

    fn update_user(&self, owner: &str, body: &[u8]) -> ServerResult<Reply> {
        let mut fields = document_body(body)?;
        let users = self.users();

        if let Some(login) = fields.get_str(LOGIN_FIELD) {
            let taken = users
                .raw_find_one(&Filter::all().eq(LOGIN_FIELD, login))?
                .and_then(|other| other.id())
                .is_some_and(|id| id.to_hex() != owner);
            if taken {
                return Err(ServerError::AlreadyExists(format!("login {login}")));
            }
        }
        if let Some(hash) = fields.get_str(PASSWORD_FIELD).map(hash_password) {
            fields.insert(PASSWORD_FIELD, hash);
        }

        let outcome = users.raw_update(&user_filter(owner)?, &Update::Set(fields))?;
        if outcome.matched == 0 {
            return Err(ServerError::NotFound("unable to find user".into()));
        }
        self.current_user(owner)
    }

    fn remove_user(&self, owner: &str) -> ServerResult<Reply> {
        match self.users().raw_remove(&user_filter(owner)?)? {
            0 => Err(ServerError::NotFound("unable to find user".into())),
            removed => {
                info!(user = owner, "user removed");
                json(StatusCode::OK, &removed)
            }
        }
    }
}

fn user_filter(owner: &str) -> ServerResult<Filter> {
    ObjectId::parse(owner)
        .map(Filter::by_id)
        .map_err(|_| ServerError::NotAuthorized("invalid token issuer".into()))
}

fn required_str(document: &Document, field: &str) -> ServerResult<String> {
    document
        .get_str(field)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ServerError::InvalidRequest(format!("{field} is required")))
}

fn header(headers: &HeaderMap, name: http::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn json_body(body: &[u8]) -> ServerResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| ServerError::InvalidRequest(format!("malformed JSON body: {e}")))
}

fn into_document(value: Value) -> ServerResult<Document> {
    let mut document = Document::from_value(value)
        .ok_or_else(|| ServerError::InvalidRequest("expected a JSON object".into()))?;
    document.strip_identity();
    Ok(document)
}

/// Parses a write body, dropping `_id` and `_user`.
fn document_body(body: &[u8]) -> ServerResult<Document> {
    into_document(json_body(body)?)
}

fn reply(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Reply {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn empty(status: StatusCode) -> Reply {
    let mut response = Response::new(Vec::new());
    *response.status_mut() = status;
    response
}

fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> ServerResult<Reply> {
    let bytes = serde_json::to_vec(body).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(reply(status, JSON_CONTENT_TYPE, bytes))
}

/// Builds the response for a failed request.
///
/// A conflict returns the current document; every other error returns
/// `{"error": message}`.
pub fn error_reply(error: &ServerError) -> Reply {
    let body = match error {
        ServerError::Conflict(current) => serde_json::to_vec(current),
        other => serde_json::to_vec(&json!({ "error": other.to_string() })),
    };
    reply(error.status(), JSON_CONTENT_TYPE, body.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_bodies_lose_identity_fields() {
        let doc = document_body(br#"{"_id": "x", "_user": "y", "title": "a"}"#).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.get_str("title"), Some("a"));

        assert!(matches!(
            document_body(b"[1, 2]"),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(
            document_body(b"{oops"),
            Err(ServerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn error_bodies() {
        let reply = error_reply(&ServerError::NotFound("unable to find note with id 1".into()));
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(reply.body()).unwrap();
        assert_eq!(body, json!({"error": "unable to find note with id 1"}));

        let current = Document::from_value(json!({"title": "a"})).unwrap();
        let reply = error_reply(&ServerError::Conflict(current));
        assert_eq!(reply.status(), StatusCode::CONFLICT);
        let body: Value = serde_json::from_slice(reply.body()).unwrap();
        assert_eq!(body, json!({"title": "a"}));
    }

    #[test]
    fn required_fields() {
        let doc = Document::from_value(json!({"login": "ada", "password": ""})).unwrap();
        assert_eq!(required_str(&doc, "login").unwrap(), "ada");
        assert!(required_str(&doc, "password").is_err());
        assert!(required_str(&doc, "email").is_err());
    }
}
