//! The API server.

use std::path::Path;
use std::sync::Arc;

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::{HeaderValue, Request, Response};
use mist_store::Store;
use tracing::{debug, error, info};

use crate::auth::TokenValidator;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{error_reply, HandlerContext, RequestHandler};
use crate::router::Route;

/// Origins allowed to call the API.
pub const ALLOWED_ORIGIN: &str = "*";

/// Methods announced to browsers.
pub const ALLOWED_METHODS: &str = "GET,PUT,PATCH,POST,DELETE,OPTIONS";

/// Request headers announced to browsers.
pub const ALLOWED_HEADERS: &str =
    "Content-Type, Authorization, Content-Length, X-Requested-With, Api-Token";

/// The API server.
///
/// Request handling is framework-agnostic: any HTTP listener can turn its
/// requests into `http::Request<Vec<u8>>` and hand them to
/// [`ApiServer::handle`].
///
/// # Example
///
/// ```
/// use http::{Method, Request, StatusCode};
/// use mist_server::{ApiServer, ServerConfig};
/// use mist_store::{Store, StoreConfig};
///
/// let config = ServerConfig::new(
///     StoreConfig::new().host("localhost").port(27017).database("mist"),
/// )
/// .with_secret("s3cret");
/// let server = ApiServer::bootstrap(config, Store::in_memory()).unwrap();
///
/// let request = Request::builder()
///     .method(Method::GET)
///     .uri("/note")
///     .body(Vec::new())
///     .unwrap();
/// assert_eq!(server.handle(request).status(), StatusCode::UNAUTHORIZED);
///
/// server.shutdown().unwrap();
/// ```
pub struct ApiServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl ApiServer {
    /// Creates a server over a store that is already open.
    pub fn new(config: ServerConfig, store: Store) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Validates the configuration and opens the store it describes.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for invalid settings and
    /// [`ServerError::Database`] if a database cannot be opened.
    pub fn bootstrap(config: ServerConfig, store: Store) -> ServerResult<Self> {
        config.validate()?;
        store.open_with(&config.database)?;
        info!(
            host = %config.server.host,
            port = config.server.port,
            databases = ?store.databases(),
            "api server bootstrapped"
        );
        Ok(Self::new(config, store))
    }

    /// Loads the first configuration file found among `candidates`, then
    /// bootstraps from it.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ServerConfig::load_first`] and
    /// [`ApiServer::bootstrap`].
    pub fn bootstrap_from<P: AsRef<Path>>(candidates: &[P], store: Store) -> ServerResult<Self> {
        let (_, config) = ServerConfig::load_first(candidates)?;
        Self::bootstrap(config, store)
    }

    /// Handles one request. Never fails: errors become error responses.
    ///
    /// Every response carries the CORS headers.
    pub fn handle(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let result = Route::resolve(&method, &path)
            .ok_or_else(|| ServerError::NotFound(format!("no route for {method} {path}")))
            .and_then(|route| self.handler.dispatch(route, &request));

        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                if e.is_server_error() {
                    error!(%method, %path, error = %e, "request failed");
                } else {
                    debug!(%method, %path, error = %e, "request rejected");
                }
                error_reply(&e)
            }
        };
        allow_cross_origin(&mut response);
        debug!(%method, %path, status = response.status().as_u16(), "request handled");
        response
    }

    /// Closes every database connection.
    ///
    /// # Errors
    ///
    /// Returns the first close failure; the other connections are closed
    /// regardless.
    pub fn shutdown(&self) -> ServerResult<()> {
        info!("api server shutting down");
        self.context.store.close(None)?;
        info!("api server closed");
        Ok(())
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Returns the document store.
    pub fn store(&self) -> &Store {
        &self.context.store
    }

    /// Returns the token issuer, for hosts issuing tokens out of band.
    pub fn tokens(&self) -> &TokenValidator {
        &self.context.tokens
    }
}

impl std::fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiServer")
            .field("host", &self.context.config.server.host)
            .field("port", &self.context.config.server.port)
            .field("databases", &self.context.store.databases())
            .finish_non_exhaustive()
    }
}

fn allow_cross_origin(response: &mut Response<Vec<u8>>) {
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOWED_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use mist_store::StoreConfig;

    fn config() -> ServerConfig {
        ServerConfig::new(StoreConfig::new().host("localhost").port(27017).database("mist"))
            .with_secret("s3cret")
    }

    fn request(method: Method, uri: &str) -> Request<Vec<u8>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    #[test]
    fn server_lifecycle() {
        let server = ApiServer::bootstrap(config(), Store::in_memory()).unwrap();
        assert!(server.store().is_open("mist"));
        assert_eq!(server.store().default_database().as_deref(), Some("mist"));

        server.shutdown().unwrap();
        assert!(!server.store().is_open("mist"));
    }

    #[test]
    fn bootstrap_rejects_bad_config() {
        let err = ApiServer::bootstrap(config().with_secret(""), Store::in_memory()).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));

        let no_database = ServerConfig::new(StoreConfig::new().host("localhost").port(27017))
            .with_secret("s3cret");
        let err = ApiServer::bootstrap(no_database, Store::in_memory()).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn debug_hides_the_secret() {
        let server = ApiServer::bootstrap(config(), Store::in_memory()).unwrap();
        let debug = format!("{server:?}");
        assert!(debug.contains("localhost"));
        assert!(debug.contains("\"mist\""));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn preflight_answers_with_cors_headers() {
        let server = ApiServer::bootstrap(config(), Store::in_memory()).unwrap();
        let response = server.handle(request(Method::OPTIONS, "/note/123"));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_HEADERS], ALLOWED_HEADERS);
    }

    #[test]
    fn errors_carry_cors_headers() {
        let server = ApiServer::bootstrap(config(), Store::in_memory()).unwrap();

        let response = server.handle(request(Method::GET, "/nowhere"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let response = server.handle(request(Method::GET, "/contact"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
