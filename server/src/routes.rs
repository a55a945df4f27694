//! HTTP route handlers for the to-do list server.
//!
//! This module provides the HTTP endpoints:
//!
//! - `GET /lists`, `GET /lists/new`, `POST /lists` - List index and creation
//! - `GET /lists/{id}`, `GET /lists/{id}/edit`, `POST /lists/{id}` - View and rename
//! - `POST /lists/{id}/destroy`, `POST /lists/{id}/complete_all` - Delete and bulk complete
//! - `POST /lists/{id}/todos`, `POST /lists/{id}/todos/{todo_id}`,
//!   `POST /lists/{id}/todos/{todo_id}/destroy` - Todo management
//! - `GET /health` - Health check endpoint
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`], which contains:
//! - Configuration (cookie settings)
//! - The session store, behind the [`SessionStore`] trait
//! - Server start time for uptime reporting
//!
//! Every page handler extracts a [`Session`], runs a domain operation from
//! [`crate::todos`] on its data, and finishes with [`Session::commit`], which
//! writes the data back and sets the session cookie for new browsers.
//!
//! # Flow Control
//!
//! - Success: set a success flash and redirect (`303 See Other`).
//! - Validation failure: set an error flash and re-render the originating
//!   form with `200 OK`, keeping the submitted text.
//! - Unknown list or todo: set an error flash and redirect to `/lists`.
//! - Script-driven deletes (`X-Requested-With: XMLHttpRequest`) answer
//!   `204 No Content` instead of redirecting.
//!
//! # Example
//!
//! ```rust,no_run
//! use todo_lists_server::routes::{create_router, AppState};
//! use todo_lists_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     let state = AppState::new(config);
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Path, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::TodoError;
use crate::session::{generate_session_token, MemorySessionStore, SessionStore};
use crate::todos;
use crate::types::{Flash, SessionData};
use crate::views;

// ============================================================================
// Constants
// ============================================================================

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "todo_session";

/// Header a script sets to ask for a bare status instead of a redirect.
const HEADER_REQUESTED_WITH: &str = "X-Requested-With";

/// Value of [`HEADER_REQUESTED_WITH`] sent by script-driven requests.
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

/// Maximum accepted form body size (16 KB).
const MAX_BODY_SIZE: usize = 16 * 1024;

const LIST_CREATED_MESSAGE: &str = "The list has been created.";
const LIST_UPDATED_MESSAGE: &str = "The list has been updated.";
const LIST_DELETED_MESSAGE: &str = "The list has been deleted.";
const TODO_ADDED_MESSAGE: &str = "The todo was added.";
const TODO_DELETED_MESSAGE: &str = "Todo removed";
const TODO_UPDATED_MESSAGE: &str = "Todo was updated.";
const ALL_COMPLETED_MESSAGE: &str = "All todos complete.";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
///
/// Cloned for each request handler; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Per-browser session records.
    pub sessions: Arc<dyn SessionStore>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates application state backed by an in-memory session store sized
    /// from `config`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use todo_lists_server::routes::AppState;
    /// use todo_lists_server::config::Config;
    ///
    /// let config = Config::from_env().expect("failed to load config");
    /// let state = AppState::new(config);
    /// ```
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = MemorySessionStore::new(config.session_store_config());
        Self::with_store(config, Arc::new(store))
    }

    /// Creates application state with a custom session store.
    ///
    /// Useful for testing or when sessions live outside the process.
    #[must_use]
    pub fn with_store(config: Config, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
///
/// # Example
///
/// ```rust,no_run
/// use todo_lists_server::routes::{create_router, AppState};
/// use todo_lists_server::config::Config;
///
/// let config = Config::from_env().expect("failed to load config");
/// let state = AppState::new(config);
/// let router = create_router(state);
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .route("/lists", get(get_lists).post(post_lists))
        .route("/lists/new", get(get_new_list))
        .route("/lists/{list_id}", get(get_list).post(post_list))
        .route("/lists/{list_id}/edit", get(get_edit_list))
        .route("/lists/{list_id}/destroy", post(post_destroy_list))
        .route("/lists/{list_id}/complete_all", post(post_complete_all))
        .route("/lists/{list_id}/todos", post(post_todos))
        .route("/lists/{list_id}/todos/{todo_id}", post(post_todo))
        .route(
            "/lists/{list_id}/todos/{todo_id}/destroy",
            post(post_destroy_todo),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Session extraction
// ============================================================================

/// The requesting browser's session, loaded for the duration of a request.
///
/// Extracting a `Session` never fails: a missing, unknown, or expired cookie
/// starts a fresh, empty session under a newly generated token.
pub struct Session {
    token: String,
    is_new: bool,

    /// The browser's lists and pending flash messages.
    pub data: SessionData,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let existing = session_token_from_headers(&parts.headers)
            .and_then(|token| state.sessions.get(&token).map(|data| (token, data)));

        let session = match existing {
            Some((token, data)) => Self {
                token,
                is_new: false,
                data,
            },
            None => {
                debug!("Starting new session");
                Self {
                    token: generate_session_token(),
                    is_new: true,
                    data: SessionData::default(),
                }
            }
        };

        Ok(session)
    }
}

impl Session {
    /// Saves the session data and finishes the response.
    ///
    /// New sessions get a `Set-Cookie` header. If the store refuses the
    /// write, the response is replaced by `503 Service Unavailable`.
    ///
    /// A new session that still holds no data is neither stored nor sent
    /// a cookie; it is created by the first request that changes it.
    pub fn commit(self, state: &AppState, response: impl IntoResponse) -> Response {
        if self.is_new && self.data == SessionData::default() {
            return response.into_response();
        }

        if let Err(err) = state.sessions.set(&self.token, self.data) {
            warn!(error = %err, "Failed to save session");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Too many active sessions, please try again later.",
            )
                .into_response();
        }

        let mut response = response.into_response();
        if self.is_new {
            let cookie = session_cookie(&self.token, state.config.secure_cookie);
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(err) => warn!(error = %err, "Failed to encode session cookie"),
            }
        }

        response
    }

    /// Redirects to `location` after saving the session.
    fn redirect(self, state: &AppState, location: &str) -> Response {
        self.commit(state, Redirect::to(location))
    }

    /// Records `err` as an error flash and redirects to the list index.
    fn not_found(mut self, state: &AppState, err: &TodoError) -> Response {
        debug!(error = %err, "Referenced entity not found");
        self.data.flash.set_error(err.message());
        self.redirect(state, "/lists")
    }

    /// Renders a page, consuming the pending flash messages.
    ///
    /// If `page` fails, the flash is restored and the browser is sent back
    /// to the list index with the error.
    fn render<F>(mut self, state: &AppState, page: F) -> Response
    where
        F: FnOnce(&SessionData, &Flash) -> Result<String, TodoError>,
    {
        let flash = self.data.flash.take();
        match page(&self.data, &flash) {
            Ok(html) => self.commit(state, Html(html)),
            Err(err) => {
                self.data.flash = flash;
                self.not_found(state, &err)
            }
        }
    }
}

/// Reads the session token from the request's `Cookie` headers.
fn session_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Builds the `Set-Cookie` value for a new session.
///
/// No `Max-Age`: the cookie lives as long as the browser session.
fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Returns true if the request was sent by page script rather than a form.
fn is_script_request(headers: &HeaderMap) -> bool {
    headers
        .get(HEADER_REQUESTED_WITH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == XML_HTTP_REQUEST)
}

/// Parses an id path segment. Anything that is not a number matches nothing.
fn parse_id(segment: &str) -> Result<u64, TodoError> {
    segment.parse().map_err(|_| TodoError::list_not_found())
}

// ============================================================================
// Forms
// ============================================================================

/// Body of the create and rename list forms.
#[derive(Debug, Deserialize)]
pub struct ListForm {
    #[serde(default)]
    pub list_name: String,
}

/// Body of the add todo form.
#[derive(Debug, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    pub todo: String,
}

/// Body of the todo completion toggle. Anything but `"true"` means incomplete.
#[derive(Debug, Deserialize)]
pub struct CompletionForm {
    #[serde(default)]
    pub completed: Option<String>,
}

impl CompletionForm {
    fn is_completed(&self) -> bool {
        self.completed.as_deref() == Some("true")
    }
}

// ============================================================================
// Lists
// ============================================================================

/// GET / - Redirects to the list index.
async fn get_root() -> Redirect {
    Redirect::to("/lists")
}

/// GET /lists - Renders all lists, incomplete ones first.
async fn get_lists(State(state): State<AppState>, session: Session) -> Response {
    session.render(&state, |data, flash| {
        Ok(views::lists_page(&data.lists, flash))
    })
}

/// GET /lists/new - Renders the list creation form.
async fn get_new_list(State(state): State<AppState>, session: Session) -> Response {
    session.render(&state, |_, flash| Ok(views::new_list_page("", flash)))
}

/// POST /lists - Creates a list.
///
/// # Responses
///
/// - `303 See Other` to `/lists` - List created
/// - `200 OK` - Creation form re-rendered with the validation error
async fn post_lists(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<ListForm>,
) -> Response {
    match todos::create_list(&mut session.data.lists, &form.list_name) {
        Ok(list) => {
            info!(list_id = list.id, "List created");
            session.data.flash.set_success(LIST_CREATED_MESSAGE);
            session.redirect(&state, "/lists")
        }
        Err(err) => {
            debug!(error = %err, "List creation rejected");
            session.data.flash.set_error(err.message());
            session.render(&state, |_, flash| {
                Ok(views::new_list_page(&form.list_name, flash))
            })
        }
    }
}

/// GET /lists/{id} - Renders a single list.
async fn get_list(
    State(state): State<AppState>,
    session: Session,
    Path(list_id): Path<String>,
) -> Response {
    session.render(&state, |data, flash| {
        let list = todos::find_list(&data.lists, parse_id(&list_id)?)?;
        Ok(views::list_page(list, "", flash))
    })
}

/// GET /lists/{id}/edit - Renders the rename form.
async fn get_edit_list(
    State(state): State<AppState>,
    session: Session,
    Path(list_id): Path<String>,
) -> Response {
    session.render(&state, |data, flash| {
        let list = todos::find_list(&data.lists, parse_id(&list_id)?)?;
        Ok(views::edit_list_page(list, &list.name, flash))
    })
}

/// POST /lists/{id} - Renames a list.
///
/// # Responses
///
/// - `303 See Other` to `/lists/{id}` - List renamed
/// - `200 OK` - Rename form re-rendered with the validation error
/// - `303 See Other` to `/lists` - Unknown list
async fn post_list(
    State(state): State<AppState>,
    mut session: Session,
    Path(list_id): Path<String>,
    Form(form): Form<ListForm>,
) -> Response {
    let id = match parse_id(&list_id) {
        Ok(id) => id,
        Err(err) => return session.not_found(&state, &err),
    };

    match todos::rename_list(&mut session.data.lists, id, &form.list_name) {
        Ok(()) => {
            info!(list_id = id, "List renamed");
            session.data.flash.set_success(LIST_UPDATED_MESSAGE);
            session.redirect(&state, &format!("/lists/{id}"))
        }
        Err(err) if err.is_validation() => {
            debug!(list_id = id, error = %err, "List rename rejected");
            session.data.flash.set_error(err.message());
            session.render(&state, |data, flash| {
                let list = todos::find_list(&data.lists, id)?;
                Ok(views::edit_list_page(list, &form.list_name, flash))
            })
        }
        Err(err) => session.not_found(&state, &err),
    }
}

/// POST /lists/{id}/destroy - Deletes a list.
///
/// Deleting an unknown list is not an error.
///
/// # Responses
///
/// - `204 No Content` - Script-driven request
/// - `303 See Other` to `/lists` - Form submission
async fn post_destroy_list(
    State(state): State<AppState>,
    mut session: Session,
    headers: HeaderMap,
    Path(list_id): Path<String>,
) -> Response {
    if let Ok(id) = parse_id(&list_id) {
        if todos::delete_list(&mut session.data.lists, id).is_some() {
            info!(list_id = id, "List deleted");
        }
    }

    if is_script_request(&headers) {
        session.commit(&state, StatusCode::NO_CONTENT)
    } else {
        session.data.flash.set_success(LIST_DELETED_MESSAGE);
        session.redirect(&state, "/lists")
    }
}

/// POST /lists/{id}/complete_all - Marks every todo in a list complete.
async fn post_complete_all(
    State(state): State<AppState>,
    mut session: Session,
    Path(list_id): Path<String>,
) -> Response {
    let list = match parse_id(&list_id)
        .and_then(|id| todos::find_list_mut(&mut session.data.lists, id))
    {
        Ok(list) => list,
        Err(err) => return session.not_found(&state, &err),
    };

    todos::complete_all(list);
    let id = list.id;
    info!(list_id = id, "All todos completed");

    session.data.flash.set_success(ALL_COMPLETED_MESSAGE);
    session.redirect(&state, &format!("/lists/{id}"))
}

// ============================================================================
// Todos
// ============================================================================

/// POST /lists/{id}/todos - Adds a todo to a list.
///
/// # Responses
///
/// - `303 See Other` to `/lists/{id}` - Todo added
/// - `200 OK` - List page re-rendered with the validation error
/// - `303 See Other` to `/lists` - Unknown list
async fn post_todos(
    State(state): State<AppState>,
    mut session: Session,
    Path(list_id): Path<String>,
    Form(form): Form<TodoForm>,
) -> Response {
    let list = match parse_id(&list_id)
        .and_then(|id| todos::find_list_mut(&mut session.data.lists, id))
    {
        Ok(list) => list,
        Err(err) => return session.not_found(&state, &err),
    };
    let id = list.id;

    match todos::add_todo(list, &form.todo) {
        Ok(todo) => {
            info!(list_id = id, todo_id = todo.id, "Todo added");
            session.data.flash.set_success(TODO_ADDED_MESSAGE);
            session.redirect(&state, &format!("/lists/{id}"))
        }
        Err(err) => {
            debug!(list_id = id, error = %err, "Todo rejected");
            session.data.flash.set_error(err.message());
            session.render(&state, |data, flash| {
                let list = todos::find_list(&data.lists, id)?;
                Ok(views::list_page(list, &form.todo, flash))
            })
        }
    }
}

/// POST /lists/{id}/todos/{todo_id} - Sets a todo's completion flag.
async fn post_todo(
    State(state): State<AppState>,
    mut session: Session,
    Path((list_id, todo_id)): Path<(String, String)>,
    Form(form): Form<CompletionForm>,
) -> Response {
    let completed = form.is_completed();
    let result = parse_id(&list_id).and_then(|id| {
        let list = todos::find_list_mut(&mut session.data.lists, id)?;
        let todo_id = todo_id.parse().map_err(|_| TodoError::todo_not_found())?;
        todos::set_todo_completion(list, todo_id, completed)?;
        Ok((id, todo_id))
    });

    match result {
        Ok((id, todo_id)) => {
            info!(list_id = id, todo_id, completed, "Todo updated");
            session.data.flash.set_success(TODO_UPDATED_MESSAGE);
            session.redirect(&state, &format!("/lists/{id}"))
        }
        Err(err) => session.not_found(&state, &err),
    }
}

/// POST /lists/{id}/todos/{todo_id}/destroy - Deletes a todo.
///
/// Deleting an unknown todo of an existing list is not an error.
///
/// # Responses
///
/// - `204 No Content` - Script-driven request
/// - `303 See Other` to `/lists/{id}` - Form submission
/// - `303 See Other` to `/lists` - Unknown list
async fn post_destroy_todo(
    State(state): State<AppState>,
    mut session: Session,
    headers: HeaderMap,
    Path((list_id, todo_id)): Path<(String, String)>,
) -> Response {
    let list = match parse_id(&list_id)
        .and_then(|id| todos::find_list_mut(&mut session.data.lists, id))
    {
        Ok(list) => list,
        Err(err) => return session.not_found(&state, &err),
    };
    let id = list.id;

    if let Ok(todo_id) = todo_id.parse::<u64>() {
        if todos::delete_todo(list, todo_id).is_some() {
            info!(list_id = id, todo_id, "Todo deleted");
        }
    }

    if is_script_request(&headers) {
        session.commit(&state, StatusCode::NO_CONTENT)
    } else {
        session.data.flash.set_success(TODO_DELETED_MESSAGE);
        session.redirect(&state, &format!("/lists/{id}"))
    }
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of sessions held by the store.
    pub sessions: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint.
///
/// Does not touch or create a session.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed();

    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.sessions.len(),
        uptime_seconds: uptime.as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::LOCATION, Request};
    use tower::ServiceExt;

    use crate::error::{LIST_NAME_UNIQUE_MESSAGE, LIST_NOT_FOUND_MESSAGE};
    use crate::types::{Todo, TodoList};

    const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

    /// Builds a router over `store` so tests can inspect session records.
    fn test_app(store: &MemorySessionStore) -> Router {
        let state = AppState::with_store(Config::default(), Arc::new(store.clone()));
        create_router(state)
    }

    /// Stores `data` under a fresh token and returns the matching cookie header.
    fn seed_session(store: &MemorySessionStore, data: SessionData) -> (String, String) {
        let token = generate_session_token();
        store.set(&token, data).unwrap();
        let cookie = format!("{SESSION_COOKIE}={token}");
        (token, cookie)
    }

    fn groceries() -> SessionData {
        SessionData {
            lists: vec![TodoList {
                id: 1,
                name: "Groceries".to_string(),
                todos: vec![
                    Todo {
                        id: 1,
                        name: "Milk".to_string(),
                        completed: false,
                    },
                    Todo {
                        id: 2,
                        name: "Eggs".to_string(),
                        completed: false,
                    },
                ],
            }],
            flash: Flash::default(),
        }
    }

    fn get(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(COOKIE, cookie)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    // ========================================================================
    // Session handling
    // ========================================================================

    #[test]
    fn session_token_is_read_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; todo_session=abc123; lang=en"),
        );
        assert_eq!(session_token_from_headers(&headers), Some("abc123".to_string()));

        let headers = HeaderMap::new();
        assert_eq!(session_token_from_headers(&headers), None);
    }

    #[test]
    fn session_cookie_attributes() {
        assert_eq!(
            session_cookie("tok", false),
            "todo_session=tok; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(session_cookie("tok", true).ends_with("; Secure"));
    }

    #[test]
    fn script_request_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_script_request(&headers));

        headers.insert(HEADER_REQUESTED_WITH, HeaderValue::from_static("XMLHttpRequest"));
        assert!(is_script_request(&headers));

        headers.insert(HEADER_REQUESTED_WITH, HeaderValue::from_static("fetch"));
        assert!(!is_script_request(&headers));
    }

    fn anonymous_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn first_change_creates_session_and_sets_cookie() {
        let store = MemorySessionStore::default();
        let app = test_app(&store);

        let response = app
            .oneshot(anonymous_post("/lists", "list_name=Groceries"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("new session should set a cookie");
        assert!(cookie.starts_with("todo_session="));
        assert!(cookie.contains("HttpOnly"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn anonymous_page_views_store_nothing() {
        let store = MemorySessionStore::default();
        let app = test_app(&store);

        for uri in ["/lists", "/lists/new", "/"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert!(response.status().is_success() || response.status().is_redirection());
            assert!(response.headers().get(SET_COOKIE).is_none(), "{uri}");
        }

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn anonymous_page_views_do_not_use_up_capacity() {
        let store = MemorySessionStore::new(crate::session::SessionStoreConfig::new(
            3,
            std::time::Duration::from_secs(300),
        ));
        let app = test_app(&store);

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(Request::builder().uri("/lists").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(store.len(), 0);

        let response = app
            .oneshot(anonymous_post("/lists", "list_name=Groceries"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn rejected_first_change_stores_nothing() {
        let store = MemorySessionStore::default();

        let response = test_app(&store)
            .oneshot(anonymous_post("/lists", "list_name="))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn known_session_does_not_reset_cookie() {
        let store = MemorySessionStore::default();
        let (_, cookie) = seed_session(&store, SessionData::default());

        let response = test_app(&store).oneshot(get("/lists", &cookie)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_session_cookie_starts_fresh_session() {
        let store = MemorySessionStore::default();
        let stale = format!("{SESSION_COOKIE}={}", "a".repeat(43));

        let response = test_app(&store)
            .oneshot(post_form("/lists", &stale, "list_name=Groceries"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(!cookie.contains(&"a".repeat(43)));
    }

    #[tokio::test]
    async fn full_store_returns_service_unavailable() {
        let store = MemorySessionStore::new(crate::session::SessionStoreConfig::new(
            1,
            std::time::Duration::from_secs(300),
        ));
        seed_session(&store, SessionData::default());

        let response = test_app(&store)
            .oneshot(anonymous_post("/lists", "list_name=Groceries"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // ========================================================================
    // Lists
    // ========================================================================

    #[tokio::test]
    async fn root_redirects_to_lists() {
        let app = test_app(&MemorySessionStore::default());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists");
    }

    #[tokio::test]
    async fn new_list_form_renders() {
        let store = MemorySessionStore::default();
        let (_, cookie) = seed_session(&store, SessionData::default());

        let response = test_app(&store).oneshot(get("/lists/new", &cookie)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(r#"<form action="/lists" method="post">"#));
    }

    #[tokio::test]
    async fn create_list_redirects_with_success_flash() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, SessionData::default());

        let response = test_app(&store)
            .oneshot(post_form("/lists", &cookie, "list_name=Groceries"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists");

        let data = store.get(&token).unwrap();
        assert_eq!(data.lists.len(), 1);
        assert_eq!(data.lists[0].name, "Groceries");
        assert_eq!(data.flash.success.as_deref(), Some(LIST_CREATED_MESSAGE));
    }

    #[tokio::test]
    async fn flash_is_shown_once_then_cleared() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, SessionData::default());
        let app = test_app(&store);

        app.clone()
            .oneshot(post_form("/lists", &cookie, "list_name=Groceries"))
            .await
            .unwrap();

        let first = body_string(app.clone().oneshot(get("/lists", &cookie)).await.unwrap()).await;
        assert!(first.contains(LIST_CREATED_MESSAGE));
        assert!(store.get(&token).unwrap().flash.is_empty());

        let second = body_string(app.oneshot(get("/lists", &cookie)).await.unwrap()).await;
        assert!(!second.contains(LIST_CREATED_MESSAGE));
    }

    #[tokio::test]
    async fn duplicate_list_name_rerenders_form_with_error() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists", &cookie, "list_name=+Groceries+"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(LIST_NAME_UNIQUE_MESSAGE));
        assert!(body.contains(r#"value=" Groceries ""#));

        let data = store.get(&token).unwrap();
        assert_eq!(data.lists.len(), 1);
        assert!(data.flash.is_empty());
    }

    #[tokio::test]
    async fn missing_list_name_field_fails_validation() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, SessionData::default());

        let response = test_app(&store)
            .oneshot(post_form("/lists", &cookie, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(store.get(&token).unwrap().lists.is_empty());
    }

    #[tokio::test]
    async fn show_list_renders_todos() {
        let store = MemorySessionStore::default();
        let (_, cookie) = seed_session(&store, groceries());

        let response = test_app(&store).oneshot(get("/lists/1", &cookie)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("Groceries"));
        assert!(body.contains("<span>Milk</span>"));
        assert!(body.contains("<span>2 / 2</span>"));
    }

    #[tokio::test]
    async fn show_missing_list_redirects_with_error() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        for uri in ["/lists/99", "/lists/abc", "/lists/99/edit"] {
            let response = test_app(&store).oneshot(get(uri, &cookie)).await.unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/lists");
            let data = store.get(&token).unwrap();
            assert_eq!(data.flash.error.as_deref(), Some(LIST_NOT_FOUND_MESSAGE));
        }
    }

    #[tokio::test]
    async fn edit_form_prefills_current_name() {
        let store = MemorySessionStore::default();
        let (_, cookie) = seed_session(&store, groceries());

        let response = test_app(&store).oneshot(get("/lists/1/edit", &cookie)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(r#"value="Groceries""#));
    }

    #[tokio::test]
    async fn rename_list_redirects_to_list() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1", &cookie, "list_name=Shopping"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists/1");

        let data = store.get(&token).unwrap();
        assert_eq!(data.lists[0].name, "Shopping");
        assert_eq!(data.flash.success.as_deref(), Some(LIST_UPDATED_MESSAGE));
    }

    #[tokio::test]
    async fn rename_list_with_empty_name_rerenders_edit_form() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1", &cookie, "list_name="))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("between 1 and 100 characters"));
        assert!(body.contains("Editing 'Groceries'"));
        assert_eq!(store.get(&token).unwrap().lists[0].name, "Groceries");
    }

    #[tokio::test]
    async fn rename_missing_list_redirects_to_index() {
        let store = MemorySessionStore::default();
        let (_, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/7", &cookie, "list_name=Anything"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists");
    }

    #[tokio::test]
    async fn destroy_list_with_form_redirects() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1/destroy", &cookie, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists");

        let data = store.get(&token).unwrap();
        assert!(data.lists.is_empty());
        assert_eq!(data.flash.success.as_deref(), Some(LIST_DELETED_MESSAGE));
    }

    #[tokio::test]
    async fn destroy_list_from_script_returns_no_content() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/lists/1/destroy")
                    .header(COOKIE, &cookie)
                    .header(HEADER_REQUESTED_WITH, XML_HTTP_REQUEST)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_string(response).await.is_empty());

        let data = store.get(&token).unwrap();
        assert!(data.lists.is_empty());
        assert!(data.flash.is_empty());
    }

    #[tokio::test]
    async fn destroy_missing_list_is_idempotent() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/42/destroy", &cookie, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(store.get(&token).unwrap().lists.len(), 1);
    }

    #[tokio::test]
    async fn complete_all_marks_todos() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1/complete_all", &cookie, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists/1");

        let data = store.get(&token).unwrap();
        assert!(todos::is_list_complete(&data.lists[0]));
        assert_eq!(data.flash.success.as_deref(), Some(ALL_COMPLETED_MESSAGE));
    }

    // ========================================================================
    // Todos
    // ========================================================================

    #[tokio::test]
    async fn add_todo_appends_and_redirects() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1/todos", &cookie, "todo=Bread"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists/1");

        let data = store.get(&token).unwrap();
        let todo = data.lists[0].todos.last().unwrap();
        assert_eq!(todo.id, 3);
        assert_eq!(todo.name, "Bread");
        assert!(!todo.completed);
        assert_eq!(data.flash.success.as_deref(), Some(TODO_ADDED_MESSAGE));
    }

    #[tokio::test]
    async fn add_empty_todo_rerenders_list_page() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1/todos", &cookie, "todo=+++"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("Todo name must be between 1 and 100 characters."));
        assert_eq!(store.get(&token).unwrap().lists[0].todos.len(), 2);
    }

    #[tokio::test]
    async fn add_todo_to_missing_list_redirects_to_index() {
        let store = MemorySessionStore::default();
        let (_, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/5/todos", &cookie, "todo=Bread"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists");
    }

    #[tokio::test]
    async fn toggle_todo_completion() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());
        let app = test_app(&store);

        let response = app
            .clone()
            .oneshot(post_form("/lists/1/todos/2", &cookie, "completed=true"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists/1");
        let data = store.get(&token).unwrap();
        assert!(data.lists[0].todos[1].completed);
        assert_eq!(data.flash.success.as_deref(), Some(TODO_UPDATED_MESSAGE));

        app.oneshot(post_form("/lists/1/todos/2", &cookie, "completed=yes"))
            .await
            .unwrap();
        assert!(!store.get(&token).unwrap().lists[0].todos[1].completed);
    }

    #[tokio::test]
    async fn toggle_missing_todo_redirects_with_error() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1/todos/9", &cookie, "completed=true"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists");
        assert_eq!(
            store.get(&token).unwrap().flash.error.as_deref(),
            Some("The specified todo was not found.")
        );
    }

    #[tokio::test]
    async fn destroy_todo_with_form_redirects_to_list() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(post_form("/lists/1/todos/1/destroy", &cookie, ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/lists/1");

        let data = store.get(&token).unwrap();
        assert_eq!(data.lists[0].todos.len(), 1);
        assert_eq!(data.lists[0].todos[0].name, "Eggs");
        assert_eq!(data.flash.success.as_deref(), Some(TODO_DELETED_MESSAGE));
    }

    #[tokio::test]
    async fn destroy_todo_from_script_returns_no_content() {
        let store = MemorySessionStore::default();
        let (token, cookie) = seed_session(&store, groceries());

        let response = test_app(&store)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/lists/1/todos/2/destroy")
                    .header(COOKIE, &cookie)
                    .header(HEADER_REQUESTED_WITH, XML_HTTP_REQUEST)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let data = store.get(&token).unwrap();
        assert_eq!(data.lists[0].todos.len(), 1);
        assert!(data.flash.is_empty());
    }

    // ========================================================================
    // Health endpoint
    // ========================================================================

    #[tokio::test]
    async fn health_returns_ok_without_creating_session() {
        let store = MemorySessionStore::default();
        let app = test_app(&store);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.sessions, 0);
    }

    #[tokio::test]
    async fn health_reports_session_count() {
        let store = MemorySessionStore::default();
        seed_session(&store, SessionData::default());
        seed_session(&store, SessionData::default());

        let response = test_app(&store)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.sessions, 2);
    }
}
