#![allow(dead_code)]

//! A small in-process stand-in for a Supabase project: GoTrue token endpoints, the three PostgREST
//! tables with row-level security keyed on the bearer token, and the crate's own role-assignment
//! router mounted under `/functions/v1`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use todo_notes::admin::{self, AdminState};
use todo_notes::backend::Collaborators;
use todo_notes::models::Item;
use todo_notes::supabase::SupabaseClient;

pub const ANON_KEY: &str = "test-anon-key";
pub const SERVICE_KEY: &str = "test-service-role-key";
pub const ADMIN_CREDENTIAL: &str = "246810";
const JWT_SECRET: &[u8] = b"fake-supabase-jwt-secret";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    exp: i64,
}

struct Account {
    id: Uuid,
    email: String,
    password: String,
}

struct FakeState {
    accounts: Vec<Account>,
    todos: Vec<Item>,
    roles: HashMap<Uuid, String>,
    profiles: HashMap<Uuid, Value>,
    refresh_tokens: HashMap<String, Uuid>,
    token_lifetime_secs: i64,
    clock: DateTime<Utc>,
}

impl FakeState {
    fn new() -> Self {
        Self {
            accounts: Vec::new(),
            todos: Vec::new(),
            roles: HashMap::new(),
            profiles: HashMap::new(),
            refresh_tokens: HashMap::new(),
            token_lifetime_secs: 3600,
            clock: Utc::now() - chrono::Duration::days(1),
        }
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += chrono::Duration::seconds(60);
        self.clock
    }

    fn is_admin(&self, id: Uuid) -> bool {
        self.roles
            .get(&id)
            .map(|role| role.eq_ignore_ascii_case("admin"))
            .unwrap_or(false)
    }

    fn can_see(&self, caller: Caller, owner: Uuid) -> bool {
        match caller {
            Caller::Service => true,
            Caller::User(id) => id == owner || self.is_admin(id),
            Caller::Anon => false,
        }
    }

    fn create_account(&mut self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        self.profiles
            .insert(id, json!({ "id": id, "email": email, "full_name": null }));
        self.roles.insert(id, "user".to_string());
        id
    }

    fn mint(&mut self, id: Uuid, email: &str) -> Value {
        let exp = Utc::now().timestamp() + self.token_lifetime_secs;
        let claims = Claims { sub: id, email: email.to_string(), exp };
        let access_token = encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET))
            .unwrap_or_default();
        let refresh_token = Uuid::new_v4().simple().to_string();
        self.refresh_tokens.insert(refresh_token.clone(), id);

        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "expires_in": self.token_lifetime_secs,
            "expires_at": exp,
            "refresh_token": refresh_token,
            "user": { "id": id, "email": email },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    Anon,
    User(Uuid),
    Service,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeSupabase {
    pub base_url: String,
    state: Shared,
}

impl FakeSupabase {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let state = Arc::new(Mutex::new(FakeState::new()));

        // The function writes roles back through this same server with the service key.
        let writer = SupabaseClient::new(&base_url, SERVICE_KEY, Duration::from_secs(5))?;
        let functions = admin::router(AdminState::new(ADMIN_CREDENTIAL, Arc::new(writer)));

        let app = Router::new()
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(logout))
            .route(
                "/rest/v1/todos",
                get(list_todos)
                    .post(insert_todo)
                    .patch(update_todo)
                    .delete(delete_todo),
            )
            .route("/rest/v1/user_roles", get(select_role).patch(update_role))
            .route("/rest/v1/profiles", get(select_profiles))
            .with_state(state.clone())
            .nest("/functions/v1", functions);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { base_url, state })
    }

    /// A fresh end-user client with no session.
    pub fn client(&self) -> Arc<SupabaseClient> {
        let client = SupabaseClient::new(&self.base_url, ANON_KEY, Duration::from_secs(5))
            .expect("fake base url is valid");
        Arc::new(client)
    }

    pub fn collaborators(client: &Arc<SupabaseClient>) -> Collaborators {
        Collaborators::from_shared(client.clone())
    }

    pub fn add_account(&self, email: &str, password: &str) -> Uuid {
        self.state.lock().unwrap().create_account(email, password)
    }

    pub fn set_role(&self, id: Uuid, role: &str) {
        self.state.lock().unwrap().roles.insert(id, role.to_string());
    }

    pub fn remove_role(&self, id: Uuid) {
        self.state.lock().unwrap().roles.remove(&id);
    }

    pub fn role_of(&self, id: Uuid) -> Option<String> {
        self.state.lock().unwrap().roles.get(&id).cloned()
    }

    pub fn remove_profile(&self, id: Uuid) {
        self.state.lock().unwrap().profiles.remove(&id);
    }

    pub fn seed_todo(&self, owner: Uuid, title: &str, completed: bool) -> Uuid {
        let mut state = self.state.lock().unwrap();
        let id = Uuid::new_v4();
        let created_at = state.tick();
        state.todos.push(Item {
            id,
            owner,
            title: title.to_string(),
            content: None,
            completed,
            created_at,
        });
        id
    }

    pub fn todos(&self) -> Vec<Item> {
        self.state.lock().unwrap().todos.clone()
    }

    pub fn set_token_lifetime(&self, secs: i64) {
        self.state.lock().unwrap().token_lifetime_secs = secs;
    }

    pub fn revoke_refresh_tokens(&self) {
        self.state.lock().unwrap().refresh_tokens.clear();
    }
}

fn reject(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn caller(headers: &HeaderMap) -> Result<Caller, Response> {
    if !headers.contains_key("apikey") {
        return Err(reject(
            StatusCode::UNAUTHORIZED,
            json!({ "message": "No API key found in request" }),
        ));
    }

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or(ANON_KEY);

    if bearer == SERVICE_KEY {
        return Ok(Caller::Service);
    }
    if bearer == ANON_KEY {
        return Ok(Caller::Anon);
    }

    let mut validation = Validation::default();
    validation.leeway = 0;
    decode::<Claims>(bearer, &DecodingKey::from_secret(JWT_SECRET), &validation)
        .map(|data| Caller::User(data.claims.sub))
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, json!({ "code": "PGRST301", "message": "JWT expired" })))
}

fn eq_param(query: &HashMap<String, String>, key: &str) -> Option<Uuid> {
    query
        .get(key)
        .and_then(|v| v.strip_prefix("eq."))
        .and_then(|v| v.parse().ok())
}

async fn token(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default().to_string();

    match query.get("grant_type").map(String::as_str) {
        Some("password") => {
            let (email, password) = (field("email"), field("password"));
            let found = state
                .accounts
                .iter()
                .find(|a| a.email == email && a.password == password)
                .map(|a| (a.id, a.email.clone()));
            match found {
                Some((id, email)) => Json(state.mint(id, &email)).into_response(),
                None => reject(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
                ),
            }
        }
        Some("refresh_token") => {
            let Some(id) = state.refresh_tokens.remove(&field("refresh_token")) else {
                return reject(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token: Refresh Token Not Found" }),
                );
            };
            let email = state
                .accounts
                .iter()
                .find(|a| a.id == id)
                .map(|a| a.email.clone())
                .unwrap_or_default();
            Json(state.mint(id, &email)).into_response()
        }
        _ => reject(StatusCode::BAD_REQUEST, json!({ "msg": "unsupported_grant_type" })),
    }
}

async fn signup(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default().to_string();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default().to_string();

    if state.accounts.iter().any(|a| a.email == email) {
        return reject(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "code": 422, "msg": "User already registered" }),
        );
    }

    let id = state.create_account(&email, &password);
    Json(state.mint(id, &email)).into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    match caller(&headers) {
        Ok(Caller::User(id)) => {
            state.lock().unwrap().refresh_tokens.retain(|_, owner| *owner != id);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(_) => reject(StatusCode::UNAUTHORIZED, json!({ "msg": "This endpoint requires a Bearer token" })),
        Err(response) => response,
    }
}

async fn list_todos(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let caller = match caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let state = state.lock().unwrap();
    let owner = eq_param(&query, "user_id");

    let mut rows: Vec<Item> = state
        .todos
        .iter()
        .filter(|t| state.can_see(caller, t.owner))
        .filter(|t| owner.map(|o| o == t.owner).unwrap_or(true))
        .cloned()
        .collect();
    if query.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }
    Json(rows).into_response()
}

#[derive(Debug, Deserialize)]
struct InsertRow {
    title: String,
    #[serde(default)]
    content: Option<String>,
    user_id: Uuid,
    #[serde(default)]
    completed: bool,
}

async fn insert_todo(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(row): Json<InsertRow>,
) -> Response {
    let caller = match caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let allowed = match caller {
        Caller::User(id) => id == row.user_id,
        Caller::Service => true,
        Caller::Anon => false,
    };
    if !allowed {
        return reject(
            StatusCode::FORBIDDEN,
            json!({ "code": "42501", "message": "new row violates row-level security policy for table \"todos\"" }),
        );
    }

    let mut state = state.lock().unwrap();
    let created_at = state.tick();
    state.todos.push(Item {
        id: Uuid::new_v4(),
        owner: row.user_id,
        title: row.title,
        content: row.content,
        completed: row.completed,
        created_at,
    });
    StatusCode::CREATED.into_response()
}

async fn update_todo(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let caller = match caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Some(id) = eq_param(&query, "id") else {
        return reject(StatusCode::BAD_REQUEST, json!({ "message": "missing id filter" }));
    };
    let Some(completed) = body.get("completed").and_then(Value::as_bool) else {
        return reject(StatusCode::BAD_REQUEST, json!({ "message": "missing completed" }));
    };

    let mut state = state.lock().unwrap();
    let visible: Vec<bool> = state
        .todos
        .iter()
        .map(|t| t.id == id && state.can_see(caller, t.owner))
        .collect();
    for (todo, visible) in state.todos.iter_mut().zip(visible) {
        if visible {
            todo.completed = completed;
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_todo(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let caller = match caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Some(id) = eq_param(&query, "id") else {
        return reject(StatusCode::BAD_REQUEST, json!({ "message": "missing id filter" }));
    };

    let mut state = state.lock().unwrap();
    let hidden: Vec<bool> = state
        .todos
        .iter()
        .map(|t| t.id != id || !state.can_see(caller, t.owner))
        .collect();
    let mut keep = hidden.into_iter();
    state.todos.retain(|_| keep.next().unwrap_or(true));
    StatusCode::NO_CONTENT.into_response()
}

async fn select_role(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let caller = match caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let state = state.lock().unwrap();
    let Some(user_id) = eq_param(&query, "user_id") else {
        return Json(Vec::<Value>::new()).into_response();
    };

    let readable = match caller {
        Caller::Service => true,
        Caller::User(id) => id == user_id,
        Caller::Anon => false,
    };
    let rows: Vec<Value> = state
        .roles
        .get(&user_id)
        .filter(|_| readable)
        .map(|role| vec![json!({ "role": role })])
        .unwrap_or_default();
    Json(rows).into_response()
}

async fn update_role(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    match caller(&headers) {
        Ok(Caller::Service) => {}
        Ok(_) => {
            return reject(
                StatusCode::FORBIDDEN,
                json!({ "code": "42501", "message": "permission denied for table user_roles" }),
            )
        }
        Err(response) => return response,
    }
    let (Some(user_id), Some(role)) = (eq_param(&query, "user_id"), body.get("role").and_then(Value::as_str))
    else {
        return reject(StatusCode::BAD_REQUEST, json!({ "message": "malformed role update" }));
    };

    // PATCH touches existing rows only.
    if let Some(existing) = state.lock().unwrap().roles.get_mut(&user_id) {
        *existing = role.to_string();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn select_profiles(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let caller = match caller(&headers) {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    if caller == Caller::Anon {
        return Json(Vec::<Value>::new()).into_response();
    }

    let ids: Vec<Uuid> = query
        .get("id")
        .and_then(|v| v.strip_prefix("in.("))
        .and_then(|v| v.strip_suffix(')'))
        .map(|list| list.split(',').filter_map(|id| id.trim().parse().ok()).collect())
        .unwrap_or_default();

    let state = state.lock().unwrap();
    let rows: Vec<Value> = ids
        .iter()
        .filter_map(|id| state.profiles.get(id).cloned())
        .collect();
    Json(rows).into_response()
}
