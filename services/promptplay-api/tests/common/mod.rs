//! 测试用内存 repositories 和脚本化 LLM

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use promptplay_adapter_llm::{ChatRequest, LlmClient, LlmPurpose};
use promptplay_api::api::http::{AppState, build_router};
use promptplay_api::application::{AuthService, GameService, JoinRequestService};
use promptplay_api::domain::repositories::{
    GameRepository, JoinRequestRepository, UserRepository,
};
use promptplay_api::domain::services::{ExtractionService, MatchingService};
use promptplay_api::domain::{
    GameQuery, GameRequest, GameStatus, GameView, JoinRequest, JoinRequestView, JoinStatus,
    NewJoinRequest, NewUser, User,
};
use promptplay_auth_core::TokenService;
use promptplay_common::{GameId, JoinRequestId, UserId};
use promptplay_config::ServerConfig;
use promptplay_errors::{AppError, AppResult};
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
struct Store {
    users: Vec<User>,
    games: Vec<GameRequest>,
    join_requests: Vec<JoinRequest>,
}

impl Store {
    fn username(&self, id: UserId) -> String {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn accepted(&self, game_id: GameId) -> i64 {
        self.join_requests
            .iter()
            .filter(|r| r.game_id == game_id && r.status == JoinStatus::Accepted)
            .count() as i64
    }

    fn view(&self, game: &GameRequest) -> GameView {
        GameView::new(game.clone(), self.username(game.host_id), self.accepted(game.id))
    }

    fn join_view(&self, request: &JoinRequest) -> JoinRequestView {
        JoinRequestView {
            request: request.clone(),
            username: self.username(request.user_id),
        }
    }
}

/// 三个 repository 共享同一份内存数据，模拟外键级联
#[derive(Clone, Default)]
pub struct InMemoryDb {
    store: Arc<Mutex<Store>>,
}

impl InMemoryDb {
    pub fn game_status(&self, id: GameId) -> Option<GameStatus> {
        let store = self.store.lock().unwrap();
        store.games.iter().find(|g| g.id == id).map(|g| g.status)
    }

    pub fn join_request_count(&self) -> usize {
        self.store.lock().unwrap().join_requests.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryDb {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> AppResult<bool> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().any(|u| u.username == username))
    }

    async fn exists_by_email(&self, email: &str) -> AppResult<bool> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().any(|u| u.email.as_deref() == Some(email)))
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::validation("Username or email already exists"));
        }
        let created = User {
            id: UserId(store.users.len() as i64 + 1),
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            is_guest: user.is_guest,
            created_at: Utc::now(),
        };
        store.users.push(created.clone());
        Ok(created)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.store.lock().unwrap().users.len() as i64)
    }
}

#[async_trait]
impl GameRepository for InMemoryDb {
    async fn create(&self, game: &GameRequest) -> AppResult<()> {
        self.store.lock().unwrap().games.push(game.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: GameId) -> AppResult<Option<GameRequest>> {
        let store = self.store.lock().unwrap();
        Ok(store.games.iter().find(|g| g.id == id).cloned())
    }

    async fn list(&self, query: GameQuery) -> AppResult<Vec<GameView>> {
        let store = self.store.lock().unwrap();
        let mut views: Vec<GameView> = store
            .games
            .iter()
            .filter(|g| match query {
                GameQuery::All => true,
                GameQuery::Open => g.status == GameStatus::Open,
                GameQuery::HostedBy(id) => g.host_id == id,
                GameQuery::JoinedBy(id) => store.join_requests.iter().any(|r| {
                    r.game_id == g.id && r.user_id == id && r.status == JoinStatus::Accepted
                }),
            })
            .map(|g| store.view(g))
            .collect();
        // 插入顺序的倒序即创建时间倒序
        views.reverse();
        Ok(views)
    }

    async fn update_status(&self, id: GameId, status: GameStatus) -> AppResult<()> {
        let mut store = self.store.lock().unwrap();
        if let Some(game) = store.games.iter_mut().find(|g| g.id == id) {
            game.status = status;
        }
        Ok(())
    }

    async fn delete(&self, id: GameId) -> AppResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.games.len();
        store.games.retain(|g| g.id != id);
        store.join_requests.retain(|r| r.game_id != id);
        Ok(store.games.len() != before)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.store.lock().unwrap().games.len() as i64)
    }
}

#[async_trait]
impl JoinRequestRepository for InMemoryDb {
    async fn create(&self, request: NewJoinRequest) -> AppResult<JoinRequest> {
        let mut store = self.store.lock().unwrap();
        let now = Utc::now();
        let created = JoinRequest {
            id: JoinRequestId(store.join_requests.len() as i64 + 1),
            game_id: request.game_id,
            user_id: request.user_id,
            description: request.description,
            status: JoinStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        store.join_requests.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: JoinRequestId) -> AppResult<Option<JoinRequestView>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .join_requests
            .iter()
            .find(|r| r.id == id)
            .map(|r| store.join_view(r)))
    }

    async fn exists_for(&self, game_id: GameId, user_id: UserId) -> AppResult<bool> {
        let store = self.store.lock().unwrap();
        Ok(store
            .join_requests
            .iter()
            .any(|r| r.game_id == game_id && r.user_id == user_id))
    }

    async fn list_for_game(&self, game_id: GameId) -> AppResult<Vec<JoinRequestView>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .join_requests
            .iter()
            .filter(|r| r.game_id == game_id)
            .map(|r| store.join_view(r))
            .collect())
    }

    async fn update_status(&self, id: JoinRequestId, status: JoinStatus) -> AppResult<JoinRequest> {
        let mut store = self.store.lock().unwrap();
        let request = store
            .join_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::not_found("Join request not found"))?;
        request.status = status;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    async fn count_accepted(&self, game_id: GameId) -> AppResult<i64> {
        Ok(self.store.lock().unwrap().accepted(game_id))
    }
}

/// 按描述原文返回预设抽取结果；匹配时运动项目出现在新描述中即视为匹配
#[derive(Default)]
pub struct ScriptedLlm {
    extractions: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn with_extraction(self, prompt: &str, reply: &str) -> Self {
        self.extractions
            .lock()
            .unwrap()
            .insert(prompt.to_string(), reply.to_string());
        self
    }

    pub fn calls(&self, purpose: LlmPurpose) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.purpose == purpose)
            .count()
    }
}

fn field<'a>(message: &'a str, label: &str) -> &'a str {
    message
        .lines()
        .find_map(|line| line.strip_prefix(label))
        .unwrap_or_default()
        .trim()
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> AppResult<String> {
        self.calls.lock().unwrap().push(request.clone());

        match request.purpose {
            LlmPurpose::Extraction => self
                .extractions
                .lock()
                .unwrap()
                .get(&request.user)
                .cloned()
                .ok_or_else(|| AppError::external_service("LLM API error: no script")),
            LlmPurpose::Matching => {
                let wanted = field(&request.user, "New request:").to_lowercase();
                let sport = field(&request.user, "Sport:").to_lowercase();
                let location = field(&request.user, "Location:").to_lowercase();
                let is_match = !sport.is_empty() && wanted.contains(&sport);
                let score = if !is_match {
                    5
                } else if wanted.contains(&location) {
                    90
                } else {
                    60
                };
                Ok(serde_json::json!({
                    "is_match": is_match,
                    "compatibility_score": score,
                    "reason": format!("{} game", sport),
                })
                .to_string())
            }
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: InMemoryDb,
    pub llm: Arc<ScriptedLlm>,
}

impl TestApp {
    pub fn new(llm: ScriptedLlm) -> Self {
        let db = InMemoryDb::default();
        let llm = Arc::new(llm);
        let tokens = Arc::new(TokenService::new(
            "test-secret-key-at-least-32-characters",
            3600,
            "promptplay",
            "promptplay-web",
        ));

        let users: Arc<dyn UserRepository> = Arc::new(db.clone());
        let games: Arc<dyn GameRepository> = Arc::new(db.clone());
        let join_requests: Arc<dyn JoinRequestRepository> = Arc::new(db.clone());

        let state = AppState::new(
            Arc::new(AuthService::new(users.clone(), tokens)),
            Arc::new(GameService::new(
                games.clone(),
                users,
                ExtractionService::new(llm.clone(), 0.3),
                MatchingService::new(llm.clone(), 0.5, 2),
            )),
            Arc::new(JoinRequestService::new(games, join_requests)),
        );

        Self {
            router: build_router(state, &ServerConfig::default()),
            db,
            llm,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, token, Some(body)).await
    }

    /// 注册用户并返回访问令牌
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "secret123",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// 发布组局并返回 ID
    pub async fn create_game(&self, token: &str, prompt: &str) -> String {
        let (status, body) = self
            .post(
                "/create-request",
                Some(token),
                serde_json::json!({ "prompt": prompt }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

pub const TENNIS_PROMPT: &str = "Need 2 players for tennis at The Meadows tomorrow 4pm";
pub const TENNIS_REPLY: &str = r#"{"sport": "tennis", "location": "The Meadows", "datetime_utc": "2030-06-01T16:00:00", "players_needed": 2}"#;

pub const FOOTBALL_PROMPT: &str = "Football 5-a-side at Leith Links on Saturday at 10, need 4";
pub const FOOTBALL_REPLY: &str = r#"```json
{"sport": "football", "location": "Leith Links", "datetime_utc": "2030-06-05 10:00:00", "players_needed": 4}
```"#;

pub const VAGUE_PROMPT: &str = "Anyone up for tennis?";
pub const VAGUE_REPLY: &str = r#"{"sport": "tennis", "location": "unknown", "datetime_utc": null, "players_needed": 0}"#;

pub fn scripted_llm() -> ScriptedLlm {
    ScriptedLlm::default()
        .with_extraction(TENNIS_PROMPT, TENNIS_REPLY)
        .with_extraction(FOOTBALL_PROMPT, FOOTBALL_REPLY)
        .with_extraction(VAGUE_PROMPT, VAGUE_REPLY)
}
