//! 组局用例

use std::sync::Arc;

use promptplay_common::GameId;
use promptplay_errors::{AppError, AppResult};
use promptplay_telemetry::names;
use tracing::{info, instrument};

use crate::domain::repositories::{GameRepository, UserRepository};
use crate::domain::services::{ExtractionService, GameMatch, MatchingService};
use crate::domain::{GameQuery, GameRequest, GameView, User};

/// 首页统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total_requests: i64,
    pub total_users: i64,
}

pub struct GameService {
    games: Arc<dyn GameRepository>,
    users: Arc<dyn UserRepository>,
    extraction: ExtractionService,
    matching: MatchingService,
}

impl GameService {
    pub fn new(
        games: Arc<dyn GameRepository>,
        users: Arc<dyn UserRepository>,
        extraction: ExtractionService,
        matching: MatchingService,
    ) -> Self {
        Self {
            games,
            users,
            extraction,
            matching,
        }
    }

    pub async fn stats(&self) -> AppResult<Stats> {
        Ok(Stats {
            total_requests: self.games.count().await?,
            total_users: self.users.count().await?,
        })
    }

    /// 全部组局，最新的在前
    pub async fn list_all(&self) -> AppResult<Vec<GameView>> {
        self.games.list(GameQuery::All).await
    }

    /// 用户发起的组局
    pub async fn hosted_by(&self, user: &User) -> AppResult<Vec<GameView>> {
        self.games.list(GameQuery::HostedBy(user.id)).await
    }

    /// 用户已被接受加入的组局
    pub async fn joined_by(&self, user: &User) -> AppResult<Vec<GameView>> {
        self.games.list(GameQuery::JoinedBy(user.id)).await
    }

    /// 用 LLM 解析描述并发布组局
    #[instrument(skip(self, host, prompt), fields(host_id = %host.id))]
    pub async fn create_from_prompt(&self, host: &User, prompt: &str) -> AppResult<GameView> {
        if prompt.trim().is_empty() {
            return Err(AppError::validation("Prompt must not be empty"));
        }

        let details = self.extraction.extract(prompt).await?;
        let game = GameRequest::new(host.id, prompt, details);
        self.games.create(&game).await?;

        metrics::counter!(names::GAME_REQUESTS_CREATED_TOTAL).increment(1);
        info!(game_id = %game.id, sport = %game.sport, "Game request created");

        Ok(GameView::new(game, host.username.clone(), 0))
    }

    /// 在开放组局中寻找匹配
    #[instrument(skip(self, prompt))]
    pub async fn find_matches(&self, prompt: &str) -> AppResult<Vec<GameMatch>> {
        metrics::counter!(names::MATCH_SEARCHES_TOTAL).increment(1);
        let candidates = self.games.list(GameQuery::Open).await?;
        self.matching.find_matches(prompt, candidates).await
    }

    /// 删除组局，只有发起人可以删除
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn delete(&self, user: &User, game_id: Option<GameId>) -> AppResult<()> {
        let game = match game_id {
            Some(id) => self.games.find_by_id(id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::not_found("Request not found"))?;

        if !game.is_hosted_by(user.id) {
            return Err(AppError::forbidden("Only the host can delete this game"));
        }

        self.games.delete(game.id).await?;
        info!(game_id = %game.id, "Game request deleted");
        Ok(())
    }
}
