//! 加入申请用例

use std::sync::Arc;

use promptplay_common::{GameId, JoinRequestId};
use promptplay_errors::{AppError, AppResult};
use tracing::{info, instrument};

use crate::domain::repositories::{GameRepository, JoinRequestRepository};
use crate::domain::{GameRequest, GameStatus, JoinDecision, JoinRequestView, NewJoinRequest, User};

pub struct JoinRequestService {
    games: Arc<dyn GameRepository>,
    join_requests: Arc<dyn JoinRequestRepository>,
}

impl JoinRequestService {
    pub fn new(
        games: Arc<dyn GameRepository>,
        join_requests: Arc<dyn JoinRequestRepository>,
    ) -> Self {
        Self {
            games,
            join_requests,
        }
    }

    async fn load_game(&self, game_id: Option<GameId>) -> AppResult<GameRequest> {
        match game_id {
            Some(id) => self.games.find_by_id(id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::not_found("Game not found"))
    }

    /// 申请加入组局
    #[instrument(skip(self, user, description), fields(user_id = %user.id))]
    pub async fn request_to_join(
        &self,
        user: &User,
        game_id: Option<GameId>,
        description: Option<String>,
    ) -> AppResult<JoinRequestView> {
        let game = self.load_game(game_id).await?;

        if !game.is_open() {
            return Err(AppError::validation("Game is not open for joining"));
        }
        if game.is_hosted_by(user.id) {
            return Err(AppError::validation("You cannot join your own game"));
        }
        if self.join_requests.exists_for(game.id, user.id).await? {
            return Err(AppError::validation(
                "You have already requested to join this game",
            ));
        }

        let request = self
            .join_requests
            .create(NewJoinRequest {
                game_id: game.id,
                user_id: user.id,
                description,
            })
            .await?;

        info!(join_request_id = %request.id, game_id = %game.id, "Join request created");
        Ok(JoinRequestView {
            request,
            username: user.username.clone(),
        })
    }

    /// 组局的全部申请，只有发起人可以查看
    pub async fn list_for_game(
        &self,
        user: &User,
        game_id: Option<GameId>,
    ) -> AppResult<Vec<JoinRequestView>> {
        let game = self.load_game(game_id).await?;
        if !game.is_hosted_by(user.id) {
            return Err(AppError::forbidden("Only the host can view join requests"));
        }

        self.join_requests.list_for_game(game.id).await
    }

    /// 接受或拒绝申请，接受后人数达到需求时组局满员
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn decide(
        &self,
        user: &User,
        request_id: JoinRequestId,
        status: &str,
    ) -> AppResult<JoinRequestView> {
        let existing = self
            .join_requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::not_found("Join request not found"))?;

        let game = self.load_game(Some(existing.request.game_id)).await?;
        if !game.is_hosted_by(user.id) {
            return Err(AppError::forbidden(
                "Only the host can accept/reject join requests",
            ));
        }

        let decision = JoinDecision::parse(status).ok_or_else(|| {
            AppError::validation("Status must be 'accepted' or 'rejected'")
        })?;

        let request = self
            .join_requests
            .update_status(request_id, decision.status())
            .await?;

        if decision == JoinDecision::Accept {
            let accepted = self.join_requests.count_accepted(game.id).await?;
            if game.is_filled_by(accepted) && game.status != GameStatus::Full {
                self.games.update_status(game.id, GameStatus::Full).await?;
                info!(game_id = %game.id, accepted, "Game is now full");
            }
        }

        info!(join_request_id = %request_id, status = %request.status, "Join request decided");
        Ok(JoinRequestView {
            request,
            username: existing.username,
        })
    }
}
