//! Repository traits

use async_trait::async_trait;
use promptplay_common::{GameId, JoinRequestId, UserId};
use promptplay_errors::AppResult;

use crate::domain::{
    GameQuery, GameRequest, GameStatus, GameView, JoinRequest, JoinRequestView, JoinStatus,
    NewJoinRequest, NewUser, User,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    /// 根据用户名查找用户
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn exists_by_username(&self, username: &str) -> AppResult<bool>;

    async fn exists_by_email(&self, email: &str) -> AppResult<bool>;

    /// 插入用户，用户名或邮箱冲突时返回校验错误
    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn count(&self) -> AppResult<i64>;
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn create(&self, game: &GameRequest) -> AppResult<()>;

    async fn find_by_id(&self, id: GameId) -> AppResult<Option<GameRequest>>;

    /// 按查询条件列出组局，按创建时间倒序
    async fn list(&self, query: GameQuery) -> AppResult<Vec<GameView>>;

    async fn update_status(&self, id: GameId, status: GameStatus) -> AppResult<()>;

    /// 删除组局及其加入申请，返回是否存在
    async fn delete(&self, id: GameId) -> AppResult<bool>;

    async fn count(&self) -> AppResult<i64>;
}

#[async_trait]
pub trait JoinRequestRepository: Send + Sync {
    /// 插入申请，同一用户对同一组局重复申请时返回校验错误
    async fn create(&self, request: NewJoinRequest) -> AppResult<JoinRequest>;

    async fn find_by_id(&self, id: JoinRequestId) -> AppResult<Option<JoinRequestView>>;

    async fn exists_for(&self, game_id: GameId, user_id: UserId) -> AppResult<bool>;

    /// 组局的全部申请，按申请时间排序
    async fn list_for_game(&self, game_id: GameId) -> AppResult<Vec<JoinRequestView>>;

    /// 更新状态并返回更新后的申请
    async fn update_status(&self, id: JoinRequestId, status: JoinStatus) -> AppResult<JoinRequest>;

    async fn count_accepted(&self, game_id: GameId) -> AppResult<i64>;
}
