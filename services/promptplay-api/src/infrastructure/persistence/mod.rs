//! PostgreSQL 持久化

mod postgres_game_repository;
mod postgres_join_request_repository;
mod postgres_user_repository;

pub use postgres_game_repository::PostgresGameRepository;
pub use postgres_join_request_repository::PostgresJoinRequestRepository;
pub use postgres_user_repository::PostgresUserRepository;
