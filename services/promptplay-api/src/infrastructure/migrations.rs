//! 数据库 schema

use promptplay_adapter_postgres::Migration;

const CREATE_USERS: &str = r#"
CREATE TABLE users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(255) NOT NULL UNIQUE,
    email VARCHAR(255) UNIQUE,
    hashed_password TEXT,
    is_guest BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

const CREATE_GAME_REQUESTS: &str = r#"
CREATE TABLE game_requests (
    id UUID PRIMARY KEY,
    host_id BIGINT NOT NULL REFERENCES users(id),
    original_prompt TEXT NOT NULL,
    sport VARCHAR(255) NOT NULL,
    location VARCHAR(255) NOT NULL,
    datetime_utc TIMESTAMPTZ NOT NULL,
    players_needed INTEGER NOT NULL CHECK (players_needed > 0),
    status VARCHAR(16) NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'full', 'cancelled')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_game_requests_host_id ON game_requests(host_id);
CREATE INDEX idx_game_requests_status_created_at ON game_requests(status, created_at DESC);
"#;

const CREATE_JOIN_REQUESTS: &str = r#"
CREATE TABLE join_requests (
    id BIGSERIAL PRIMARY KEY,
    game_id UUID NOT NULL REFERENCES game_requests(id) ON DELETE CASCADE,
    user_id BIGINT NOT NULL REFERENCES users(id),
    description TEXT,
    status VARCHAR(16) NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'accepted', 'rejected')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_join_requests_game_user UNIQUE (game_id, user_id)
);

CREATE INDEX idx_join_requests_user_status ON join_requests(user_id, status);
"#;

/// 按版本排列的全部迁移
pub fn schema_migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_users", CREATE_USERS).with_down("DROP TABLE IF EXISTS users"),
        Migration::new(2, "create_game_requests", CREATE_GAME_REQUESTS)
            .with_down("DROP TABLE IF EXISTS game_requests"),
        Migration::new(3, "create_join_requests", CREATE_JOIN_REQUESTS)
            .with_down("DROP TABLE IF EXISTS join_requests"),
    ]
}
