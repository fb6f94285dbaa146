//! Database schema and migrations for feedpin.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Initial schema - posts and clock
    r#"
-- One row per accepted feed link; rows are never deleted
CREATE TABLE posts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    link        TEXT NOT NULL UNIQUE,
    pin_days    INTEGER NOT NULL DEFAULT 0,
    post_id     INTEGER,                    -- external post id, set once confirmed
    featured    INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX idx_posts_featured ON posts(featured, pin_days);

-- Key/value clock state; 'day' holds the last observed weekday (0 = Sunday)
CREATE TABLE clock (
    key     TEXT PRIMARY KEY,
    value   INTEGER NOT NULL
);

INSERT INTO clock (key, value) VALUES ('day', 0);
"#,
];
