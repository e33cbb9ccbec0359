//! Database schema and migrations.
//!
//! Migrations are applied in order when a database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: user accounts
    r#"
CREATE TABLE users (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    username             TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password             TEXT NOT NULL,           -- Argon2 hash
    first_name           TEXT NOT NULL DEFAULT '',
    middle_name          TEXT NOT NULL DEFAULT '',
    last_name            TEXT NOT NULL DEFAULT '',
    preferred_first_name TEXT NOT NULL DEFAULT '',
    email                TEXT NOT NULL DEFAULT '',
    admin_role           INTEGER NOT NULL DEFAULT 0,
    student_role         INTEGER NOT NULL DEFAULT 0,
    reviewer_role        INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL DEFAULT (datetime('now')),
    last_login           TEXT
);

CREATE INDEX idx_users_email ON users(email COLLATE NOCASE);
"#,
    // v2: invitation codes and one-time passwords
    r#"
CREATE TABLE invitation_codes (
    code        TEXT PRIMARY KEY,
    email       TEXT NOT NULL,
    role        TEXT NOT NULL,                    -- 'admin', 'student', 'reviewer'
    deadline    TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_invitation_codes_email ON invitation_codes(email COLLATE NOCASE);

CREATE TABLE one_time_passwords (
    code        TEXT PRIMARY KEY,
    email       TEXT NOT NULL,
    used        INTEGER NOT NULL DEFAULT 0,
    expires_at  TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    used_at     TEXT
);

CREATE INDEX idx_one_time_passwords_email ON one_time_passwords(email COLLATE NOCASE);
"#,
    // v3: discussion threads
    r#"
CREATE TABLE threads (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

INSERT INTO threads (name) VALUES ('General');
"#,
    // v4: posts and replies
    r#"
CREATE TABLE posts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    author        TEXT NOT NULL,
    thread_id     INTEGER NOT NULL REFERENCES threads(id),
    title         TEXT NOT NULL,
    kind          TEXT NOT NULL DEFAULT 'Post',   -- 'Post' or 'Question'
    content       TEXT NOT NULL,
    is_private    INTEGER NOT NULL DEFAULT 0,
    is_anonymous  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at    TEXT,
    deleted       INTEGER NOT NULL DEFAULT 0,
    deleted_at    TEXT
);

CREATE INDEX idx_posts_author ON posts(author);
CREATE INDEX idx_posts_thread_id ON posts(thread_id);
CREATE INDEX idx_posts_created_at ON posts(created_at);

CREATE TABLE replies (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    author      TEXT,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT
);

CREATE INDEX idx_replies_post_id ON replies(post_id);
"#,
    // v5: per-user read tracking
    r#"
CREATE TABLE post_reads (
    user_name     TEXT NOT NULL,
    post_id       INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    last_read_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (user_name, post_id)
);

CREATE TABLE reply_reads (
    user_name  TEXT NOT NULL,
    reply_id   INTEGER NOT NULL REFERENCES replies(id) ON DELETE CASCADE,
    read_at    TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (user_name, reply_id)
);
"#,
    // v6: one account per email address
    r#"
DROP INDEX idx_users_email;

CREATE UNIQUE INDEX idx_users_email ON users(email COLLATE NOCASE) WHERE email <> '';
"#,
];
