use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, matches, messages)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                external_id         TEXT NOT NULL UNIQUE,
                email               TEXT NOT NULL UNIQUE,
                name                TEXT NOT NULL,
                bio                 TEXT,
                avatar_url          TEXT,
                role_intent         TEXT NOT NULL,
                location            TEXT,
                experience_years    INTEGER,
                previous_startups   INTEGER NOT NULL DEFAULT 0,
                is_active           INTEGER NOT NULL DEFAULT 1,
                is_banned           INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_users_created ON users(created_at);

            CREATE TABLE matches (
                id                          TEXT PRIMARY KEY,
                user_id                     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                target_user_id              TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                match_score                 INTEGER NOT NULL DEFAULT 0,
                match_explanation           TEXT,
                complementarity_score       INTEGER NOT NULL DEFAULT 0,
                commitment_alignment_score  INTEGER NOT NULL DEFAULT 0,
                location_fit_score          INTEGER NOT NULL DEFAULT 0,
                intent_score                INTEGER NOT NULL DEFAULT 0,
                interest_overlap_score      INTEGER NOT NULL DEFAULT 0,
                preference_alignment_score  INTEGER NOT NULL DEFAULT 0,
                status                      TEXT NOT NULL DEFAULT 'pending',
                intro_requested_at          TEXT,
                intro_accepted_at           TEXT,
                created_at                  TEXT NOT NULL,
                updated_at                  TEXT NOT NULL,
                UNIQUE(user_id, target_user_id),
                CHECK(user_id <> target_user_id)
            );

            CREATE INDEX idx_matches_target ON matches(target_user_id, status);
            CREATE INDEX idx_matches_intro ON matches(user_id, intro_requested_at);

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                match_id        TEXT NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                sender_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipient_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content         TEXT NOT NULL,
                message_type    TEXT NOT NULL DEFAULT 'message',
                is_read         INTEGER NOT NULL DEFAULT 0,
                read_at         TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_match ON messages(match_id, created_at);
            CREATE INDEX idx_messages_sender ON messages(sender_id, message_type, created_at);
            CREATE INDEX idx_messages_recipient ON messages(recipient_id, is_read);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
