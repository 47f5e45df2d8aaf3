//! SQLite database layer (embedded, no external dependencies)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gamescore_core::{
    Event, EventPatch, EventStatus, EventTokenHashes, GameScore, ScoreSubmission, Scoreboard,
    Team,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;

/// An event together with the digests of its access tokens
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event: Event,
    pub tokens: EventTokenHashes,
}

pub struct Database {
    pool: Arc<SqlitePool>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        // Create parent directory if needed
        if let Some(parent) = std::path::Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        tracing::info!("SQLite connection established, running migrations...");

        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Private in-memory database. A single connection is kept alive for the
    /// pool's lifetime since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::run_migrations(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        // Events table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                allow_negative INTEGER NOT NULL DEFAULT 0,
                admin_token_hash TEXT NOT NULL UNIQUE,
                scorer_token_hash TEXT NOT NULL UNIQUE,
                public_token_hash TEXT NOT NULL UNIQUE,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Teams table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                UNIQUE (event_id, name)
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Game scores table, one row per (event, team, game)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS game_scores (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
                game_number INTEGER NOT NULL,
                points INTEGER NOT NULL,
                submission_id TEXT,
                created_at DATETIME NOT NULL,
                edited_at DATETIME,
                UNIQUE (event_id, team_id, game_number)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_game_scores_event ON game_scores (event_id, game_number)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // Event operations
    pub async fn create_event(
        &self,
        event: &Event,
        tokens: &EventTokenHashes,
        teams: &[Team],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO events (id, name, status, allow_negative,
                                admin_token_hash, scorer_token_hash, public_token_hash,
                                created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(event.status.to_string())
        .bind(event.allow_negative)
        .bind(&tokens.admin)
        .bind(&tokens.scorer)
        .bind(&tokens.public)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        for team in teams {
            sqlx::query(
                r#"
                INSERT INTO teams (id, event_id, name, created_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&team.id)
            .bind(&team.event_id)
            .bind(&team.name)
            .bind(event.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_event(&self, id: &str) -> Result<Option<EventRecord>> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, status, allow_negative,
                   admin_token_hash, scorer_token_hash, public_token_hash,
                   created_at, updated_at
            FROM events WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    /// Look up the event owning a token digest, whatever its role
    pub async fn find_event_by_token_hash(&self, token_hash: &str) -> Result<Option<EventRecord>> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, status, allow_negative,
                   admin_token_hash, scorer_token_hash, public_token_hash,
                   created_at, updated_at
            FROM events
            WHERE admin_token_hash = ?1 OR scorer_token_hash = ?1 OR public_token_hash = ?1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    pub async fn update_event(&self, id: &str, patch: &EventPatch) -> Result<Option<Event>> {
        let result = sqlx::query(
            r#"
            UPDATE events SET
                name = COALESCE(?1, name),
                status = COALESCE(?2, status),
                allow_negative = COALESCE(?3, allow_negative),
                updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.status.map(|s| s.to_string()))
        .bind(patch.allow_negative)
        .bind(Utc::now())
        .bind(id)
        .execute(&*self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(self.get_event(id).await?.map(|record| record.event))
    }

    pub async fn list_active_events(&self) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, name, status, allow_negative,
                   admin_token_hash, scorer_token_hash, public_token_hash,
                   created_at, updated_at
            FROM events
            WHERE status = 'active'
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| EventRecord::from(r).event)
            .collect())
    }

    // Team operations
    pub async fn list_teams(&self, event_id: &str) -> Result<Vec<Team>> {
        let rows: Vec<TeamRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.event_id, t.name, COALESCE(SUM(s.points), 0) AS total_points
            FROM teams t
            LEFT JOIN game_scores s ON s.team_id = t.id
            WHERE t.event_id = ?1
            GROUP BY t.id, t.event_id, t.name
            ORDER BY total_points DESC, t.name ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    pub async fn team_in_event(&self, event_id: &str, team_id: &str) -> Result<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT id FROM teams WHERE id = ?1 AND event_id = ?2
            "#,
        )
        .bind(team_id)
        .bind(event_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.is_some())
    }

    // Score operations

    /// Insert a score, or replace the points of an existing (team, game) pair.
    /// A missing `submission_id` keeps the one already stored.
    pub async fn upsert_score(&self, event_id: &str, score: &ScoreSubmission) -> Result<GameScore> {
        let now = Utc::now();
        let row: ScoreRow = sqlx::query_as(
            r#"
            INSERT INTO game_scores (id, event_id, team_id, game_number, points, submission_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (event_id, team_id, game_number) DO UPDATE SET
                points = excluded.points,
                edited_at = ?7,
                submission_id = COALESCE(excluded.submission_id, game_scores.submission_id)
            RETURNING id, event_id, team_id, game_number, points, submission_id, created_at, edited_at
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(event_id)
        .bind(&score.team_id)
        .bind(score.game_number)
        .bind(score.points)
        .bind(&score.submission_id)
        .bind(now)
        .fetch_one(&*self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn list_scores(&self, event_id: &str) -> Result<Vec<GameScore>> {
        let rows: Vec<ScoreRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, team_id, game_number, points, submission_id, created_at, edited_at
            FROM game_scores
            WHERE event_id = ?1
            ORDER BY game_number ASC, created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    pub async fn scoreboard(&self, event_id: &str) -> Result<Option<Scoreboard>> {
        let Some(record) = self.get_event(event_id).await? else {
            return Ok(None);
        };

        let teams = self.list_teams(event_id).await?;
        let scores = self.list_scores(event_id).await?;

        Ok(Some(Scoreboard::new(record.event, teams, scores)))
    }
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    name: String,
    status: String,
    allow_negative: bool,
    admin_token_hash: String,
    scorer_token_hash: String,
    public_token_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for EventRecord {
    fn from(r: EventRow) -> Self {
        EventRecord {
            event: Event {
                id: r.id,
                name: r.name,
                status: EventStatus::parse(&r.status).unwrap_or(EventStatus::Inactive),
                allow_negative: r.allow_negative,
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
            tokens: EventTokenHashes {
                admin: r.admin_token_hash,
                scorer: r.scorer_token_hash,
                public: r.public_token_hash,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: String,
    event_id: String,
    name: String,
    total_points: i64,
}

impl From<TeamRow> for Team {
    fn from(r: TeamRow) -> Self {
        Team {
            id: r.id,
            event_id: r.event_id,
            name: r.name,
            total_points: r.total_points,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    id: String,
    event_id: String,
    team_id: String,
    game_number: i64,
    points: i64,
    submission_id: Option<String>,
    created_at: DateTime<Utc>,
    edited_at: Option<DateTime<Utc>>,
}

impl From<ScoreRow> for GameScore {
    fn from(r: ScoreRow) -> Self {
        GameScore {
            id: r.id,
            event_id: r.event_id,
            team_id: r.team_id,
            game_number: r.game_number,
            points: r.points,
            submission_id: r.submission_id,
            created_at: r.created_at,
            edited_at: r.edited_at,
        }
    }
}
