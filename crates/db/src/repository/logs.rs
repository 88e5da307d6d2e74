//! Run log repository functions — the append-only audit trail of §4.4.

use engine::models::{LogCursor, LogLevel, RunLog};
use sqlx::PgPool;

use crate::{models::RunLogRow, DbError};

fn level_to_text(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn text_to_level(s: &str) -> Result<LogLevel, DbError> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(DbError::from)
}

fn from_row(row: RunLogRow) -> Result<RunLog, DbError> {
    Ok(RunLog {
        run_id: row.run_id,
        node_id: row.node_id,
        timestamp: row.ts,
        seq: row.seq as u64,
        level: text_to_level(&row.level)?,
        message: row.message,
        payload: row.payload,
    })
}

/// Append one log entry. `seq` is assigned by the table's `BIGSERIAL`
/// column — the store's job is to stamp it back onto the return value so
/// callers see the same ordering key Postgres will paginate by.
pub async fn append_log(pool: &PgPool, log: &RunLog) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        INSERT INTO run_logs (run_id, node_id, ts, level, message, payload)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
        log.run_id,
        log.node_id,
        log.timestamp,
        level_to_text(log.level),
        log.message,
        log.payload,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Page of log entries after `after` (exclusive), ordered by `(ts, seq)`
/// ascending — stable even when two entries share a timestamp (§4.4).
pub async fn logs_after(
    pool: &PgPool,
    run_id: &str,
    after: Option<LogCursor>,
    limit: i64,
) -> Result<(Vec<RunLog>, Option<LogCursor>), DbError> {
    let (after_ts, after_seq) = after.unzip();

    let rows = sqlx::query_as!(
        RunLogRow,
        r#"
        SELECT run_id, node_id, ts, seq, level, message, payload
        FROM run_logs
        WHERE run_id = $1
          AND ($2::timestamptz IS NULL OR (ts, seq) > ($2, $3))
        ORDER BY ts ASC, seq ASC
        LIMIT $4
        "#,
        run_id,
        after_ts,
        after_seq.map(|s| s as i64),
        limit,
    )
    .fetch_all(pool)
    .await?;

    let page: Vec<RunLog> = rows.into_iter().map(from_row).collect::<Result<_, _>>()?;
    let next_cursor = page.last().map(|l| (l.timestamp, l.seq));
    Ok((page, next_cursor))
}
