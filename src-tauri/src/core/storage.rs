use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::analytics::AnalyticsRow;
use crate::types::{Replay, UploadJob, UploadStatus};

const DB_FILE: &str = "riftcast.db";

pub fn expand_tilde(path: &str) -> PathBuf {
    let stripped = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\"));

    if let Some(stripped) = stripped {
        let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
        if let Some(home) = home {
            return PathBuf::from(home).join(stripped);
        }
    }

    PathBuf::from(path)
}

/// Replaces Windows-style `%NAME%` references with the variable's value. Unknown names are left
/// as written.
pub fn expand_env_vars(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn resolve_user_path(path: &str) -> PathBuf {
    expand_tilde(&expand_env_vars(path.trim()))
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE)
}

fn ensure_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    Ok(())
}

fn open_connection(path: &Path) -> Result<Connection, String> {
    ensure_dir(path)?;
    Connection::open(path).map_err(|err| err.to_string())
}

fn ensure_schema(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
      );
      CREATE TABLE IF NOT EXISTS replays (
        id TEXT PRIMARY KEY,
        file_name TEXT NOT NULL,
        path TEXT NOT NULL,
        champion TEXT,
        discovered_at INTEGER NOT NULL
      );
      CREATE TABLE IF NOT EXISTS upload_jobs (
        id TEXT PRIMARY KEY,
        replay_id TEXT,
        file_path TEXT NOT NULL,
        title TEXT NOT NULL,
        status TEXT NOT NULL,
        progress INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        error TEXT
      );
      CREATE TABLE IF NOT EXISTS analytics (
        date TEXT PRIMARY KEY,
        replays_discovered INTEGER,
        videos_uploaded INTEGER,
        total_views INTEGER
      );",
    )
    .map_err(|err| err.to_string())
}

fn open_db(data_dir: &Path) -> Result<Connection, String> {
    let conn = open_connection(&db_path(data_dir))?;
    ensure_schema(&conn)?;
    Ok(conn)
}

pub fn load_setting_value(data_dir: &Path, key: &str) -> Result<Option<String>, String> {
    let conn = open_db(data_dir)?;
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|err| err.to_string())
}

pub fn save_setting_value(data_dir: &Path, key: &str, value: &str) -> Result<(), String> {
    let conn = open_db(data_dir)?;
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .map_err(|err| err.to_string())?;
    Ok(())
}

pub fn load_replays(data_dir: &Path) -> Vec<Replay> {
    let conn = match open_db(data_dir) {
        Ok(conn) => conn,
        Err(_) => return Vec::new(),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, file_name, path, champion, discovered_at
     FROM replays
     ORDER BY discovered_at DESC",
    ) {
        Ok(stmt) => stmt,
        Err(_) => return Vec::new(),
    };

    let rows = match stmt.query_map([], |row| {
        Ok(Replay {
            id: row.get(0)?,
            file_name: row.get(1)?,
            path: row.get(2)?,
            champion: row.get(3)?,
            discovered_at: row.get(4)?,
        })
    }) {
        Ok(rows) => rows,
        Err(_) => return Vec::new(),
    };

    rows.flatten().collect()
}

pub fn insert_replay(data_dir: &Path, replay: &Replay) -> Result<(), String> {
    let conn = open_db(data_dir)?;
    conn.execute(
        "INSERT INTO replays (id, file_name, path, champion, discovered_at)
       VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            replay.id,
            replay.file_name,
            replay.path,
            replay.champion,
            replay.discovered_at,
        ],
    )
    .map_err(|err| err.to_string())?;
    Ok(())
}

pub fn load_upload_jobs(data_dir: &Path) -> Vec<UploadJob> {
    let conn = match open_db(data_dir) {
        Ok(conn) => conn,
        Err(_) => return Vec::new(),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, replay_id, file_path, title, status, progress, created_at, updated_at, error
     FROM upload_jobs
     ORDER BY created_at DESC",
    ) {
        Ok(stmt) => stmt,
        Err(_) => return Vec::new(),
    };

    let rows = match stmt.query_map([], |row| {
        Ok(UploadJob {
            id: row.get(0)?,
            replay_id: row.get(1)?,
            file_path: row.get(2)?,
            title: row.get(3)?,
            status: UploadStatus::parse(&row.get::<_, String>(4)?),
            progress: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            error: row.get(8)?,
        })
    }) {
        Ok(rows) => rows,
        Err(_) => return Vec::new(),
    };

    rows.flatten().collect()
}

pub fn upsert_upload_job(data_dir: &Path, job: &UploadJob) -> Result<(), String> {
    let conn = open_db(data_dir)?;
    conn.execute(
        "INSERT INTO upload_jobs
        (id, replay_id, file_path, title, status, progress, created_at, updated_at, error)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
          status = excluded.status,
          progress = excluded.progress,
          updated_at = excluded.updated_at,
          error = excluded.error",
        params![
            job.id,
            job.replay_id,
            job.file_path,
            job.title,
            job.status.as_str(),
            job.progress as i64,
            job.created_at,
            job.updated_at,
            job.error,
        ],
    )
    .map_err(|err| err.to_string())?;
    Ok(())
}

/// Most recent analytics rows, newest first.
pub fn query_recent_analytics(data_dir: &Path, limit: usize) -> Result<Vec<AnalyticsRow>, String> {
    let conn = open_db(data_dir)?;
    let mut stmt = conn
        .prepare(
            "SELECT date, replays_discovered, videos_uploaded, total_views
       FROM analytics
       ORDER BY date DESC
       LIMIT ?1",
        )
        .map_err(|err| err.to_string())?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(AnalyticsRow {
                date: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                replays_discovered: row.get::<_, Option<i64>>(1)?.unwrap_or(0).max(0) as u64,
                videos_uploaded: row.get::<_, Option<i64>>(2)?.unwrap_or(0).max(0) as u64,
                total_views: row.get::<_, Option<i64>>(3)?.unwrap_or(0).max(0) as u64,
            })
        })
        .map_err(|err| err.to_string())?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|err| err.to_string())
}

#[cfg(test)]
pub fn insert_analytics_row(data_dir: &Path, row: &AnalyticsRow) -> Result<(), String> {
    let conn = open_db(data_dir)?;
    conn.execute(
        "INSERT INTO analytics (date, replays_discovered, videos_uploaded, total_views)
       VALUES (?1, ?2, ?3, ?4)",
        params![
            row.date,
            row.replays_discovered as i64,
            row.videos_uploaded as i64,
            row.total_views as i64,
        ],
    )
    .map_err(|err| err.to_string())?;
    Ok(())
}

#[cfg(test)]
pub fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("riftcast-test-{}", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn expand_tilde_handles_windows_separator() {
        let original = std::env::var_os("HOME");
        std::env::set_var("HOME", "/tmp/riftcast-test");

        let expanded = expand_tilde("~\\data");
        assert_eq!(expanded, PathBuf::from("/tmp/riftcast-test").join("data"));

        if let Some(value) = original {
            std::env::set_var("HOME", value);
        } else {
            std::env::remove_var("HOME");
        }
    }

    #[test]
    fn expand_env_vars_replaces_known_names() {
        std::env::set_var("RIFTCAST_TEST_USER", "summoner");
        assert_eq!(
            expand_env_vars(r"C:\Users\%RIFTCAST_TEST_USER%\Videos"),
            r"C:\Users\summoner\Videos"
        );
        assert_eq!(
            expand_env_vars("%RIFTCAST_UNSET_VARIABLE%/x"),
            "%RIFTCAST_UNSET_VARIABLE%/x"
        );
        assert_eq!(expand_env_vars("100% done"), "100% done");
        std::env::remove_var("RIFTCAST_TEST_USER");
    }

    #[test]
    fn setting_value_roundtrip_overwrites() {
        let dir = temp_data_dir();
        assert_eq!(load_setting_value(&dir, "k").expect("load"), None);
        save_setting_value(&dir, "k", "1").expect("save");
        save_setting_value(&dir, "k", "2").expect("save");
        assert_eq!(load_setting_value(&dir, "k").expect("load"), Some("2".to_string()));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn upload_job_upsert_updates_status() {
        let dir = temp_data_dir();
        let mut job = UploadJob {
            id: Uuid::new_v4().to_string(),
            replay_id: None,
            file_path: "/videos/game.mp4".to_string(),
            title: "Game".to_string(),
            status: UploadStatus::Uploading,
            progress: 30,
            created_at: 1,
            updated_at: 1,
            error: None,
        };
        upsert_upload_job(&dir, &job).expect("insert");
        job.status = UploadStatus::Completed;
        job.progress = 100;
        job.updated_at = 2;
        upsert_upload_job(&dir, &job).expect("update");

        let loaded = load_upload_jobs(&dir);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, UploadStatus::Completed);
        assert_eq!(loaded[0].progress, 100);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn recent_analytics_is_newest_first_and_limited() {
        let dir = temp_data_dir();
        for day in 1..=9 {
            insert_analytics_row(
                &dir,
                &AnalyticsRow {
                    date: format!("2026-10-0{day}"),
                    replays_discovered: day,
                    videos_uploaded: day,
                    total_views: day * 100,
                },
            )
            .expect("insert");
        }

        let rows = query_recent_analytics(&dir, 7).expect("query");
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].date, "2026-10-09");
        assert_eq!(rows[6].date, "2026-10-03");
        let _ = fs::remove_dir_all(&dir);
    }
}
