use crate::error::CatalogError;
use rusqlite::{params, Connection, ErrorCode, Row};
use uuid::Uuid;

pub const MAX_NAME_LEN: usize = 75;

#[derive(Debug, Clone)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

fn row_to_artist(row: &Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn find_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Artist>> {
    let mut stmt = conn.prepare("SELECT * FROM artists WHERE id = ?")?;
    let mut rows = stmt.query_map(params![id], |row| row_to_artist(row))?;
    Ok(rows.next().transpose()?)
}

pub fn find_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<Artist>> {
    let mut stmt = conn.prepare("SELECT * FROM artists WHERE name = ?")?;
    let mut rows = stmt.query_map(params![name], |row| row_to_artist(row))?;
    Ok(rows.next().transpose()?)
}

pub fn count(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM artists", [], |row| row.get(0))?)
}

/// Artist at `offset` in insertion order. Backs random picks.
pub fn find_at_offset(conn: &Connection, offset: i64) -> anyhow::Result<Option<Artist>> {
    let mut stmt =
        conn.prepare("SELECT * FROM artists ORDER BY created_at, rowid LIMIT 1 OFFSET ?")?;
    let mut rows = stmt.query_map(params![offset], |row| row_to_artist(row))?;
    Ok(rows.next().transpose()?)
}

pub fn create(conn: &Connection, name: &str) -> Result<Artist, CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::Invalid("Artist name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CatalogError::TooLong(format!(
            "Artist name exceeds {} characters",
            MAX_NAME_LEN
        )));
    }

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let inserted = conn.execute(
        "INSERT INTO artists (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, now, now],
    );

    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(CatalogError::Conflict(format!("Artist already exists: {}", name)));
        }
        Err(e) => return Err(e.into()),
    }

    find_by_id(conn, &id)?
        .ok_or_else(|| CatalogError::Internal(anyhow::anyhow!("Failed to retrieve created artist")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE artists (
               id TEXT PRIMARY KEY,
               name TEXT NOT NULL UNIQUE,
               created_at TEXT NOT NULL,
               updated_at TEXT NOT NULL
             );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_create_and_find() {
        let conn = conn();
        let created = create(&conn, "Can").unwrap();

        let by_id = find_by_id(&conn, &created.id).unwrap().unwrap();
        assert_eq!(by_id.name, "Can");
        let by_name = find_by_name(&conn, "Can").unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert!(find_by_id(&conn, "missing").unwrap().is_none());
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let conn = conn();
        create(&conn, "Neu!").unwrap();
        assert!(matches!(create(&conn, "Neu!"), Err(CatalogError::Conflict(_))));
        assert_eq!(count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_name_validation() {
        let conn = conn();
        assert!(matches!(create(&conn, "   "), Err(CatalogError::Invalid(_))));

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(create(&conn, &long), Err(CatalogError::TooLong(_))));

        let exact = "y".repeat(MAX_NAME_LEN);
        assert!(create(&conn, &exact).is_ok());
    }

    #[test]
    fn test_find_at_offset() {
        let conn = conn();
        for name in ["Faust", "Harmonia", "Cluster"] {
            create(&conn, name).unwrap();
        }

        let names: Vec<String> = (0..3)
            .map(|i| find_at_offset(&conn, i).unwrap().unwrap().name)
            .collect();
        assert_eq!(names, vec!["Faust", "Harmonia", "Cluster"]);
        assert!(find_at_offset(&conn, 3).unwrap().is_none());
    }
}
