mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, Row};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::*;

const GEM_COLUMNS: &str =
    "id, name, color, easy_to_find, owner_id, comments, version, created_at, updated_at";

/// Document store for gems and the users that own them.
///
/// Each gem is one row holding the whole document; its comments are an
/// embedded JSON array. Writes go through [`Database::save_gem`], which only
/// succeeds when the caller holds the latest version of the document.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "gems")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("gems.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // User operations
    // ============================================================

    /// Register a user and issue its bearer token.
    pub fn create_user(&self, input: CreateUserInput) -> Result<IssuedUser> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let token = Uuid::new_v4().simple().to_string();
        let token_hash = hash_token(&token);
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (id, username, token_hash, created_at) VALUES (?, ?, ?, ?)",
            (id.to_string(), &input.username, &token_hash, now.to_rfc3339()),
        )?;

        Ok(IssuedUser {
            user: User {
                id,
                username: input.username,
                token_hash,
                created_at: now,
            },
            token,
        })
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, username, token_hash, created_at FROM users WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(user_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Look up the user a bearer token was issued to.
    pub fn find_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, username, token_hash, created_at FROM users WHERE token_hash = ?",
        )?;

        let mut rows = stmt.query([hash_token(token)])?;
        if let Some(row) = rows.next()? {
            Ok(Some(user_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    fn get_user_summaries(
        &self,
        ids: impl IntoIterator<Item = UserId>,
    ) -> Result<HashMap<UserId, UserSummary>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT username FROM users WHERE id = ?")?;

        let mut summaries = HashMap::new();
        for id in ids {
            if summaries.contains_key(&id) {
                continue;
            }
            let mut rows = stmt.query([id.to_string()])?;
            let summary = match rows.next()? {
                Some(row) => UserSummary {
                    id,
                    username: Some(row.get(0)?),
                },
                None => UserSummary::unresolved(id),
            };
            summaries.insert(id, summary);
        }

        Ok(summaries)
    }

    // ============================================================
    // Gem operations
    // ============================================================

    pub fn get_all_gems(&self) -> Result<Vec<Gem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {GEM_COLUMNS} FROM gems ORDER BY rowid"
        ))?;

        let gems = stmt
            .query_map([], gem_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(gems)
    }

    pub fn get_gems_by_owner(&self, owner: UserId) -> Result<Vec<Gem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {GEM_COLUMNS} FROM gems WHERE owner_id = ? ORDER BY rowid"
        ))?;

        let gems = stmt
            .query_map([owner.to_string()], gem_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(gems)
    }

    pub fn get_gem(&self, id: Uuid) -> Result<Option<Gem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!("SELECT {GEM_COLUMNS} FROM gems WHERE id = ?"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(gem_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn create_gem(&self, owner: UserId, input: CreateGemInput) -> Result<Gem> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();

        conn.execute(
            &format!(
                "INSERT INTO gems ({GEM_COLUMNS}) VALUES (?, ?, ?, ?, ?, '[]', 1, ?, ?)"
            ),
            (
                id.to_string(),
                &input.name,
                &input.color,
                input.easy_to_find,
                owner.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Gem {
            id,
            name: input.name,
            color: input.color,
            easy_to_find: input.easy_to_find,
            owner,
            comments: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Write a whole gem document back.
    ///
    /// The write only applies if the stored version still equals
    /// `gem.version`. Returns the stored document with its new version, or
    /// `None` if the gem was changed or deleted since it was read. The owner
    /// column is never written here.
    pub fn save_gem(&self, gem: &Gem) -> Result<Option<Gem>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let comments = serde_json::to_string(&gem.comments)?;

        let rows = conn.execute(
            "UPDATE gems
             SET name = ?, color = ?, easy_to_find = ?, comments = ?, version = version + 1, updated_at = ?
             WHERE id = ? AND version = ?",
            (
                &gem.name,
                &gem.color,
                gem.easy_to_find,
                &comments,
                now.to_rfc3339(),
                gem.id.to_string(),
                gem.version,
            ),
        )?;

        if rows == 0 {
            tracing::debug!(gem_id = %gem.id, version = gem.version, "stale gem write rejected");
            return Ok(None);
        }

        Ok(Some(Gem {
            version: gem.version + 1,
            updated_at: now,
            ..gem.clone()
        }))
    }

    pub fn delete_gem(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM gems WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Resolved views
    // ============================================================

    pub fn get_all_gem_views(&self) -> Result<Vec<GemView>> {
        let gems = self.get_all_gems()?;
        self.resolve(gems)
    }

    pub fn get_gem_views_by_owner(&self, owner: UserId) -> Result<Vec<GemView>> {
        let gems = self.get_gems_by_owner(owner)?;
        self.resolve(gems)
    }

    pub fn get_gem_view(&self, id: Uuid) -> Result<Option<GemView>> {
        let Some(gem) = self.get_gem(id)? else {
            return Ok(None);
        };
        Ok(self.resolve(vec![gem])?.pop())
    }

    /// Replace owner and author ids with display-safe user summaries.
    fn resolve(&self, gems: Vec<Gem>) -> Result<Vec<GemView>> {
        let ids = gems
            .iter()
            .flat_map(|g| std::iter::once(g.owner).chain(g.comments.iter().map(|c| c.author)));
        let users = self.get_user_summaries(ids.collect::<Vec<_>>())?;
        let summary = |id: UserId| {
            users
                .get(&id)
                .cloned()
                .unwrap_or_else(|| UserSummary::unresolved(id))
        };

        Ok(gems
            .into_iter()
            .map(|gem| GemView {
                id: gem.id,
                name: gem.name,
                color: gem.color,
                easy_to_find: gem.easy_to_find,
                owner: summary(gem.owner),
                comments: gem
                    .comments
                    .into_iter()
                    .map(|c| CommentView {
                        id: c.id,
                        author: summary(c.author),
                        created_at: c.created_at,
                        fields: c.fields,
                    })
                    .collect(),
                created_at: gem.created_at,
                updated_at: gem.updated_at,
            })
            .collect())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn gem_from_row(row: &Row) -> rusqlite::Result<Gem> {
    let comments_json: String = row.get(5)?;
    let comments = serde_json::from_str(&comments_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(Gem {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        easy_to_find: row.get::<_, i32>(3)? != 0,
        owner: uuid_column(row, 4)?,
        comments,
        version: row.get(6)?,
        created_at: datetime_column(row, 7)?,
        updated_at: datetime_column(row, 8)?,
    })
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_column(row, 0)?,
        username: row.get(1)?,
        token_hash: row.get(2)?,
        created_at: datetime_column(row, 3)?,
    })
}

fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn uuid_column(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Database, Gem) {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let owner = db
            .create_user(CreateUserInput {
                username: "alice".to_string(),
            })
            .unwrap();
        let gem = db
            .create_gem(
                owner.user.id,
                CreateGemInput {
                    name: "Ruby".to_string(),
                    color: "red".to_string(),
                    easy_to_find: false,
                },
            )
            .unwrap();
        (db, gem)
    }

    fn corrupt(db: &Database, sql: &str, id: Uuid) {
        let conn = db.conn.lock().unwrap();
        conn.execute(sql, [id.to_string()]).unwrap();
    }

    #[test]
    fn corrupted_owner_id_is_an_error() {
        let (db, gem) = seeded();
        corrupt(&db, "UPDATE gems SET owner_id = 'garbage' WHERE id = ?", gem.id);

        let err = db.get_gem(gem.id).unwrap_err();
        let conversion = err.downcast_ref::<rusqlite::Error>();
        assert!(matches!(
            conversion,
            Some(rusqlite::Error::FromSqlConversionFailure(4, Type::Text, _))
        ));
        assert!(db.get_all_gem_views().is_err());
    }

    #[test]
    fn corrupted_timestamp_is_an_error() {
        let (db, gem) = seeded();
        corrupt(&db, "UPDATE gems SET updated_at = 'yesterday' WHERE id = ?", gem.id);

        assert!(db.get_gem(gem.id).is_err());
    }

    #[test]
    fn corrupted_comments_are_an_error() {
        let (db, gem) = seeded();
        corrupt(&db, "UPDATE gems SET comments = '{' WHERE id = ?", gem.id);

        assert!(db.get_gem(gem.id).is_err());
    }

    #[test]
    fn corrupted_user_id_is_an_error() {
        let (db, gem) = seeded();
        corrupt(&db, "UPDATE users SET id = 'garbage' WHERE id = ?", gem.owner);

        assert!(db.get_user(gem.owner).unwrap().is_none());
        let conn = db.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id, username, token_hash, created_at FROM users",
            [],
            user_from_row,
        );
        assert!(result.is_err());
    }
}
