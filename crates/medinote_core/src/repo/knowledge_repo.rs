//! Knowledge Bank repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist published articles and their tag sets.
//! - Serve tag/search filtered article listings.
//!
//! # Invariants
//! - Article row and tag set are replaced in a single transaction.
//! - `source_note_uuid` is unique; saving an article for an already
//!   published note updates that row in place.
//! - Listing order is `updated_at DESC, uuid ASC`.

use crate::model::article::{Article, ArticleId};
use crate::model::note::NoteId;
use crate::repo::{like_pattern, normalize_limit, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

const ARTICLES_DEFAULT_LIMIT: u32 = 20;
const ARTICLES_LIMIT_MAX: u32 = 200;

const ARTICLE_SELECT_SQL: &str = "SELECT
    uuid,
    source_note_uuid,
    title,
    content,
    excerpt,
    author,
    published_at,
    updated_at
FROM articles";

/// Query options for article listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleListQuery {
    /// Single-tag exact match filter (already normalized).
    pub tag: Option<String>,
    /// Case-insensitive substring match over title, excerpt and content.
    pub search: Option<String>,
    /// Maximum rows to return. Defaults to 20 and clamps to 200.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for Knowledge Bank articles.
pub trait KnowledgeRepository {
    /// Inserts or updates the article and replaces its tag set.
    fn save_article(&mut self, article: &Article) -> RepoResult<()>;
    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>>;
    fn find_by_source_note(&self, note_id: NoteId) -> RepoResult<Option<Article>>;
    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<Article>>;
    fn count_articles(&self) -> RepoResult<u64>;
    fn delete_article(&self, id: ArticleId) -> RepoResult<()>;
    /// Returns every tag in use, sorted by name.
    fn list_tags(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed Knowledge Bank repository.
pub struct SqliteKnowledgeRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteKnowledgeRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    fn load_one(&self, filter: &str, key: String) -> RepoResult<Option<Article>> {
        let raw = self
            .conn
            .query_row(
                &format!("{ARTICLE_SELECT_SQL} WHERE {filter} = ?1;"),
                [key],
                read_article_row,
            )
            .optional()?;
        raw.map(|raw| raw.into_article(self.conn)).transpose()
    }
}

impl KnowledgeRepository for SqliteKnowledgeRepository<'_> {
    fn save_article(&mut self, article: &Article) -> RepoResult<()> {
        let article_uuid = article.id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO articles (
                uuid,
                source_note_uuid,
                title,
                content,
                excerpt,
                author,
                published_at,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(uuid) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                excerpt = excluded.excerpt,
                author = excluded.author,
                updated_at = excluded.updated_at;",
            params![
                article_uuid,
                article.source_note_id.to_string(),
                article.title,
                article.content,
                article.excerpt,
                article.author,
                article.published_at,
                article.updated_at,
            ],
        )?;

        tx.execute(
            "DELETE FROM article_tags WHERE article_uuid = ?1;",
            [article_uuid.as_str()],
        )?;
        for tag in &article.tags {
            tx.execute(
                "INSERT OR IGNORE INTO article_tags (article_uuid, tag) VALUES (?1, ?2);",
                params![article_uuid.as_str(), tag.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        self.load_one("uuid", id.to_string())
    }

    fn find_by_source_note(&self, note_id: NoteId) -> RepoResult<Option<Article>> {
        self.load_one("source_note_uuid", note_id.to_string())
    }

    fn list_articles(&self, query: &ArticleListQuery) -> RepoResult<Vec<Article>> {
        let mut sql = String::from(ARTICLE_SELECT_SQL);
        let mut clauses: Vec<String> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tag) = query.tag.as_ref() {
            bind_values.push(Value::Text(tag.clone()));
            clauses.push(format!(
                "EXISTS (
                    SELECT 1 FROM article_tags t
                    WHERE t.article_uuid = articles.uuid AND t.tag = ?{}
                )",
                bind_values.len()
            ));
        }
        if let Some(term) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
        {
            bind_values.push(Value::Text(like_pattern(term)));
            let index = bind_values.len();
            clauses.push(format!(
                "(title LIKE ?{index} ESCAPE '\\'
                  OR IFNULL(excerpt, '') LIKE ?{index} ESCAPE '\\'
                  OR content LIKE ?{index} ESCAPE '\\')"
            ));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        sql.push_str(" ORDER BY updated_at DESC, uuid ASC");
        let limit = normalize_limit(query.limit, ARTICLES_DEFAULT_LIMIT, ARTICLES_LIMIT_MAX);
        bind_values.push(Value::Integer(i64::from(limit)));
        sql.push_str(&format!(" LIMIT ?{}", bind_values.len()));
        if query.offset > 0 {
            bind_values.push(Value::Integer(i64::from(query.offset)));
            sql.push_str(&format!(" OFFSET ?{}", bind_values.len()));
        }

        let raws = {
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(bind_values), read_article_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        raws.into_iter()
            .map(|raw| raw.into_article(self.conn))
            .collect()
    }

    fn count_articles(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles;", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM articles WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ArticleNotFound(id));
        }
        Ok(())
    }

    fn list_tags(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT tag FROM article_tags ORDER BY tag ASC;")?;
        let tags = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }
}

struct RawArticle {
    uuid: String,
    source_note_uuid: String,
    title: String,
    content: String,
    excerpt: Option<String>,
    author: String,
    published_at: i64,
    updated_at: i64,
}

impl RawArticle {
    fn into_article(self, conn: &Connection) -> RepoResult<Article> {
        let tags = load_tags(conn, &self.uuid)?;
        Ok(Article {
            id: parse_uuid(&self.uuid, "articles.uuid")?,
            source_note_id: parse_uuid(&self.source_note_uuid, "articles.source_note_uuid")?,
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            author: self.author,
            tags,
            published_at: self.published_at,
            updated_at: self.updated_at,
        })
    }
}

fn read_article_row(row: &Row<'_>) -> rusqlite::Result<RawArticle> {
    Ok(RawArticle {
        uuid: row.get("uuid")?,
        source_note_uuid: row.get("source_note_uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        excerpt: row.get("excerpt")?,
        author: row.get("author")?,
        published_at: row.get("published_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_tags(conn: &Connection, article_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT tag FROM article_tags WHERE article_uuid = ?1 ORDER BY tag ASC;",
    )?;
    let tags = stmt
        .query_map([article_uuid], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}
