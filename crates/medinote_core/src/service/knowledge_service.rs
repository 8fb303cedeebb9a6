//! Knowledge Bank use-case service.
//!
//! # Responsibility
//! - Publish notes as articles and keep them in sync on republish.
//! - Serve tag/search listings and unpublishing.
//!
//! # Invariants
//! - `author` and content are required to publish.
//! - Republishing a note updates its existing article in place.

use crate::content::Document;
use crate::error::{EditorResult, NotFound, ValidationError};
use crate::model::article::{normalize_tag, normalize_tags, Article, ArticleDraft, ArticleId};
use crate::model::note::{now_epoch_ms, Note, NoteId};
use crate::repo::knowledge_repo::{ArticleListQuery, KnowledgeRepository};
use crate::repo::RepoResult;
use log::info;
use uuid::Uuid;

/// Filters for Knowledge Bank browsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub tag: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Knowledge Bank facade over repository implementations.
pub struct KnowledgeService<R: KnowledgeRepository> {
    repo: R,
    clock: fn() -> i64,
}

impl<R: KnowledgeRepository> KnowledgeService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, now_epoch_ms)
    }

    pub fn with_clock(repo: R, clock: fn() -> i64) -> Self {
        Self { repo, clock }
    }

    /// Publishes `note`, or refreshes its article when already published.
    ///
    /// # Errors
    /// - `MissingField("author")` for a blank author.
    /// - `MissingField("content")` when the note has no content.
    pub fn publish(&mut self, note: &Note, draft: ArticleDraft) -> EditorResult<Article> {
        let author = draft.author.trim();
        if author.is_empty() {
            return Err(ValidationError::MissingField("author").into());
        }
        let document = Document::deserialize(&note.content);
        if document.is_empty() {
            return Err(ValidationError::MissingField("content").into());
        }

        let excerpt = draft
            .excerpt
            .as_deref()
            .map(str::trim)
            .filter(|excerpt| !excerpt.is_empty())
            .map(str::to_string)
            .or_else(|| document.preview_text());
        let now = (self.clock)();
        let existing = self.repo.find_by_source_note(note.id)?;
        let (id, published_at, updated_at) = match &existing {
            Some(article) => (
                article.id,
                article.published_at,
                now.max(article.updated_at.saturating_add(1)),
            ),
            None => (Uuid::new_v4(), now, now),
        };

        let article = Article {
            id,
            source_note_id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
            excerpt,
            author: author.to_string(),
            tags: normalize_tags(&draft.tags),
            published_at,
            updated_at,
        };
        self.repo.save_article(&article)?;
        info!(
            "event=article_publish module=knowledge status=ok article_id={} republish={} tags={}",
            article.id,
            existing.is_some(),
            article.tags.len()
        );
        Ok(article)
    }

    /// Removes an article from the Knowledge Bank.
    pub fn unpublish(&mut self, id: ArticleId) -> EditorResult<()> {
        self.repo.delete_article(id)?;
        info!("event=article_unpublish module=knowledge status=ok article_id={id}");
        Ok(())
    }

    pub fn get_article(&self, id: ArticleId) -> EditorResult<Article> {
        self.repo
            .get_article(id)?
            .ok_or_else(|| NotFound::Article(id).into())
    }

    /// Returns the article published from `note_id`, if any.
    pub fn article_for_note(&self, note_id: NoteId) -> RepoResult<Option<Article>> {
        self.repo.find_by_source_note(note_id)
    }

    /// Lists articles, newest update first.
    pub fn list_articles(&self, filter: &ArticleFilter) -> RepoResult<Vec<Article>> {
        let query = ArticleListQuery {
            tag: filter.tag.as_deref().and_then(normalize_tag),
            search: filter.search.clone(),
            limit: filter.limit,
            offset: filter.offset,
        };
        self.repo.list_articles(&query)
    }

    pub fn list_tags(&self) -> RepoResult<Vec<String>> {
        self.repo.list_tags()
    }
}
