use medinote_core::db::open_db_in_memory;
use medinote_core::{
    ArticleDraft, ArticleFilter, EditorError, KnowledgeService, Note, NotFound,
    SqliteKnowledgeRepository,
};

fn draft(tags: &[&str]) -> ArticleDraft {
    ArticleDraft {
        author: "Dr. Priya Shah".to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        excerpt: None,
    }
}

#[test]
fn republishing_updates_existing_article() {
    let mut conn = open_db_in_memory().unwrap();
    let mut bank = KnowledgeService::new(SqliteKnowledgeRepository::new(&mut conn));

    let mut note = Note::new("Sepsis bundle", "<p>Lactate, cultures, antibiotics</p>", 0);
    let first = bank.publish(&note, draft(&["ICU", "sepsis"])).unwrap();

    note.set_content("<p>Lactate, cultures, antibiotics, fluids</p>", 10);
    let second = bank.publish(&note, draft(&["sepsis"])).unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.published_at, first.published_at);
    assert!(second.updated_at > first.updated_at);

    let listed = bank.list_articles(&ArticleFilter::default()).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].tags, vec!["sepsis"]);
    assert!(listed[0].content.contains("fluids"));
    assert_eq!(bank.list_tags().unwrap(), vec!["sepsis"]);
}

#[test]
fn search_and_tag_filters_combine() {
    let mut conn = open_db_in_memory().unwrap();
    let mut bank = KnowledgeService::new(SqliteKnowledgeRepository::new(&mut conn));
    bank.publish(
        &Note::new("AFib", "<p>Rate vs rhythm control</p>", 0),
        draft(&["cardiology"]),
    )
    .unwrap();
    bank.publish(
        &Note::new("Heart failure", "<p>Diuretics and rate control</p>", 0),
        draft(&["cardiology"]),
    )
    .unwrap();
    bank.publish(
        &Note::new("Stroke", "<p>Rate of tPA eligibility</p>", 0),
        draft(&["neurology"]),
    )
    .unwrap();

    let filter = ArticleFilter {
        tag: Some(" #Cardiology ".to_string()),
        search: Some("rate".to_string()),
        ..ArticleFilter::default()
    };
    let found = bank.list_articles(&filter).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|article| article.tags == vec!["cardiology"]));
}

#[test]
fn unpublish_removes_article() {
    let mut conn = open_db_in_memory().unwrap();
    let mut bank = KnowledgeService::new(SqliteKnowledgeRepository::new(&mut conn));
    let note = Note::new("Hyponatremia", "<p>Correct slowly</p>", 0);
    let article = bank.publish(&note, draft(&[])).unwrap();

    bank.unpublish(article.id).unwrap();
    assert!(bank.article_for_note(note.id).unwrap().is_none());
    assert_eq!(
        bank.get_article(article.id).unwrap_err(),
        EditorError::NotFound(NotFound::Article(article.id))
    );
    assert_eq!(
        bank.unpublish(article.id).unwrap_err(),
        EditorError::NotFound(NotFound::Article(article.id))
    );
}
