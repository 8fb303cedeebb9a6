use medinote_core::{Document, FormatKind, Note, SelectionRange, ValidationError};

const SAMPLES: &[&str] = &[
    "",
    "plain text only",
    "<p>Chest pain <strong>radiating</strong> to <em>left arm</em></p>",
    "intro<br><h3>line one<br>line two</h3>",
    "<blockquote>cite <u>this</u></blockquote><pre><code>a &lt; b\n  c</code></pre>",
    "<ul><li>aspirin</li><li>heparin</li></ul><ol><li>ECG</li></ol>",
    "<p><mark style=\"background-color: #ffeb3b\">critical</mark> value</p>",
    r#"<p>see <a href="https://example.com">guideline</a></p>"#,
];

#[test]
fn serialize_is_idempotent_over_model_output() {
    for sample in SAMPLES {
        let once = Document::deserialize(sample).serialize();
        let twice = Document::deserialize(&once).serialize();
        assert_eq!(once, twice, "sample {sample:?}");
        assert_eq!(&once, sample);
    }
}

#[test]
fn every_format_kind_wraps_selection_and_drops_plain_span() {
    let kinds = [
        (FormatKind::Bold, "<strong>pain</strong>"),
        (FormatKind::Italic, "<em>pain</em>"),
        (FormatKind::Underline, "<u>pain</u>"),
        (
            FormatKind::Highlight("yellow".to_string()),
            "<mark style=\"background-color: yellow\">pain</mark>",
        ),
        (FormatKind::heading(), "<h3>pain</h3>"),
        (FormatKind::Quote, "<blockquote>pain</blockquote>"),
        (FormatKind::List { ordered: false }, "<ul><li>pain</li></ul>"),
        (FormatKind::Code, "<pre><code>pain</code></pre>"),
    ];
    for (kind, expected) in kinds {
        let mut document = Document::deserialize("chest pain today");
        document
            .apply_format(SelectionRange::new(6, 10), &kind)
            .unwrap();
        let serialized = document.serialize();
        assert!(serialized.contains(expected), "{kind:?}: {serialized}");
        assert!(!serialized.contains("chest pain today"), "{kind:?}");
        assert!(document.plain_text().contains("pain"), "{kind:?}");
    }
}

#[test]
fn reversed_selection_is_accepted() {
    let mut document = Document::deserialize("hello world");
    document
        .apply_format(SelectionRange::new(5, 0), &FormatKind::Bold)
        .unwrap();
    assert_eq!(document.serialize(), "<strong>hello</strong> world");
}

#[test]
fn selection_past_end_is_clamped_or_empty() {
    let mut document = Document::deserialize("abc");
    assert_eq!(
        document
            .apply_format(SelectionRange::new(10, 20), &FormatKind::Bold)
            .unwrap_err(),
        ValidationError::EmptySelection
    );
    document
        .apply_format(SelectionRange::new(1, 20), &FormatKind::Italic)
        .unwrap();
    assert_eq!(document.serialize(), "a<em>bc</em>");
}

#[test]
fn insert_into_empty_note_has_no_separator() {
    let note = Note::new("Untitled Note", "", 0);
    let mut document = Document::deserialize(&note.content);
    document.insert_content("Summary text", false);
    assert_eq!(document.serialize(), "Summary text");
}

#[test]
fn structured_inserts_are_separated_and_not_escaped() {
    let mut document = Document::new();
    document.insert_content("<h3>Summary</h3><p>AFib, <strong>rate</strong> control</p>", true);
    document.insert_content("<ul><li>Follow up</li></ul>", true);
    assert_eq!(
        document.serialize(),
        "<h3>Summary</h3><p>AFib, <strong>rate</strong> control</p><br><br><ul><li>Follow up</li></ul>"
    );
}

#[test]
fn plain_inserts_escape_markup_and_keep_newlines() {
    let mut document = Document::deserialize("<p>note</p>");
    document.insert_content("K+ <3.5\nrecheck", false);
    assert_eq!(
        document.serialize(),
        "<p>note</p><br><br>K+ &lt;3.5<br>recheck"
    );
}
