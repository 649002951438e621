use super::*;
use tempfile::TempDir;

fn texts(documents: &[CorpusDocument]) -> Vec<&str> {
    documents.iter().map(|d| d.text.as_str()).collect()
}

#[test]
fn splits_on_blank_lines_and_trims() {
    let documents = split_documents("Consistency wins.\n\n\nPersistence pays off.\n\n");

    assert_eq!(texts(&documents), vec!["Consistency wins.", "Persistence pays off."]);
    assert_eq!(documents[0].ordinal, 0);
    assert_eq!(documents[1].ordinal, 1);
    assert_eq!(documents[1].entry_id(), "post_1");
}

#[test]
fn single_line_breaks_stay_inside_a_document() {
    let documents = split_documents("Line one\nLine two\n\nSecond post");

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].text, "Line one\nLine two");
    assert_eq!(documents[0].metadata().line_count, 2);
}

#[test]
fn windows_line_endings_are_normalized() {
    let documents = split_documents("First\r\nstill first\r\n\r\nSecond");

    assert_eq!(texts(&documents), vec!["First\nstill first", "Second"]);
}

#[test]
fn empty_and_whitespace_text_has_no_documents() {
    assert!(split_documents("").is_empty());
    assert!(split_documents("\n\n   \n\n\t").is_empty());
}

#[test]
fn metadata_counts_characters_and_lines() {
    let metadata = EntryMetadata::for_text("❤️ Growth\nhappens quietly");

    assert_eq!(
        metadata.length as usize,
        "❤️ Growth\nhappens quietly".chars().count()
    );
    assert_eq!(metadata.line_count, 2);

    let single = EntryMetadata::for_text("Consistency wins.");
    assert_eq!(single.length, 17);
    assert_eq!(single.line_count, 1);
}

#[test]
fn entry_ids_round_trip() {
    assert_eq!(entry_id(12), "post_12");
    assert_eq!(parse_entry_id("post_12"), Some(12));
    assert_eq!(parse_entry_id("post_x"), None);
    assert_eq!(parse_entry_id("chunk_3"), None);
}

#[test]
fn sanitize_drops_invalid_sequences() {
    let bytes = b"Consistency\xff wins.\xc3";
    let (text, dropped) = sanitize_utf8(bytes);

    assert_eq!(text, "Consistency wins.");
    assert_eq!(dropped, 2);
}

#[test]
fn sanitize_keeps_valid_multibyte_text() {
    let input = "Keep going. ❤️ 🚀";
    let (text, dropped) = sanitize_utf8(input.as_bytes());

    assert_eq!(text, input);
    assert_eq!(dropped, 0);
}

#[tokio::test]
async fn load_corpus_reports_missing_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = temp_dir.path().join("missing.txt");

    let result = load_corpus(&missing).await;
    assert!(matches!(
        result,
        Err(PostsmithError::SourceUnavailable { ref path, .. }) if *path == missing
    ));
}

#[tokio::test]
async fn load_corpus_survives_malformed_bytes() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("posts.txt");
    std::fs::write(&path, b"Good post.\n\nBroken \xfe\xfepost.\n\nLast one.")
        .expect("should write corpus");

    let corpus = load_corpus(&path).await.expect("should load corpus");

    assert_eq!(corpus.invalid_bytes_dropped, 2);
    assert_eq!(
        texts(&corpus.documents),
        vec!["Good post.", "Broken post.", "Last one."]
    );
}
