use super::*;

#[test]
fn entry_from_document_derives_id_and_metadata() {
    let document = CorpusDocument {
        ordinal: 4,
        text: "Show up.\nEven when it's hard.".to_string(),
    };

    let entry = IndexEntry::from_document(&document, vec![0.1, 0.2, 0.3]);

    assert_eq!(entry.id, "post_4");
    assert_eq!(entry.text, document.text);
    assert_eq!(entry.metadata.line_count, 2);
    assert_eq!(entry.metadata.length as usize, document.text.chars().count());
    assert_eq!(entry.vector.len(), 3);
}

#[test]
fn stored_entry_ordinal() {
    let mut entry = StoredEntry {
        id: "post_17".to_string(),
        text: "Test content".to_string(),
        metadata: EntryMetadata::for_text("Test content"),
        indexed_at: "2024-01-01T00:00:00Z".to_string(),
    };
    assert_eq!(entry.ordinal(), Some(17));

    entry.id = "custom".to_string();
    assert_eq!(entry.ordinal(), None);
}

#[test]
fn stored_entry_serialization() {
    let entry = StoredEntry {
        id: "post_0".to_string(),
        text: "Consistency wins.".to_string(),
        metadata: EntryMetadata::for_text("Consistency wins."),
        indexed_at: "2024-01-01T00:00:00Z".to_string(),
    };

    let json = serde_json::to_string(&entry).expect("can serialize json");
    assert!(json.contains("\"line_count\":1"));
    assert!(json.contains("\"length\":17"));

    let deserialized: StoredEntry = serde_json::from_str(&json).expect("can parse json");
    assert_eq!(entry, deserialized);
}
