//! Integration tests for lorekeeper-store
//!
//! These tests verify the add / count / dedup / rollback cycle for chunks.

use lorekeeper_domain::{ChunkMetadata, ChunkStore, ContentType, StrategyKind, VectorChunk};
use lorekeeper_store::{MemoryStore, SqliteStore};

fn chunk_for(hash: &str, content: &str, strategy: StrategyKind) -> VectorChunk {
    let metadata = ChunkMetadata {
        document_hash: hash.to_string(),
        source_document: "lore/aria.md".to_string(),
        document_type: "markdown".to_string(),
        entities: vec!["Aria".to_string()],
        where_: "Harbor".to_string(),
        timestamp: 1_700_000_000,
        ..Default::default()
    };
    VectorChunk::new(
        "document_import",
        content,
        ContentType::Fictional,
        strategy,
        vec![0.25, -0.5, 0.75],
        metadata,
    )
    .with_canonical(vec!["Who is Aria?".to_string()], "A merchant.")
}

#[test]
fn test_store_initialization() {
    let store = SqliteStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
    assert_eq!(store.unwrap().chunk_count().unwrap(), 0);
}

#[test]
fn test_add_and_read_back_chunk() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let chunk = chunk_for("hash-a", "Aria: A merchant.", StrategyKind::EntitySheet);

    let id = store.add_chunk(chunk.clone()).unwrap();
    assert_eq!(id, chunk.id);

    let stored = store.chunks_by_document_hash("hash-a").unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], chunk);
    assert_eq!(stored[0].metadata.where_, "Harbor");
}

#[test]
fn test_has_document_hash() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    assert!(!store.has_document_hash("hash-a").unwrap());

    store
        .add_chunk(chunk_for("hash-a", "one", StrategyKind::Sentence))
        .unwrap();
    assert!(store.has_document_hash("hash-a").unwrap());
    assert!(!store.has_document_hash("hash-b").unwrap());
}

#[test]
fn test_remove_by_document_hash() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    for content in ["one", "two", "three"] {
        store
            .add_chunk(chunk_for("hash-a", content, StrategyKind::Sentence))
            .unwrap();
    }
    store
        .add_chunk(chunk_for("hash-b", "other", StrategyKind::Keyword))
        .unwrap();
    assert_eq!(store.chunk_count().unwrap(), 4);

    let removed = store.remove_chunks_by_document_hash("hash-a").unwrap();
    assert_eq!(removed, 3);
    assert_eq!(store.chunk_count().unwrap(), 1);
    assert!(!store.has_document_hash("hash-a").unwrap());
    assert!(store.has_document_hash("hash-b").unwrap());

    assert_eq!(store.remove_chunks_by_document_hash("hash-a").unwrap(), 0);
}

#[test]
fn test_chunks_come_back_in_insertion_order() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let contents = ["first", "second", "third"];
    for content in contents {
        store
            .add_chunk(chunk_for("hash-a", content, StrategyKind::Sentence))
            .unwrap();
    }

    let stored: Vec<String> = store
        .all_chunks()
        .unwrap()
        .into_iter()
        .map(|c| c.content)
        .collect();
    assert_eq!(stored, contents);
}

#[test]
fn test_persistence_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("chunks.db");

    {
        let mut store = SqliteStore::new(&db_path).unwrap();
        store
            .add_chunk(chunk_for("hash-a", "persisted", StrategyKind::Timeline))
            .unwrap();
    }

    let store = SqliteStore::new(&db_path).unwrap();
    assert_eq!(store.chunk_count().unwrap(), 1);
    assert!(store.has_document_hash("hash-a").unwrap());

    let chunk = &store.chunks_by_document_hash("hash-a").unwrap()[0];
    assert_eq!(chunk.strategy, StrategyKind::Timeline);
    assert_eq!(chunk.canonical_questions, vec!["Who is Aria?".to_string()]);
    assert_eq!(chunk.embedding, vec![0.25, -0.5, 0.75]);
}

#[test]
fn test_memory_and_sqlite_stores_agree() {
    let mut sqlite = SqliteStore::new(":memory:").unwrap();
    let mut memory = MemoryStore::new();

    for (hash, content) in [("a", "one"), ("b", "two"), ("a", "three")] {
        let chunk = chunk_for(hash, content, StrategyKind::Keyword);
        sqlite.add_chunk(chunk.clone()).unwrap();
        memory.add_chunk(chunk).unwrap();
    }

    assert_eq!(sqlite.chunk_count().unwrap(), memory.chunk_count().unwrap());
    assert_eq!(
        sqlite.chunks_by_document_hash("a").unwrap(),
        memory.chunks_by_document_hash("a").unwrap()
    );
    assert_eq!(
        sqlite.remove_chunks_by_document_hash("a").unwrap(),
        memory.remove_chunks_by_document_hash("a").unwrap()
    );
}
