//! Typed access through `Database` over the in-memory backend.

use std::sync::Arc;

use studyhub_core::model::{
    ChatMessage, Discussion, FileRecord, FileType, NewChatMessage, NewDiscussion, NewFileRecord,
};
use studyhub_core::{
    ChangeKind, CoreError, Database, Direction, Filter, InMemoryBackend, Query,
};
use uuid::Uuid;

fn database() -> (Arc<InMemoryBackend>, Database) {
    let backend = Arc::new(InMemoryBackend::new());
    (backend.clone(), Database::new(backend))
}

#[tokio::test]
async fn test_insert_and_fetch_typed_rows() {
    let (_, db) = database();
    let author = Uuid::new_v4();

    let created: Discussion = db
        .insert(&NewDiscussion {
            title: "Help with algorithm complexity".into(),
            content: "Why is heap sort O(n log n)?".into(),
            course: Some("CS 301".into()),
            tags: Some(vec!["sorting".into()]),
            user_id: author,
        })
        .await
        .unwrap();

    assert!(!created.is_solved);
    assert_eq!(created.vote_count, 0);
    assert_eq!(created.tags(), ["sorting".to_string()]);

    let fetched: Discussion = db.get(created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_get_missing_row_is_not_found() {
    let (_, db) = database();
    let err = db.get::<FileRecord>(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_update_typed_rows() {
    let (_, db) = database();
    let file: FileRecord = db
        .insert(&NewFileRecord {
            title: "Linear Algebra Solutions".into(),
            description: None,
            file_name: "la.pdf".into(),
            file_path: "lecture-files/1.pdf".into(),
            file_size: 2048,
            file_type: FileType::Document,
            course: None,
            tags: None,
            user_id: Uuid::new_v4(),
        })
        .await
        .unwrap();

    let updated: Vec<FileRecord> = db
        .update(
            vec![Filter::eq("id", file.id.to_string())],
            &serde_json::json!({"download_count": 5}),
        )
        .await
        .unwrap();
    assert_eq!(updated[0].download_count, 5);
    assert!(updated[0].updated_at >= file.updated_at);
}

#[tokio::test]
async fn test_subscription_decodes_inserted_messages() {
    let (_, db) = database();
    let conversation = Uuid::new_v4();
    let other = Uuid::new_v4();
    let mut sub = db
        .subscribe::<ChatMessage>(Some(Filter::eq("conversation_id", conversation.to_string())))
        .await
        .unwrap();

    for (conv, text) in [(other, "elsewhere"), (conversation, "hello")] {
        let _: ChatMessage = db
            .insert(&NewChatMessage {
                conversation_id: conv,
                user_id: Uuid::new_v4(),
                content: text.into(),
            })
            .await
            .unwrap();
    }

    let event = sub.recv().await.unwrap();
    assert_eq!(event.kind, ChangeKind::Insert);
    let msg: ChatMessage = event.decode().unwrap();
    assert_eq!(msg.content, "hello");
}

#[tokio::test]
async fn test_fetch_ordering() {
    let (_, db) = database();
    let user = Uuid::new_v4();
    for title in ["first", "second", "third"] {
        let _: Discussion = db
            .insert(&NewDiscussion {
                title: title.into(),
                content: "body".into(),
                course: None,
                tags: None,
                user_id: user,
            })
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let newest_first: Vec<Discussion> = db
        .fetch(Query::table("discussions").order("created_at", Direction::Descending))
        .await
        .unwrap();
    let titles: Vec<&str> = newest_first.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}
