//! End-to-end walk through the offline demo: connect, sign in and use each
//! service against the seeded data.

use chrono::Utc;
use studyhub_app::bridge::{LaunchSettings, connect};
use studyhub_app::demo::DEMO_PASSWORD;
use studyhub_app::hooks::auth::AuthService;
use studyhub_app::hooks::chat::ChatService;
use studyhub_app::hooks::files::FileService;
use studyhub_app::hooks::group_chat::GroupChatService;
use studyhub_app::hooks::groups::GroupService;
use studyhub_app::hooks::stats::StatsService;

async fn offline(dir: &std::path::Path) -> studyhub_app::bridge::AppHandle {
    let settings = LaunchSettings {
        config_path: None,
        offline: true,
        data_dir: dir.to_path_buf(),
    };
    connect(&settings).await.unwrap()
}

#[tokio::test]
async fn test_demo_user_tour() {
    let dir = tempfile::tempdir().unwrap();
    let handle = offline(dir.path()).await;
    let db = handle.db.clone();

    let session = AuthService::new(db.clone())
        .sign_in("sarah@uni.edu", DEMO_PASSWORD)
        .await
        .unwrap();
    let sarah = session.user.id;
    assert_eq!(db.current_user().map(|u| u.id), Some(sarah));

    // Library: newest first, download writes the file and bumps the counter.
    let files = FileService::new(db.clone(), handle.bucket());
    let listed = files.fetch_files().await.unwrap();
    assert_eq!(listed.len(), 4);
    let newest = &listed[0];
    assert_eq!(newest.title, "Computer Networks - Chapter 5");
    assert_eq!(
        newest.uploader.as_ref().and_then(|u| u.full_name.as_deref()),
        Some("Sarah Johnson")
    );
    let saved = files.download_to(newest, &dir.path().join("downloads")).await.unwrap();
    assert_eq!(saved.file_name().unwrap(), "networks-ch5.pdf");
    assert_eq!(std::fs::read_to_string(&saved).unwrap(), "Computer Networks - Chapter 5\n");
    let after = files.fetch_files().await.unwrap();
    assert_eq!(after[0].download_count, newest.download_count + 1);

    // Groups: Sarah belongs to both seeded groups.
    let groups = GroupService::new(db.clone());
    let mine = groups.my_group_ids().await.unwrap();
    assert_eq!(mine.len(), 2);
    let all = groups.fetch_groups().await.unwrap();
    let cs = all.iter().find(|g| g.name == "CS 301 Study Group").unwrap();
    assert_eq!(cs.member_count, 3);

    let room = GroupChatService::new(db.clone(), cs.id);
    let before = room.fetch_messages().await.unwrap().len();
    room.send_message("Meeting moved to Wednesday").await.unwrap();
    let transcript = room.fetch_messages().await.unwrap();
    assert_eq!(transcript.len(), before + 1);
    assert_eq!(transcript.last().unwrap().content, "Meeting moved to Wednesday");

    // Chat: the seeded direct conversation with Mike.
    let chat = ChatService::new(db.clone());
    let conversations = chat.fetch_conversations().await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].display_name(sarah), "Mike Chen");
    assert_eq!(
        conversations[0].last_message.as_ref().map(|m| m.content.as_str()),
        Some("Yes, see you Thursday!")
    );

    // Stats reflect the seed plus what happened above.
    let stats = StatsService::new(db.clone());
    let global = stats.global(Utc::now()).await.unwrap();
    assert_eq!(global.total_files, 4);
    assert_eq!(global.total_discussions, 3);
    assert_eq!(global.total_groups, 2);
    let user = stats.for_user(sarah).await.unwrap();
    assert_eq!(user.files_uploaded, 1);
    assert_eq!(user.answers_given, 2);
    assert_eq!(user.groups_joined, 2);
}

#[tokio::test]
async fn test_mutations_require_a_session_after_sign_out() {
    let dir = tempfile::tempdir().unwrap();
    let handle = offline(dir.path()).await;
    let auth = AuthService::new(handle.db.clone());

    auth.sign_in("mike@uni.edu", DEMO_PASSWORD).await.unwrap();
    auth.sign_out().await.unwrap();
    assert!(handle.db.current_user().is_none());

    let err = GroupService::new(handle.db.clone())
        .create_group(Default::default())
        .await
        .unwrap_err();
    assert!(err.is_not_authenticated());
}
