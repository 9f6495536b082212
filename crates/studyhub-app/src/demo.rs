//! Demo content for offline mode.
//!
//! Every demo account signs in with [`DEMO_PASSWORD`].

use bytes::Bytes;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{Value, json};
use studyhub_core::config::DEFAULT_BUCKET;
use studyhub_core::model::tables;
use studyhub_core::query::Filter;
use studyhub_core::{Backend, InMemoryBackend, Result};
use uuid::Uuid;

pub const DEMO_PASSWORD: &str = "studyhub";

/// (full name, e-mail, department, level)
const PEOPLE: [(&str, &str, &str, &str); 4] = [
    ("Sarah Johnson", "sarah@uni.edu", "Computer Science", "Year 3"),
    ("Mike Chen", "mike@uni.edu", "Mathematics", "Year 2"),
    ("Alex Rodriguez", "alex@uni.edu", "Information Systems", "Year 4"),
    ("Emma Wilson", "emma@uni.edu", "Computer Science", "Year 1"),
];

fn ago(minutes: i64) -> String {
    (Utc::now() - Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn id() -> String {
    Uuid::new_v4().to_string()
}

async fn put(backend: &InMemoryBackend, table: &str, rows: Vec<Value>) -> Result<()> {
    backend.insert(table, rows).await.map(|_| ())
}

/// Fill `backend` with accounts, files, discussions, groups and chats.
pub async fn seed(backend: &InMemoryBackend) -> Result<()> {
    let mut users = Vec::with_capacity(PEOPLE.len());
    for (name, email, department, level) in PEOPLE {
        let session = backend.sign_up(email, DEMO_PASSWORD, name).await?;
        let user = session.user.id.to_string();
        backend
            .update(
                tables::PROFILES,
                vec![Filter::eq("id", user.clone())],
                json!({
                    "department": department,
                    "level": level,
                    "bio": format!("{department} student. Happy to swap notes."),
                }),
            )
            .await?;
        users.push(user);
    }
    let [sarah, mike, alex, emma] = [&users[0], &users[1], &users[2], &users[3]];

    let files = [
        ("Computer Networks - Chapter 5", "networks-ch5.pdf", "application/pdf", "document", "CS 301", sarah, 120, 24),
        ("Linear Algebra Solutions", "linear-algebra.pdf", "application/pdf", "document", "MATH 201", mike, 300, 18),
        ("Database Design Slides", "db-design.pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation", "document", "IS 210", alex, 1440, 31),
        ("Sorting Visualised", "sorting.mp4", "video/mp4", "video", "CS 102", emma, 2880, 7),
    ];
    let mut file_rows = Vec::new();
    for (i, (title, name, mime, kind, course, owner, minutes, downloads)) in files.into_iter().enumerate() {
        let ext = name.rsplit('.').next().unwrap_or("bin");
        let path = format!("lecture-files/demo-{i}.{ext}");
        let body = Bytes::from(format!("{title}\n"));
        let size = body.len();
        backend.upload(DEFAULT_BUCKET, &path, body, mime).await?;
        file_rows.push(json!({
            "id": id(),
            "title": title,
            "description": format!("Shared notes for {course}"),
            "file_name": name,
            "file_path": path,
            "file_size": size,
            "file_type": kind,
            "course": course,
            "tags": [course.to_lowercase().replace(' ', ""), "notes"],
            "download_count": downloads,
            "user_id": owner,
            "created_at": ago(minutes),
        }));
    }
    put(backend, tables::FILES, file_rows).await?;

    let complexity = id();
    let heap_sort = id();
    let solution = id();
    put(
        backend,
        tables::DISCUSSIONS,
        vec![
            json!({
                "id": complexity,
                "title": "Help with algorithm complexity",
                "content": "Why is building a heap O(n) and not O(n log n)?",
                "course": "CS 301",
                "tags": ["algorithms", "big-o"],
                "reply_count": 1,
                "vote_count": 4,
                "user_id": emma,
                "created_at": ago(30),
            }),
            json!({
                "id": id(),
                "title": "Study group for finals?",
                "content": "Anyone up for weekly sessions before the linear algebra final?",
                "course": "MATH 201",
                "tags": ["finals"],
                "vote_count": 2,
                "user_id": mike,
                "created_at": ago(60),
            }),
            json!({
                "id": heap_sort,
                "title": "Explanation of heap sort",
                "content": "Can someone walk through sift-down with an example?",
                "course": "CS 102",
                "tags": ["sorting"],
                "is_solved": true,
                "reply_count": 1,
                "vote_count": 6,
                "user_id": alex,
                "created_at": ago(180),
            }),
        ],
    )
    .await?;
    put(
        backend,
        tables::DISCUSSION_REPLIES,
        vec![
            json!({
                "id": id(),
                "content": "Most nodes sit near the bottom and sift down only a level or two, so the sum is linear.",
                "discussion_id": complexity,
                "user_id": sarah,
                "created_at": ago(20),
            }),
            json!({
                "id": solution,
                "content": "Swap the root with the larger child until the heap property holds again.",
                "is_solution": true,
                "discussion_id": heap_sort,
                "user_id": sarah,
                "created_at": ago(150),
            }),
        ],
    )
    .await?;

    let cs_group = id();
    let math_group = id();
    put(
        backend,
        tables::STUDY_GROUPS,
        vec![
            json!({
                "id": cs_group,
                "name": "CS 301 Study Group",
                "description": "Networks and algorithms, Tuesdays in the library.",
                "course": "CS 301",
                "max_members": 10,
                "created_by": sarah,
                "created_at": ago(10_000),
            }),
            json!({
                "id": math_group,
                "name": "Math Tutoring Circle",
                "description": "Peer tutoring for first and second years.",
                "course": "MATH 201",
                "max_members": 15,
                "created_by": mike,
                "created_at": ago(20_000),
            }),
        ],
    )
    .await?;
    let membership = |group: &String, user: &String, role: &str, minutes: i64| {
        json!({"id": id(), "group_id": group, "user_id": user, "role": role, "joined_at": ago(minutes)})
    };
    put(
        backend,
        tables::GROUP_MEMBERS,
        vec![
            membership(&cs_group, sarah, "admin", 30_000),
            membership(&cs_group, alex, "member", 25_000),
            membership(&cs_group, emma, "member", 21_000),
            membership(&math_group, mike, "admin", 20_000),
            membership(&math_group, sarah, "member", 19_000),
        ],
    )
    .await?;
    let lines = [
        (alex, "Did anyone finish the subnetting exercise?"),
        (sarah, "Yes, I uploaded my notes to the library."),
        (emma, "Thanks! Chapter 5 slides helped a lot."),
    ];
    let group_messages = lines
        .iter()
        .enumerate()
        .map(|(i, (user, text))| {
            json!({
                "id": id(),
                "group_id": cs_group,
                "user_id": user,
                "content": text,
                "message_type": "text",
                "created_at": ago(90 - i as i64 * 10),
            })
        })
        .collect();
    put(backend, tables::GROUP_MESSAGES, group_messages).await?;

    let direct = id();
    put(
        backend,
        tables::CONVERSATIONS,
        vec![json!({
            "id": direct,
            "is_group": false,
            "created_by": sarah,
            "created_at": ago(400),
            "updated_at": ago(45),
        })],
    )
    .await?;
    put(
        backend,
        tables::CONVERSATION_PARTICIPANTS,
        vec![
            json!({"conversation_id": direct, "user_id": sarah}),
            json!({"conversation_id": direct, "user_id": mike}),
        ],
    )
    .await?;
    put(
        backend,
        tables::MESSAGES,
        vec![
            json!({"id": id(), "conversation_id": direct, "user_id": mike, "content": "Are you joining the tutoring circle this week?", "created_at": ago(50)}),
            json!({"id": id(), "conversation_id": direct, "user_id": sarah, "content": "Yes, see you Thursday!", "created_at": ago(45)}),
        ],
    )
    .await?;

    backend.sign_out().await?;
    tracing::debug!(users = users.len(), "Seeded demo data");
    Ok(())
}
