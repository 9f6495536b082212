//! Q&A threads: questions, replies, accepted answers and votes.

use dioxus::prelude::*;
use serde_json::json;
use studyhub_core::model::{Discussion, DiscussionReply, NewDiscussion, NewReply, tables};
use studyhub_core::query::{Direction, Filter, Query};
use studyhub_core::{CoreError, Database};
use uuid::Uuid;

use super::{HookResult, non_blank, profiles_by_id, required};
use crate::state::{AppContext, use_app};

/// Form input for a new question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscussionDraft {
    pub title: String,
    pub content: String,
    pub course: Option<String>,
    pub tags: Vec<String>,
}

/// Solved-state filter of the discussion list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SolvedFilter {
    #[default]
    All,
    Solved,
    Unsolved,
}

/// Discussions whose title, content, course or tags contain `query`
/// (case-insensitive) and that pass the solved filter.
pub fn filter_discussions(list: &[Discussion], query: &str, solved: SolvedFilter) -> Vec<Discussion> {
    let needle = query.trim().to_lowercase();
    list.iter()
        .filter(|d| match solved {
            SolvedFilter::All => true,
            SolvedFilter::Solved => d.is_solved,
            SolvedFilter::Unsolved => !d.is_solved,
        })
        .filter(|d| {
            needle.is_empty()
                || d.title.to_lowercase().contains(&needle)
                || d.content.to_lowercase().contains(&needle)
                || d.course.as_deref().is_some_and(|c| c.to_lowercase().contains(&needle))
                || d.tags().iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
pub struct DiscussionService {
    db: Database,
}

impl DiscussionService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All discussions, newest first, with authors.
    pub async fn fetch_discussions(&self) -> HookResult<Vec<Discussion>> {
        let mut list: Vec<Discussion> = self
            .db
            .fetch(Query::table(tables::DISCUSSIONS).order("created_at", Direction::Descending))
            .await?;
        let authors = profiles_by_id(&self.db, list.iter().map(|d| d.user_id)).await?;
        for d in &mut list {
            d.author = authors.get(&d.user_id).map(|p| p.summary());
        }
        Ok(list)
    }

    pub async fn create_discussion(&self, draft: DiscussionDraft) -> HookResult<Discussion> {
        let user = self.db.require_user()?;
        let tags: Vec<String> = draft
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let row = NewDiscussion {
            title: required(&draft.title, "Title")?,
            content: required(&draft.content, "Question details")?,
            course: non_blank(draft.course),
            tags: (!tags.is_empty()).then_some(tags),
            user_id: user.id,
        };
        let created: Discussion = self.db.insert(&row).await?;
        tracing::info!(discussion = %created.id, "Discussion created");
        Ok(created)
    }

    /// Replies oldest first. Failures are logged and yield an empty thread.
    pub async fn fetch_replies(&self, discussion_id: Uuid) -> Vec<DiscussionReply> {
        match self.try_fetch_replies(discussion_id).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::error!(discussion = %discussion_id, error = %e, "Error fetching replies");
                Vec::new()
            }
        }
    }

    async fn try_fetch_replies(&self, discussion_id: Uuid) -> HookResult<Vec<DiscussionReply>> {
        let mut replies: Vec<DiscussionReply> = self
            .db
            .fetch(
                Query::table(tables::DISCUSSION_REPLIES)
                    .eq("discussion_id", discussion_id.to_string())
                    .order("created_at", Direction::Ascending),
            )
            .await?;
        let authors = profiles_by_id(&self.db, replies.iter().map(|r| r.user_id)).await?;
        for r in &mut replies {
            r.author = authors.get(&r.user_id).map(|p| p.summary());
        }
        Ok(replies)
    }

    /// Post a reply and refresh the thread's reply count.
    pub async fn create_reply(&self, discussion_id: Uuid, content: &str) -> HookResult<DiscussionReply> {
        let user = self.db.require_user()?;
        let row = NewReply {
            content: required(content, "Reply")?,
            discussion_id,
            user_id: user.id,
        };
        let reply: DiscussionReply = self.db.insert(&row).await?;

        let count = self
            .db
            .count(Query::table(tables::DISCUSSION_REPLIES).eq("discussion_id", discussion_id.to_string()))
            .await?;
        self.db
            .update::<Discussion, _>(
                vec![Filter::eq("id", discussion_id.to_string())],
                &json!({ "reply_count": count }),
            )
            .await?;
        Ok(reply)
    }

    /// Accept `reply` as the answer. Only the question's author may do this.
    pub async fn mark_solution(&self, reply: &DiscussionReply) -> HookResult<()> {
        let user = self.db.require_user()?;
        let discussion: Discussion = self.db.get(reply.discussion_id).await?;
        if discussion.user_id != user.id {
            return Err(CoreError::PermissionDenied(
                "only the author of the question can accept an answer".to_string(),
            )
            .into());
        }

        let thread = Filter::eq("discussion_id", reply.discussion_id.to_string());
        self.db
            .update::<DiscussionReply, _>(
                vec![thread, Filter::eq("is_solution", true)],
                &json!({ "is_solution": false }),
            )
            .await?;
        self.db
            .update::<DiscussionReply, _>(
                vec![Filter::eq("id", reply.id.to_string())],
                &json!({ "is_solution": true }),
            )
            .await?;
        self.db
            .update::<Discussion, _>(
                vec![Filter::eq("id", discussion.id.to_string())],
                &json!({ "is_solved": true }),
            )
            .await?;
        tracing::info!(discussion = %discussion.id, reply = %reply.id, "Answer accepted");
        Ok(())
    }

    /// Up-vote a question, returning the new count.
    pub async fn vote(&self, discussion_id: Uuid) -> HookResult<i64> {
        self.db.require_user()?;
        let discussion: Discussion = self.db.get(discussion_id).await?;
        let votes = discussion.vote_count + 1;
        self.db
            .update::<Discussion, _>(
                vec![Filter::eq("id", discussion_id.to_string())],
                &json!({ "vote_count": votes }),
            )
            .await?;
        Ok(votes)
    }
}

/// Discussion list mirrored into signals.
#[derive(Clone, Copy, PartialEq)]
pub struct UseDiscussions {
    app: AppContext,
    pub discussions: Signal<Vec<Discussion>>,
    pub loading: Signal<bool>,
}

pub fn use_discussions() -> UseDiscussions {
    let app = use_app();
    let discussions = use_signal(Vec::new);
    let loading = use_signal(|| true);
    let hook = UseDiscussions {
        app,
        discussions,
        loading,
    };
    use_effect(move || hook.refresh());
    hook
}

impl UseDiscussions {
    fn service(&self) -> DiscussionService {
        DiscussionService::new(self.app.db())
    }

    pub fn refresh(&self) {
        let hook = *self;
        spawn(async move { hook.reload().await });
    }

    async fn reload(&self) {
        let (mut discussions, mut loading) = (self.discussions, self.loading);
        loading.set(true);
        match self.service().fetch_discussions().await {
            Ok(list) => discussions.set(list),
            Err(e) => {
                tracing::error!(error = %e, "Error fetching discussions");
                self.app.toaster.error("Failed to load discussions", &e);
            }
        }
        loading.set(false);
    }

    /// Create a question; `true` on success.
    pub async fn create(&self, draft: DiscussionDraft) -> bool {
        match self.service().create_discussion(draft).await {
            Ok(_) => {
                self.app.toaster.success("Discussion created successfully");
                self.reload().await;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Error creating discussion");
                self.app.toaster.error("Failed to create discussion", &e);
                false
            }
        }
    }

    pub async fn replies(&self, discussion_id: Uuid) -> Vec<DiscussionReply> {
        self.service().fetch_replies(discussion_id).await
    }

    pub async fn reply(&self, discussion_id: Uuid, content: String) -> bool {
        match self.service().create_reply(discussion_id, &content).await {
            Ok(_) => {
                self.app.toaster.success("Reply posted");
                self.reload().await;
                true
            }
            Err(e) => {
                self.app.toaster.error("Failed to post reply", &e);
                false
            }
        }
    }

    pub async fn mark_solution(&self, reply: DiscussionReply) -> bool {
        match self.service().mark_solution(&reply).await {
            Ok(()) => {
                self.app.toaster.success("Marked as solution");
                self.reload().await;
                true
            }
            Err(e) => {
                self.app.toaster.error("Could not mark solution", &e);
                false
            }
        }
    }

    pub async fn vote(&self, discussion_id: Uuid) {
        match self.service().vote(discussion_id).await {
            Ok(votes) => {
                let mut discussions = self.discussions;
                if let Some(d) = discussions.write().iter_mut().find(|d| d.id == discussion_id) {
                    d.vote_count = votes;
                }
            }
            Err(e) => self.app.toaster.error("Vote failed", &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookError;
    use crate::hooks::testing::{signed_in, switch_to};
    use studyhub_core::Backend;

    fn draft(title: &str) -> DiscussionDraft {
        DiscussionDraft {
            title: title.to_string(),
            content: "How does this work?".to_string(),
            course: Some(" CS 301 ".to_string()),
            tags: vec!["algorithms".into(), " ".into()],
        }
    }

    #[tokio::test]
    async fn test_create_requires_user() {
        let (db, backend, _) = signed_in("Emma Wilson").await;
        backend.sign_out().await.unwrap();
        let err = DiscussionService::new(db).create_discussion(draft("Q")).await.unwrap_err();
        assert!(err.is_not_authenticated());
    }

    #[tokio::test]
    async fn test_create_and_fetch_newest_first_with_author() {
        let (db, _backend, me) = signed_in("Emma Wilson").await;
        let service = DiscussionService::new(db);
        let first = service.create_discussion(draft("First")).await.unwrap();
        assert_eq!(first.course.as_deref(), Some("CS 301"));
        assert_eq!(first.tags(), ["algorithms"]);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        service.create_discussion(draft("Second")).await.unwrap();

        let list = service.fetch_discussions().await.unwrap();
        assert_eq!(list[0].title, "Second");
        assert_eq!(list[1].user_id, me);
        assert_eq!(
            list[1].author.as_ref().and_then(|a| a.full_name.as_deref()),
            Some("Emma Wilson")
        );
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let (db, _backend, _) = signed_in("Emma Wilson").await;
        let err = DiscussionService::new(db).create_discussion(draft("   ")).await.unwrap_err();
        assert!(matches!(err, HookError::Required("Title")));
    }

    #[tokio::test]
    async fn test_replies_update_count_and_solution_rules() {
        let (db, backend, _) = signed_in("Emma Wilson").await;
        let service = DiscussionService::new(db);
        let question = service.create_discussion(draft("Heap sort?")).await.unwrap();

        switch_to(&backend, "Sarah Johnson").await;
        let reply = service.create_reply(question.id, "Sift down from the root.").await.unwrap();
        service.create_reply(question.id, "Also see chapter 6.").await.unwrap();

        let replies = service.fetch_replies(question.id).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].content, "Sift down from the root.");
        assert_eq!(replies[0].author.as_ref().unwrap().full_name.as_deref(), Some("Sarah Johnson"));

        let refreshed = service.fetch_discussions().await.unwrap();
        assert_eq!(refreshed[0].reply_count, 2);

        // Sarah did not ask the question.
        let err = service.mark_solution(&reply).await.unwrap_err();
        assert!(matches!(err, HookError::Core(CoreError::PermissionDenied(_))));

        backend.sign_in("emma.wilson@uni.edu", "secret1").await.unwrap();
        service.mark_solution(&reply).await.unwrap();
        let solved = service.fetch_discussions().await.unwrap();
        assert!(solved[0].is_solved);
        assert!(service.fetch_replies(question.id).await[0].is_solution);
    }

    #[tokio::test]
    async fn test_replies_of_unknown_discussion_are_empty() {
        let (db, _backend, _) = signed_in("Emma Wilson").await;
        assert!(DiscussionService::new(db).fetch_replies(Uuid::new_v4()).await.is_empty());
    }

    #[tokio::test]
    async fn test_vote_increments() {
        let (db, _backend, _) = signed_in("Emma Wilson").await;
        let service = DiscussionService::new(db);
        let question = service.create_discussion(draft("Vote me")).await.unwrap();
        assert_eq!(service.vote(question.id).await.unwrap(), 1);
        assert_eq!(service.vote(question.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_filter_discussions() {
        let (db, _backend, _) = signed_in("Emma Wilson").await;
        let service = DiscussionService::new(db);
        service.create_discussion(draft("Graph traversal")).await.unwrap();
        let mut list = service.fetch_discussions().await.unwrap();
        let mut solved = list[0].clone();
        solved.title = "Binary trees".into();
        solved.tags = Some(vec!["trees".into()]);
        solved.is_solved = true;
        list.push(solved);

        assert_eq!(filter_discussions(&list, "GRAPH", SolvedFilter::All).len(), 1);
        assert_eq!(filter_discussions(&list, "trees", SolvedFilter::All).len(), 1);
        assert_eq!(filter_discussions(&list, "cs 301", SolvedFilter::All).len(), 2);
        assert_eq!(filter_discussions(&list, "", SolvedFilter::Unsolved).len(), 1);
        assert_eq!(filter_discussions(&list, "graph", SolvedFilter::Solved).len(), 0);
    }
}
