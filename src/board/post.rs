//! Post model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Content that replaces the body of a deleted post.
pub const DELETED_POST_CONTENT: &str = "[This post has been deleted]";

/// What sort of post this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostKind {
    #[default]
    Post,
    Question,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::Post => "Post",
            PostKind::Question => "Question",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostKind {
    type Err = String;

    /// Accepts singular or plural, any case ("questions" is a Question).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "post" | "posts" => Ok(PostKind::Post),
            "question" | "questions" => Ok(PostKind::Question),
            _ => Err(format!("unknown post kind: {s}")),
        }
    }
}

/// A stored post, joined with its thread name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub author: String,
    pub thread_id: i64,
    pub thread: String,
    pub title: String,
    kind: String,
    pub content: String,
    pub is_private: bool,
    pub is_anonymous: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub deleted: bool,
    pub deleted_at: Option<String>,
}

impl Post {
    /// Unknown stored kinds read as `Post`.
    pub fn kind(&self) -> PostKind {
        self.kind.parse().unwrap_or_default()
    }

    pub fn is_authored_by(&self, username: &str) -> bool {
        self.author.eq_ignore_ascii_case(username)
    }
}

/// A post as listed for a particular viewer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostSummary {
    #[sqlx(flatten)]
    pub post: Post,
    pub reply_count: i64,
    /// Replies the viewer has not marked read.
    pub unread_reply_count: i64,
    /// Whether the viewer has read the post.
    pub is_read: bool,
}

/// Data for creating a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author: String,
    /// Thread name; blank means "General".
    pub thread: String,
    pub title: String,
    pub kind: PostKind,
    pub content: String,
    pub is_private: bool,
    pub is_anonymous: bool,
}

impl NewPost {
    pub fn new(
        author: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            thread: String::new(),
            title: title.into(),
            kind: PostKind::Post,
            content: content.into(),
            is_private: false,
            is_anonymous: false,
        }
    }

    pub fn in_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = thread.into();
        self
    }

    pub fn with_kind(mut self, kind: PostKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    pub fn anonymous(mut self, is_anonymous: bool) -> Self {
        self.is_anonymous = is_anonymous;
        self
    }
}

/// Read-state filter for post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFilter {
    #[default]
    Any,
    /// Posts the viewer has read ("Seen").
    Read,
    /// Posts the viewer has not read ("Unseen").
    Unread,
}

impl ReadFilter {
    /// Parse "seen"/"read" and "unseen"/"unread"; anything else is `Any`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "seen" | "read" => ReadFilter::Read,
            "unseen" | "unread" => ReadFilter::Unread,
            _ => ReadFilter::Any,
        }
    }
}

/// Search criteria for posts. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Case-insensitive substring of title or content.
    pub keyword: Option<String>,
    /// Thread name; "All" does not filter.
    pub thread: Option<String>,
    pub author: Option<String>,
    pub kind: Option<PostKind>,
    pub read: ReadFilter,
    pub include_deleted: bool,
}

impl PostQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = Some(thread.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn kind(mut self, kind: PostKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn read(mut self, read: ReadFilter) -> Self {
        self.read = read;
        self
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }
}
