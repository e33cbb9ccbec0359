//! Discussion board for Foundation.
//!
//! - Threads (named categories, "General" by default)
//! - Posts with kind, privacy and anonymity flags, soft deletion
//! - Replies
//! - Per-user read tracking for posts and replies

mod post;
mod post_repository;
mod read;
mod reply;
mod service;
mod thread;
mod thread_repository;

pub use post::{NewPost, Post, PostKind, PostQuery, PostSummary, ReadFilter, DELETED_POST_CONTENT};
pub use post_repository::{Audience, PostRepository};
pub use read::{ReadRepository, ReplyFilter, ReplyView};
pub use reply::{display_author, Reply, ReplyRepository, ANONYMOUS};
pub use service::{BoardService, PostView, Viewer, MAX_BODY_LENGTH, MAX_TITLE_LENGTH};
pub use thread::{normalize_thread_name, Thread, GENERAL_THREAD, MAX_THREAD_NAME_LENGTH};
pub use thread_repository::ThreadRepository;
