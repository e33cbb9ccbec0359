//! Thread model.
//!
//! Threads are named categories posts are filed under. "General" always
//! exists.

use serde::Serialize;

/// Name of the default thread.
pub const GENERAL_THREAD: &str = "General";

/// Maximum length of a thread name (in characters).
pub const MAX_THREAD_NAME_LENGTH: usize = 100;

/// A discussion thread.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Thread {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

impl Thread {
    pub fn is_general(&self) -> bool {
        self.name.eq_ignore_ascii_case(GENERAL_THREAD)
    }
}

/// Normalize a thread name: trimmed, blank meaning "General".
pub fn normalize_thread_name(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() {
        GENERAL_THREAD
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_thread_name() {
        assert_eq!(normalize_thread_name(""), "General");
        assert_eq!(normalize_thread_name("   "), "General");
        assert_eq!(normalize_thread_name(" Homework "), "Homework");
    }
}
