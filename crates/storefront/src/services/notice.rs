//! One-shot notices shown on the next rendered page.

use tower_sessions::Session;

use crate::models::{Notice, session_keys};

/// Queue a notice for the next page.
pub async fn flash(session: &Session, notice: Notice) {
    if let Err(e) = session.insert(session_keys::NOTICE, notice).await {
        tracing::warn!(error = %e, "Failed to store notice");
    }
}

/// Take the queued notice, if any.
pub async fn take(session: &Session) -> Option<Notice> {
    session
        .remove::<Notice>(session_keys::NOTICE)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_notice_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        flash(&session, Notice::success("Added to cart")).await;

        assert_eq!(take(&session).await, Some(Notice::success("Added to cart")));
        assert_eq!(take(&session).await, None);
    }
}
