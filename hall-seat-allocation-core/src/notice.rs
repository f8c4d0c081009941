use alloc::collections::BTreeMap;
use core::fmt::{self, Display};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HallError, Missing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeId(pub i64);

impl Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: NoticeId,
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotice {
    pub title: String,
    pub body: String,
}

/// Width of the `notices.title` column.
pub const TITLE_LIMIT: usize = 255;

impl NewNotice {
    pub fn validate(self) -> Result<Self, HallError> {
        let title = self.title.trim();
        let body = self.body.trim();
        if title.is_empty() || body.is_empty() {
            return Err(HallError::Validation(
                "a notice needs a title and a body".to_owned(),
            ));
        }
        if title.chars().count() > TITLE_LIMIT {
            return Err(HallError::Validation(format!(
                "a notice title has at most {TITLE_LIMIT} characters"
            )));
        }
        Ok(Self {
            title: title.to_owned(),
            body: body.to_owned(),
        })
    }
}

#[async_trait]
pub trait NoticeBoard: Send + Sync {
    async fn insert(&self, notice: NewNotice) -> Result<Notice, HallError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<Notice>, HallError>;

    async fn get(&self, id: NoticeId) -> Result<Notice, HallError>;

    async fn remove(&self, id: NoticeId) -> Result<Notice, HallError>;
}

#[derive(Default)]
struct Notices {
    by_id: BTreeMap<NoticeId, Notice>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryNoticeBoard {
    notices: Mutex<Notices>,
}

impl MemoryNoticeBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Notices> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl NoticeBoard for MemoryNoticeBoard {
    async fn insert(&self, notice: NewNotice) -> Result<Notice, HallError> {
        let mut notices = self.lock();
        notices.last_id += 1;
        let notice = Notice {
            id: NoticeId(notices.last_id),
            title: notice.title,
            body: notice.body,
            published_at: Utc::now(),
        };
        notices.by_id.insert(notice.id, notice.clone());
        Ok(notice)
    }

    async fn list(&self) -> Result<Vec<Notice>, HallError> {
        // ids grow with publication time
        Ok(self.lock().by_id.values().rev().cloned().collect())
    }

    async fn get(&self, id: NoticeId) -> Result<Notice, HallError> {
        self.lock()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(HallError::NotFound(Missing::Notice(id)))
    }

    async fn remove(&self, id: NoticeId) -> Result<Notice, HallError> {
        self.lock()
            .by_id
            .remove(&id)
            .ok_or(HallError::NotFound(Missing::Notice(id)))
    }
}

#[derive(Clone)]
pub struct NoticeService {
    board: Arc<dyn NoticeBoard>,
}

impl NoticeService {
    pub fn new(board: Arc<dyn NoticeBoard>) -> Self {
        Self { board }
    }

    pub async fn publish(&self, notice: NewNotice) -> Result<Notice, HallError> {
        let notice = self.board.insert(notice.validate()?).await?;
        info!(id = %notice.id, title = %notice.title, "published notice");
        Ok(notice)
    }

    pub async fn list(&self) -> Result<Vec<Notice>, HallError> {
        self.board.list().await
    }

    pub async fn get(&self, id: NoticeId) -> Result<Notice, HallError> {
        self.board.get(id).await
    }

    pub async fn remove(&self, id: NoticeId) -> Result<Notice, HallError> {
        let notice = self.board.remove(id).await?;
        info!(id = %notice.id, "removed notice");
        Ok(notice)
    }
}
