use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use hall_seat_allocation_core::{HallError, Missing, NewNotice, Notice, NoticeBoard, NoticeId};

use crate::error::DatabaseError;
use crate::models::{NewNoticeRow, NoticeRow};
use crate::schema::notices;
use crate::{connection, Pool};

pub struct PgNoticeBoard {
    pool: Pool,
}

impl PgNoticeBoard {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoticeBoard for PgNoticeBoard {
    async fn insert(&self, notice: NewNotice) -> Result<Notice, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let row = diesel::insert_into(notices::table)
            .values(NewNoticeRow {
                title: &notice.title,
                body: &notice.body,
            })
            .returning(NoticeRow::as_returning())
            .get_result(&mut pooled)
            .await
            .map_err(DatabaseError::from)?;
        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Notice>, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let rows = notices::table
            .order((notices::published_at.desc(), notices::id.desc()))
            .select(NoticeRow::as_select())
            .load(&mut pooled)
            .await
            .map_err(DatabaseError::from)?;
        Ok(rows.into_iter().map(Notice::from).collect())
    }

    async fn get(&self, id: NoticeId) -> Result<Notice, HallError> {
        let mut pooled = connection(&self.pool).await?;
        notices::table
            .find(id.0)
            .select(NoticeRow::as_select())
            .first(&mut pooled)
            .await
            .optional()
            .map_err(DatabaseError::from)?
            .map(Notice::from)
            .ok_or(HallError::NotFound(Missing::Notice(id)))
    }

    async fn remove(&self, id: NoticeId) -> Result<Notice, HallError> {
        let mut pooled = connection(&self.pool).await?;
        diesel::delete(notices::table.find(id.0))
            .returning(NoticeRow::as_returning())
            .get_result(&mut pooled)
            .await
            .optional()
            .map_err(DatabaseError::from)?
            .map(Notice::from)
            .ok_or(HallError::NotFound(Missing::Notice(id)))
    }
}
