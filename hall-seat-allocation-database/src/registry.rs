use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use hall_seat_allocation_core::{
    Application, ApplicationId, ApplicationRegistry, ApplicationStatus, HallError, Missing,
    NewApplication, VivaSchedule,
};

use crate::error::DatabaseError;
use crate::models::{ApplicationRow, NewApplicationRow};
use crate::schema::applications;
use crate::{connection, Pool};

pub struct PgRegistry {
    pool: Pool,
}

impl PgRegistry {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

async fn find(
    connection: &mut AsyncPgConnection,
    id: ApplicationId,
) -> Result<Option<Application>, DatabaseError> {
    applications::table
        .find(id.0)
        .select(ApplicationRow::as_select())
        .first(connection)
        .await
        .optional()?
        .map(Application::try_from)
        .transpose()
}

#[async_trait]
impl ApplicationRegistry for PgRegistry {
    async fn insert(&self, application: NewApplication) -> Result<Application, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let row = diesel::insert_into(applications::table)
            .values(NewApplicationRow {
                full_name: &application.full_name,
                student_id: &application.student_id,
                department: &application.department,
                academic_session: &application.session,
                contact: &application.contact,
                payment_reference: &application.payment_reference,
                photo: application.photo.as_deref(),
                status: ApplicationStatus::Pending.as_str(),
            })
            .returning(ApplicationRow::as_returning())
            .get_result(&mut pooled)
            .await
            .map_err(DatabaseError::from)?;
        Ok(Application::try_from(row)?)
    }

    async fn get(&self, id: ApplicationId) -> Result<Application, HallError> {
        let mut pooled = connection(&self.pool).await?;
        find(&mut pooled, id)
            .await?
            .ok_or(HallError::NotFound(Missing::Application(id)))
    }

    async fn get_many(
        &self,
        ids: &[ApplicationId],
    ) -> Result<HashMap<ApplicationId, Application>, HallError> {
        let ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let mut pooled = connection(&self.pool).await?;
        let rows = applications::table
            .filter(applications::id.eq_any(ids))
            .select(ApplicationRow::as_select())
            .load(&mut pooled)
            .await
            .map_err(DatabaseError::from)?;
        rows.into_iter()
            .map(|row| -> Result<_, HallError> {
                let application = Application::try_from(row)?;
                Ok((application.id, application))
            })
            .collect()
    }

    async fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let mut query = applications::table
            .select(ApplicationRow::as_select())
            .order(applications::id)
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(applications::status.eq(status.as_str()));
        }
        let rows = query.load(&mut pooled).await.map_err(DatabaseError::from)?;
        Ok(rows
            .into_iter()
            .map(Application::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn compare_and_set_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        viva: Option<VivaSchedule>,
    ) -> Result<Application, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let target = applications::table
            .filter(applications::id.eq(id.0))
            .filter(applications::status.eq(from.as_str()));
        let updated = match viva {
            Some(viva) => {
                diesel::update(target)
                    .set((
                        applications::status.eq(to.as_str()),
                        applications::viva_date.eq(viva.date),
                        applications::viva_serial.eq(i64::from(viva.serial)),
                    ))
                    .returning(ApplicationRow::as_returning())
                    .get_result(&mut pooled)
                    .await
            }
            None => {
                diesel::update(target)
                    .set(applications::status.eq(to.as_str()))
                    .returning(ApplicationRow::as_returning())
                    .get_result(&mut pooled)
                    .await
            }
        }
        .optional()
        .map_err(DatabaseError::from)?;

        if let Some(row) = updated {
            return Ok(Application::try_from(row)?);
        }
        // nothing matched: either the application is gone or its status moved on
        match find(&mut pooled, id).await? {
            Some(current) => Err(HallError::StaleWrite {
                id,
                expected: from,
                actual: current.status,
            }),
            None => Err(HallError::NotFound(Missing::Application(id))),
        }
    }
}
