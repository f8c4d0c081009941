use alloc::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::application::{
    Application, ApplicationId, ApplicationStatus, NewApplication, VivaSchedule,
};
use crate::error::{HallError, Missing};

/// Storage for application records. Records are never deleted.
#[async_trait]
pub trait ApplicationRegistry: Send + Sync {
    /// Stores an already validated application with status `Pending`.
    async fn insert(&self, application: NewApplication) -> Result<Application, HallError>;

    async fn get(&self, id: ApplicationId) -> Result<Application, HallError>;

    async fn get_many(
        &self,
        ids: &[ApplicationId],
    ) -> Result<HashMap<ApplicationId, Application>, HallError> {
        let mut applications = HashMap::with_capacity(ids.len());
        for id in ids {
            match self.get(*id).await {
                Ok(application) => {
                    applications.insert(*id, application);
                }
                Err(HallError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(applications)
    }

    /// Ordered by id.
    async fn list(&self, status: Option<ApplicationStatus>)
        -> Result<Vec<Application>, HallError>;

    /// Sets `to` only if the stored status is still `from`, failing with `StaleWrite` otherwise.
    /// A `None` viva keeps the stored schedule.
    async fn compare_and_set_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        viva: Option<VivaSchedule>,
    ) -> Result<Application, HallError>;
}

#[derive(Default)]
struct Applications {
    by_id: BTreeMap<ApplicationId, Application>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryRegistry {
    applications: Mutex<Applications>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // every mutation validates before it writes, so a poisoned lock still holds consistent data
    fn lock(&self) -> MutexGuard<'_, Applications> {
        self.applications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ApplicationRegistry for MemoryRegistry {
    async fn insert(&self, application: NewApplication) -> Result<Application, HallError> {
        let mut applications = self.lock();
        applications.last_id += 1;
        let id = ApplicationId(applications.last_id);
        let application = Application {
            id,
            full_name: application.full_name,
            student_id: application.student_id,
            department: application.department,
            session: application.session,
            contact: application.contact,
            payment_reference: application.payment_reference,
            photo: application.photo,
            status: ApplicationStatus::Pending,
            viva: None,
            created_at: Utc::now(),
        };
        applications.by_id.insert(id, application.clone());
        Ok(application)
    }

    async fn get(&self, id: ApplicationId) -> Result<Application, HallError> {
        self.lock()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(HallError::NotFound(Missing::Application(id)))
    }

    async fn get_many(
        &self,
        ids: &[ApplicationId],
    ) -> Result<HashMap<ApplicationId, Application>, HallError> {
        let applications = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| applications.by_id.get(id))
            .map(|application| (application.id, application.clone()))
            .collect())
    }

    async fn list(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, HallError> {
        Ok(self
            .lock()
            .by_id
            .values()
            .filter(|application| status.map_or(true, |status| application.status == status))
            .cloned()
            .collect())
    }

    async fn compare_and_set_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        viva: Option<VivaSchedule>,
    ) -> Result<Application, HallError> {
        let mut applications = self.lock();
        let application = applications
            .by_id
            .get_mut(&id)
            .ok_or(HallError::NotFound(Missing::Application(id)))?;
        if application.status != from {
            return Err(HallError::StaleWrite {
                id,
                expected: from,
                actual: application.status,
            });
        }
        application.status = to;
        if viva.is_some() {
            application.viva = viva;
        }
        Ok(application.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_application(student_id: &str) -> NewApplication {
        NewApplication {
            full_name: "Jane Doe".to_owned(),
            student_id: student_id.to_owned(),
            department: "CSE".to_owned(),
            session: "2023-24".to_owned(),
            contact: "jane@example.com".to_owned(),
            payment_reference: "PAY-1".to_owned(),
            photo: None,
        }
    }

    #[tokio::test]
    async fn inserted_applications_start_pending_with_increasing_ids() {
        let registry = MemoryRegistry::new();
        let first = registry.insert(new_application("S1")).await.unwrap();
        let second = registry.insert(new_application("S2")).await.unwrap();
        assert_eq!(first.status, ApplicationStatus::Pending);
        assert!(first.id < second.id);
        assert_eq!(registry.get(second.id).await.unwrap(), second);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let registry = MemoryRegistry::new();
        assert!(matches!(
            registry.get(ApplicationId(42)).await,
            Err(HallError::NotFound(Missing::Application(ApplicationId(42))))
        ));
        assert!(matches!(
            registry
                .compare_and_set_status(
                    ApplicationId(42),
                    ApplicationStatus::Pending,
                    ApplicationStatus::Approved,
                    None
                )
                .await,
            Err(HallError::NotFound(_))
        ));
        assert!(registry
            .get_many(&[ApplicationId(42)])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn compare_and_set_rejects_outdated_status() {
        let registry = MemoryRegistry::new();
        let application = registry.insert(new_application("S1")).await.unwrap();
        registry
            .compare_and_set_status(
                application.id,
                ApplicationStatus::Pending,
                ApplicationStatus::Rejected,
                None,
            )
            .await
            .unwrap();
        assert!(matches!(
            registry
                .compare_and_set_status(
                    application.id,
                    ApplicationStatus::Pending,
                    ApplicationStatus::Approved,
                    None,
                )
                .await,
            Err(HallError::StaleWrite {
                actual: ApplicationStatus::Rejected,
                ..
            })
        ));
        assert_eq!(
            registry.get(application.id).await.unwrap().status,
            ApplicationStatus::Rejected
        );
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let registry = MemoryRegistry::new();
        let first = registry.insert(new_application("S1")).await.unwrap();
        let second = registry.insert(new_application("S2")).await.unwrap();
        registry
            .compare_and_set_status(
                second.id,
                ApplicationStatus::Pending,
                ApplicationStatus::Approved,
                None,
            )
            .await
            .unwrap();

        let all = registry.list(None).await.unwrap();
        assert_eq!(
            all.iter().map(|application| application.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        let approved = registry
            .list(Some(ApplicationStatus::Approved))
            .await
            .unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].student_id, "S2");
    }
}
