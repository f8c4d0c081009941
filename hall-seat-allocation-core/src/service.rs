use std::sync::Arc;

use tracing::{debug, info};

use crate::address::{HallLayout, SeatAddress};
use crate::application::{
    Application, ApplicationId, ApplicationStatus, NewApplication, StatusChange,
};
use crate::error::{HallError, Missing};
use crate::floor_map::FloorMap;
use crate::registry::ApplicationRegistry;
use crate::store::{Allocation, AllocationStore};

/// Optional narrowing of the approved-unallocated queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovedFilter {
    pub department: Option<String>,
}

impl ApprovedFilter {
    fn matches(&self, application: &Application) -> bool {
        self.department.as_deref().map_or(true, |department| {
            application
                .department
                .eq_ignore_ascii_case(department.trim())
        })
    }
}

/// Entry point for every query and command on applications and seats.
///
/// "Allocated" is never stored on an application. It is derived by asking the
/// [`AllocationStore`] on every query.
#[derive(Clone)]
pub struct AllocationService {
    layout: Arc<HallLayout>,
    registry: Arc<dyn ApplicationRegistry>,
    store: Arc<dyn AllocationStore>,
}

fn log_rejection<T>(operation: &str, result: Result<T, HallError>) -> Result<T, HallError> {
    if let Err(err) = &result {
        if !err.is_storage() {
            debug!(operation, kind = err.kind(), "{err}");
        }
    }
    result
}

impl AllocationService {
    pub fn new(
        layout: Arc<HallLayout>,
        registry: Arc<dyn ApplicationRegistry>,
        store: Arc<dyn AllocationStore>,
    ) -> Self {
        Self {
            layout,
            registry,
            store,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &HallLayout {
        &self.layout
    }

    pub async fn submit(&self, application: NewApplication) -> Result<Application, HallError> {
        let application = log_rejection("submit", application.validate())?;
        let application = self.registry.insert(application).await?;
        info!(
            id = %application.id,
            student_id = %application.student_id,
            "application submitted"
        );
        Ok(application)
    }

    pub async fn application(&self, id: ApplicationId) -> Result<Application, HallError> {
        self.registry.get(id).await
    }

    pub async fn applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, HallError> {
        self.registry.list(status).await
    }

    pub async fn set_status(
        &self,
        id: ApplicationId,
        change: StatusChange,
    ) -> Result<Application, HallError> {
        let result = async {
            let current = self.registry.get(id).await?;
            change.check(&current)?;
            self.registry
                .compare_and_set_status(id, current.status, change.status, change.viva)
                .await
        }
        .await;
        let application = log_rejection("set_status", result)?;
        info!(id = %id, status = %application.status, "application status changed");
        Ok(application)
    }

    /// Approved applications that hold no seat yet, ordered by id.
    pub async fn approved_unallocated(
        &self,
        filter: &ApprovedFilter,
    ) -> Result<Vec<Application>, HallError> {
        let approved = self
            .registry
            .list(Some(ApplicationStatus::Approved))
            .await?;
        let allocated = self.store.allocated_applications().await?;
        Ok(approved
            .into_iter()
            .filter(|application| !allocated.contains(&application.id))
            .filter(|application| filter.matches(application))
            .collect())
    }

    pub async fn floor_map(&self, floor: u8) -> Result<FloorMap, HallError> {
        let seats = log_rejection("floor_map", self.layout.all_seats_on_floor(floor))?;
        let allocations = self.store.allocations_on_floor(floor).await?;
        let ids: Vec<ApplicationId> = allocations
            .iter()
            .map(|allocation| allocation.application_id)
            .collect();
        let applications = self.registry.get_many(&ids).await?;
        Ok(FloorMap::build(floor, &seats, &allocations, &applications))
    }

    pub async fn allocation_for_application(
        &self,
        id: ApplicationId,
    ) -> Result<Allocation, HallError> {
        self.registry.get(id).await?;
        self.store
            .allocation_for_application(id)
            .await?
            .ok_or(HallError::NotFound(Missing::AllocationForApplication(id)))
    }

    async fn ensure_assignable(&self, id: ApplicationId) -> Result<(), HallError> {
        let application = self.registry.get(id).await?;
        if application.status != ApplicationStatus::Approved {
            return Err(HallError::ApplicationNotApproved {
                id,
                status: application.status,
            });
        }
        if let Some(allocation) = self.store.allocation_for_application(id).await? {
            return Err(HallError::ApplicationAlreadyAllocated {
                id,
                address: allocation.address,
            });
        }
        Ok(())
    }

    /// Binds an approved, unallocated application to a free seat.
    ///
    /// The checks here give early, precise errors. The store re-checks both uniqueness rules
    /// inside its own critical section, so of two racing calls for the same seat or the same
    /// application only one can succeed.
    pub async fn assign_seat(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError> {
        let result = async {
            self.layout.validate(address)?;
            self.ensure_assignable(application_id).await?;
            if let Some(occupant) = self.store.allocation_at(address).await? {
                return Err(HallError::SeatAlreadyOccupied {
                    address,
                    occupant: occupant.application_id,
                });
            }
            self.store.insert(address, application_id).await
        }
        .await;
        let allocation = log_rejection("assign_seat", result)?;
        info!(
            application_id = %application_id,
            allocation_id = %allocation.id,
            "assigned {address}"
        );
        Ok(allocation)
    }

    /// Frees an occupied seat and returns the removed allocation.
    pub async fn unassign_seat(&self, address: SeatAddress) -> Result<Allocation, HallError> {
        let result = async {
            self.layout.validate(address)?;
            self.store.remove(address).await
        }
        .await;
        let allocation = log_rejection("unassign_seat", result)?;
        info!(
            application_id = %allocation.application_id,
            "unassigned {address}"
        );
        Ok(allocation)
    }

    /// Atomically hands an occupied seat to another approved, unallocated application.
    pub async fn reassign_seat(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError> {
        let result = async {
            self.layout.validate(address)?;
            self.ensure_assignable(application_id).await?;
            self.store.replace(address, application_id).await
        }
        .await;
        let allocation = log_rejection("reassign_seat", result)?;
        info!(
            application_id = %application_id,
            allocation_id = %allocation.id,
            "reassigned {address}"
        );
        Ok(allocation)
    }
}
