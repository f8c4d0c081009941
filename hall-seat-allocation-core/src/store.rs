use alloc::collections::BTreeMap;
use core::fmt::{self, Display};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::SeatAddress;
use crate::application::ApplicationId;
use crate::error::{HallError, Missing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(pub i64);

impl Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Binding of one approved application to one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub address: SeatAddress,
    pub application_id: ApplicationId,
    pub assigned_at: DateTime<Utc>,
}

/// Owner of the seat → allocation mapping.
///
/// Implementations guarantee that no seat holds more than one allocation and no application
/// holds more than one seat, even under concurrent calls of the mutating methods.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    async fn allocation_at(&self, address: SeatAddress) -> Result<Option<Allocation>, HallError>;

    async fn is_occupied(&self, address: SeatAddress) -> Result<bool, HallError> {
        Ok(self.allocation_at(address).await?.is_some())
    }

    async fn allocation_for_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<Allocation>, HallError>;

    /// Sorted by address.
    async fn allocations_on_floor(&self, floor: u8) -> Result<Vec<Allocation>, HallError>;

    async fn allocated_applications(&self) -> Result<HashSet<ApplicationId>, HallError>;

    /// Insert-if-absent. Fails with `ApplicationAlreadyAllocated` if the application holds any
    /// seat, then with `SeatAlreadyOccupied` if the seat is taken.
    async fn insert(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError>;

    async fn remove(&self, address: SeatAddress) -> Result<Allocation, HallError>;

    /// Replaces the occupant of an occupied seat with an application that holds no seat.
    async fn replace(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError>;
}

#[derive(Default)]
struct Tables {
    by_seat: BTreeMap<SeatAddress, Allocation>,
    by_application: HashMap<ApplicationId, SeatAddress>,
    last_id: i64,
}

impl Tables {
    fn ensure_unallocated(&self, application_id: ApplicationId) -> Result<(), HallError> {
        match self.by_application.get(&application_id) {
            Some(address) => Err(HallError::ApplicationAlreadyAllocated {
                id: application_id,
                address: *address,
            }),
            None => Ok(()),
        }
    }

    fn allocate(&mut self, address: SeatAddress, application_id: ApplicationId) -> Allocation {
        self.last_id += 1;
        let allocation = Allocation {
            id: AllocationId(self.last_id),
            address,
            application_id,
            assigned_at: Utc::now(),
        };
        self.by_seat.insert(address, allocation.clone());
        self.by_application.insert(application_id, address);
        allocation
    }
}

#[derive(Default)]
pub struct MemoryAllocationStore {
    tables: Mutex<Tables>,
}

impl MemoryAllocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // both indexes are only written after all checks passed
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AllocationStore for MemoryAllocationStore {
    async fn allocation_at(&self, address: SeatAddress) -> Result<Option<Allocation>, HallError> {
        Ok(self.lock().by_seat.get(&address).cloned())
    }

    async fn allocation_for_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<Allocation>, HallError> {
        let tables = self.lock();
        Ok(tables
            .by_application
            .get(&application_id)
            .and_then(|address| tables.by_seat.get(address))
            .cloned())
    }

    async fn allocations_on_floor(&self, floor: u8) -> Result<Vec<Allocation>, HallError> {
        Ok(self
            .lock()
            .by_seat
            .range(SeatAddress::first_on_floor(floor)..=SeatAddress::last_on_floor(floor))
            .map(|(_, allocation)| allocation.clone())
            .collect())
    }

    async fn allocated_applications(&self) -> Result<HashSet<ApplicationId>, HallError> {
        Ok(self.lock().by_application.keys().copied().collect())
    }

    async fn insert(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError> {
        let mut tables = self.lock();
        tables.ensure_unallocated(application_id)?;
        if let Some(occupant) = tables.by_seat.get(&address) {
            return Err(HallError::SeatAlreadyOccupied {
                address,
                occupant: occupant.application_id,
            });
        }
        Ok(tables.allocate(address, application_id))
    }

    async fn remove(&self, address: SeatAddress) -> Result<Allocation, HallError> {
        let mut tables = self.lock();
        let allocation = tables
            .by_seat
            .remove(&address)
            .ok_or(HallError::NotFound(Missing::Allocation(address)))?;
        tables.by_application.remove(&allocation.application_id);
        Ok(allocation)
    }

    async fn replace(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError> {
        let mut tables = self.lock();
        tables.ensure_unallocated(application_id)?;
        let previous = tables
            .by_seat
            .remove(&address)
            .ok_or(HallError::NotFound(Missing::Allocation(address)))?;
        tables.by_application.remove(&previous.application_id);
        Ok(tables.allocate(address, application_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEAT: SeatAddress = SeatAddress::new(2, 10, 1);

    #[tokio::test]
    async fn insert_then_lookup_by_seat_and_application() {
        let store = MemoryAllocationStore::new();
        let allocation = store.insert(SEAT, ApplicationId(1)).await.unwrap();

        assert!(store.is_occupied(SEAT).await.unwrap());
        assert_eq!(store.allocation_at(SEAT).await.unwrap(), Some(allocation.clone()));
        assert_eq!(
            store
                .allocation_for_application(ApplicationId(1))
                .await
                .unwrap(),
            Some(allocation)
        );
        assert!(!store.is_occupied(SeatAddress::new(2, 10, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn insert_enforces_both_uniqueness_rules() {
        let store = MemoryAllocationStore::new();
        store.insert(SEAT, ApplicationId(1)).await.unwrap();

        assert!(matches!(
            store.insert(SEAT, ApplicationId(2)).await,
            Err(HallError::SeatAlreadyOccupied {
                occupant: ApplicationId(1),
                ..
            })
        ));
        assert!(matches!(
            store
                .insert(SeatAddress::new(1, 1, 1), ApplicationId(1))
                .await,
            Err(HallError::ApplicationAlreadyAllocated { address: SEAT, .. })
        ));
        assert_eq!(
            store.allocated_applications().await.unwrap(),
            HashSet::from([ApplicationId(1)])
        );
    }

    #[tokio::test]
    async fn allocations_on_floor_only_returns_that_floor_in_order() {
        let store = MemoryAllocationStore::new();
        store
            .insert(SeatAddress::new(2, 12, 3), ApplicationId(1))
            .await
            .unwrap();
        store
            .insert(SeatAddress::new(3, 1, 1), ApplicationId(2))
            .await
            .unwrap();
        store.insert(SEAT, ApplicationId(3)).await.unwrap();
        store
            .insert(SeatAddress::new(1, 20, 4), ApplicationId(4))
            .await
            .unwrap();

        let floor = store.allocations_on_floor(2).await.unwrap();
        assert_eq!(
            floor
                .iter()
                .map(|allocation| allocation.address)
                .collect::<Vec<_>>(),
            vec![SEAT, SeatAddress::new(2, 12, 3)]
        );
    }

    #[tokio::test]
    async fn remove_frees_seat_and_application() {
        let store = MemoryAllocationStore::new();
        let allocation = store.insert(SEAT, ApplicationId(1)).await.unwrap();
        assert_eq!(store.remove(SEAT).await.unwrap(), allocation);
        assert!(!store.is_occupied(SEAT).await.unwrap());
        assert!(matches!(
            store.remove(SEAT).await,
            Err(HallError::NotFound(Missing::Allocation(SEAT)))
        ));
        store
            .insert(SeatAddress::new(1, 1, 1), ApplicationId(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn replace_swaps_the_occupant() {
        let store = MemoryAllocationStore::new();
        let previous = store.insert(SEAT, ApplicationId(1)).await.unwrap();
        let replacement = store.replace(SEAT, ApplicationId(2)).await.unwrap();

        assert_ne!(previous.id, replacement.id);
        assert_eq!(replacement.application_id, ApplicationId(2));
        assert_eq!(
            store
                .allocation_for_application(ApplicationId(1))
                .await
                .unwrap(),
            None
        );
        assert!(matches!(
            store.replace(SEAT, ApplicationId(2)).await,
            Err(HallError::ApplicationAlreadyAllocated { .. })
        ));
        assert!(matches!(
            store
                .replace(SeatAddress::new(1, 1, 1), ApplicationId(3))
                .await,
            Err(HallError::NotFound(_))
        ));
    }
}
