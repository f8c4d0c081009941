use std::collections::HashSet;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use hall_seat_allocation_core::{
    Allocation, AllocationStore, ApplicationId, HallError, Missing, SeatAddress,
};

use crate::error::{DatabaseError, TransactionError};
use crate::models::{columns, AllocationRow, NewAllocationRow};
use crate::schema::allocations;
use crate::{connection, Pool};

/// Allocation store on the `allocations` table.
///
/// Mutations take a table lock inside their transaction, so the uniqueness checks and the
/// write are serialized across all servers sharing the database. The unique constraints on
/// the table stay in place as the last line.
pub struct PgAllocationStore {
    pool: Pool,
}

impl PgAllocationStore {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

async fn at(
    connection: &mut AsyncPgConnection,
    address: SeatAddress,
) -> Result<Option<Allocation>, DatabaseError> {
    let (floor, room, seat) = columns(address);
    allocations::table
        .filter(allocations::floor.eq(floor))
        .filter(allocations::room.eq(room))
        .filter(allocations::seat.eq(seat))
        .select(AllocationRow::as_select())
        .first(connection)
        .await
        .optional()?
        .map(Allocation::try_from)
        .transpose()
}

async fn held_by(
    connection: &mut AsyncPgConnection,
    application_id: ApplicationId,
) -> Result<Option<Allocation>, DatabaseError> {
    allocations::table
        .filter(allocations::application_id.eq(application_id.0))
        .select(AllocationRow::as_select())
        .first(connection)
        .await
        .optional()?
        .map(Allocation::try_from)
        .transpose()
}

async fn lock_allocations(connection: &mut AsyncPgConnection) -> Result<(), DatabaseError> {
    diesel::sql_query("LOCK TABLE allocations IN SHARE ROW EXCLUSIVE MODE")
        .execute(connection)
        .await?;
    Ok(())
}

async fn ensure_unallocated(
    connection: &mut AsyncPgConnection,
    application_id: ApplicationId,
) -> Result<(), TransactionError> {
    match held_by(connection, application_id).await? {
        Some(allocation) => Err(TransactionError::Domain(
            HallError::ApplicationAlreadyAllocated {
                id: application_id,
                address: allocation.address,
            },
        )),
        None => Ok(()),
    }
}

async fn allocate(
    connection: &mut AsyncPgConnection,
    address: SeatAddress,
    application_id: ApplicationId,
) -> Result<Allocation, TransactionError> {
    let row = diesel::insert_into(allocations::table)
        .values(NewAllocationRow::new(address, application_id))
        .returning(AllocationRow::as_returning())
        .get_result(connection)
        .await?;
    Ok(Allocation::try_from(row)?)
}

#[async_trait]
impl AllocationStore for PgAllocationStore {
    async fn allocation_at(&self, address: SeatAddress) -> Result<Option<Allocation>, HallError> {
        let mut pooled = connection(&self.pool).await?;
        Ok(at(&mut pooled, address).await?)
    }

    async fn allocation_for_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<Allocation>, HallError> {
        let mut pooled = connection(&self.pool).await?;
        Ok(held_by(&mut pooled, application_id).await?)
    }

    async fn allocations_on_floor(&self, floor: u8) -> Result<Vec<Allocation>, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let rows = allocations::table
            .filter(allocations::floor.eq(i16::from(floor)))
            .order((allocations::room, allocations::seat))
            .select(AllocationRow::as_select())
            .load(&mut pooled)
            .await
            .map_err(DatabaseError::from)?;
        Ok(rows
            .into_iter()
            .map(Allocation::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn allocated_applications(&self) -> Result<HashSet<ApplicationId>, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let ids: Vec<i64> = allocations::table
            .select(allocations::application_id)
            .load(&mut pooled)
            .await
            .map_err(DatabaseError::from)?;
        Ok(ids.into_iter().map(ApplicationId).collect())
    }

    async fn insert(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        Ok(connection
            .transaction::<_, TransactionError, _>(|connection| {
                async move {
                    lock_allocations(connection).await?;
                    ensure_unallocated(connection, application_id).await?;
                    if let Some(occupant) = at(connection, address).await? {
                        return Err(TransactionError::Domain(HallError::SeatAlreadyOccupied {
                            address,
                            occupant: occupant.application_id,
                        }));
                    }
                    allocate(connection, address, application_id).await
                }
                .scope_boxed()
            })
            .await?)
    }

    async fn remove(&self, address: SeatAddress) -> Result<Allocation, HallError> {
        let (floor, room, seat) = columns(address);
        let mut pooled = connection(&self.pool).await?;
        let row = diesel::delete(
            allocations::table
                .filter(allocations::floor.eq(floor))
                .filter(allocations::room.eq(room))
                .filter(allocations::seat.eq(seat)),
        )
        .returning(AllocationRow::as_returning())
        .get_result(&mut pooled)
        .await
        .optional()
        .map_err(DatabaseError::from)?;
        match row {
            Some(row) => Ok(Allocation::try_from(row)?),
            None => Err(HallError::NotFound(Missing::Allocation(address))),
        }
    }

    async fn replace(
        &self,
        address: SeatAddress,
        application_id: ApplicationId,
    ) -> Result<Allocation, HallError> {
        let mut pooled = connection(&self.pool).await?;
        let connection: &mut AsyncPgConnection = &mut pooled;
        Ok(connection
            .transaction::<_, TransactionError, _>(|connection| {
                async move {
                    lock_allocations(connection).await?;
                    ensure_unallocated(connection, application_id).await?;
                    let previous = at(connection, address).await?.ok_or(
                        TransactionError::Domain(HallError::NotFound(Missing::Allocation(
                            address,
                        ))),
                    )?;
                    diesel::delete(allocations::table.find(previous.id.0))
                        .execute(connection)
                        .await?;
                    allocate(connection, address, application_id).await
                }
                .scope_boxed()
            })
            .await?)
    }
}
