use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use hall_seat_allocation_core::{
    Allocation, AllocationId, Application, ApplicationId, Notice, NoticeId, SeatAddress,
    VivaSchedule,
};

use crate::error::DatabaseError;
use crate::schema::{allocations, applications, notices};

#[derive(Queryable, Selectable)]
#[diesel(table_name = applications, check_for_backend(diesel::pg::Pg))]
pub struct ApplicationRow {
    pub id: i64,
    pub full_name: String,
    pub student_id: String,
    pub department: String,
    pub academic_session: String,
    pub contact: String,
    pub payment_reference: String,
    pub photo: Option<String>,
    pub status: String,
    pub viva_date: Option<NaiveDate>,
    pub viva_serial: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplicationRow<'a> {
    pub full_name: &'a str,
    pub student_id: &'a str,
    pub department: &'a str,
    pub academic_session: &'a str,
    pub contact: &'a str,
    pub payment_reference: &'a str,
    pub photo: Option<&'a str>,
    pub status: &'a str,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = DatabaseError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|err| DatabaseError::Corrupt(format!("application {}: {err}", row.id)))?;
        let viva = match (row.viva_date, row.viva_serial) {
            (Some(date), Some(serial)) => Some(VivaSchedule {
                date,
                serial: u32::try_from(serial).map_err(|_| {
                    DatabaseError::Corrupt(format!(
                        "application {}: viva serial {serial} out of range",
                        row.id
                    ))
                })?,
            }),
            _ => None,
        };
        Ok(Self {
            id: ApplicationId(row.id),
            full_name: row.full_name,
            student_id: row.student_id,
            department: row.department,
            session: row.academic_session,
            contact: row.contact,
            payment_reference: row.payment_reference,
            photo: row.photo,
            status,
            viva,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = allocations, check_for_backend(diesel::pg::Pg))]
pub struct AllocationRow {
    pub id: i64,
    pub floor: i16,
    pub room: i32,
    pub seat: i16,
    pub application_id: i64,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = allocations)]
pub struct NewAllocationRow {
    pub floor: i16,
    pub room: i32,
    pub seat: i16,
    pub application_id: i64,
}

impl NewAllocationRow {
    pub fn new(address: SeatAddress, application_id: ApplicationId) -> Self {
        let (floor, room, seat) = columns(address);
        Self {
            floor,
            room,
            seat,
            application_id: application_id.0,
        }
    }
}

/// Column values of a seat address.
pub fn columns(address: SeatAddress) -> (i16, i32, i16) {
    (
        i16::from(address.floor),
        i32::from(address.room),
        i16::from(address.seat),
    )
}

impl TryFrom<AllocationRow> for Allocation {
    type Error = DatabaseError;

    fn try_from(row: AllocationRow) -> Result<Self, Self::Error> {
        let corrupt = || {
            DatabaseError::Corrupt(format!(
                "allocation {}: seat address ({}, {}, {}) out of range",
                row.id, row.floor, row.room, row.seat
            ))
        };
        Ok(Self {
            id: AllocationId(row.id),
            address: SeatAddress::new(
                u8::try_from(row.floor).map_err(|_| corrupt())?,
                u16::try_from(row.room).map_err(|_| corrupt())?,
                u8::try_from(row.seat).map_err(|_| corrupt())?,
            ),
            application_id: ApplicationId(row.application_id),
            assigned_at: row.assigned_at,
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = notices, check_for_backend(diesel::pg::Pg))]
pub struct NoticeRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = notices)]
pub struct NewNoticeRow<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

impl From<NoticeRow> for Notice {
    fn from(row: NoticeRow) -> Self {
        Self {
            id: NoticeId(row.id),
            title: row.title,
            body: row.body,
            published_at: row.published_at,
        }
    }
}
