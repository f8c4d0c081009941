use std::collections::HashMap;

use serde::Serialize;

use crate::address::SeatAddress;
use crate::application::{Application, ApplicationId};
use crate::store::{Allocation, AllocationId};

/// Display fields of the student occupying a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occupant {
    pub allocation_id: AllocationId,
    pub application_id: ApplicationId,
    pub full_name: String,
    pub student_id: String,
    pub department: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatView {
    pub seat: u8,
    pub occupied: bool,
    /// `None` for occupied seats only if the application record could not be loaded.
    pub occupant: Option<Occupant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomView {
    pub room: u16,
    pub occupied: usize,
    pub available: usize,
    pub seats: Vec<SeatView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FloorMap {
    pub floor: u8,
    pub occupied: usize,
    pub available: usize,
    pub rooms: Vec<RoomView>,
}

impl FloorMap {
    /// Joins the seats of a floor with its allocations and the allocated applications.
    ///
    /// `seats` must be sorted by room and seat, as returned by
    /// [`crate::address::HallLayout::all_seats_on_floor`].
    #[must_use]
    pub fn build(
        floor: u8,
        seats: &[SeatAddress],
        allocations: &[Allocation],
        applications: &HashMap<ApplicationId, Application>,
    ) -> Self {
        let by_seat: HashMap<SeatAddress, &Allocation> = allocations
            .iter()
            .map(|allocation| (allocation.address, allocation))
            .collect();

        let mut rooms: Vec<RoomView> = Vec::new();
        for address in seats {
            let allocation = by_seat.get(address);
            let view = SeatView {
                seat: address.seat,
                occupied: allocation.is_some(),
                occupant: allocation.and_then(|allocation| {
                    applications
                        .get(&allocation.application_id)
                        .map(|application| Occupant {
                            allocation_id: allocation.id,
                            application_id: application.id,
                            full_name: application.full_name.clone(),
                            student_id: application.student_id.clone(),
                            department: application.department.clone(),
                            photo: application.photo.clone(),
                        })
                }),
            };

            if rooms.last().map_or(true, |room| room.room != address.room) {
                rooms.push(RoomView {
                    room: address.room,
                    occupied: 0,
                    available: 0,
                    seats: Vec::new(),
                });
            }
            if let Some(room) = rooms.last_mut() {
                if view.occupied {
                    room.occupied += 1;
                } else {
                    room.available += 1;
                }
                room.seats.push(view);
            }
        }

        Self {
            floor,
            occupied: rooms.iter().map(|room| room.occupied).sum(),
            available: rooms.iter().map(|room| room.available).sum(),
            rooms,
        }
    }

    #[must_use]
    pub fn seat(&self, room: u16, seat: u8) -> Option<&SeatView> {
        self.rooms
            .iter()
            .find(|view| view.room == room)
            .and_then(|view| view.seats.iter().find(|view| view.seat == seat))
    }
}
