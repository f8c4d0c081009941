use alloc::collections::BTreeMap;
use core::fmt::{self, Display};
use core::ops::RangeInclusive;

use hall_seat_allocation_config::LayoutConfig;
use serde::{Deserialize, Serialize};

use crate::error::HallError;

/// A physical bed slot. Ordering is by floor, then room, then seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatAddress {
    pub floor: u8,
    pub room: u16,
    pub seat: u8,
}

impl SeatAddress {
    #[must_use]
    pub const fn new(floor: u8, room: u16, seat: u8) -> Self {
        Self { floor, room, seat }
    }

    pub(crate) const fn first_on_floor(floor: u8) -> Self {
        Self::new(floor, u16::MIN, u8::MIN)
    }

    pub(crate) const fn last_on_floor(floor: u8) -> Self {
        Self::new(floor, u16::MAX, u8::MAX)
    }
}

impl Display for SeatAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "floor {}, room {}, seat {}",
            self.floor, self.room, self.seat
        )
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("the hall needs at least one floor")]
    NoFloors,
    #[error("rooms need at least one seat")]
    NoSeats,
    #[error("room range {first}..={last} is empty")]
    EmptyRoomRange { first: u16, last: u16 },
    #[error("room override for floor {floor} but the hall only has floors 1..={floors}")]
    OverrideOutOfRange { floor: u8, floors: u8 },
    #[error("floor {floor} has more than one room override")]
    DuplicateOverride { floor: u8 },
}

/// Valid floor/room/seat coordinates of the hall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HallLayout {
    rooms: BTreeMap<u8, RangeInclusive<u16>>,
    seats_per_room: u8,
}

impl Default for HallLayout {
    fn default() -> Self {
        Self {
            rooms: (1..=5).map(|floor| (floor, 1..=20)).collect(),
            seats_per_room: 4,
        }
    }
}

fn room_range(first: u16, last: u16) -> Result<RangeInclusive<u16>, LayoutError> {
    if first > last {
        return Err(LayoutError::EmptyRoomRange { first, last });
    }
    Ok(first..=last)
}

impl HallLayout {
    pub fn from_config(config: &LayoutConfig) -> Result<Self, LayoutError> {
        if config.floors == 0 {
            return Err(LayoutError::NoFloors);
        }
        if config.seats_per_room == 0 {
            return Err(LayoutError::NoSeats);
        }
        let default_rooms = room_range(config.rooms.first, config.rooms.last)?;
        let mut rooms: BTreeMap<u8, RangeInclusive<u16>> = (1..=config.floors)
            .map(|floor| (floor, default_rooms.clone()))
            .collect();

        let mut overridden = Vec::with_capacity(config.floor_rooms.len());
        for floor_rooms in &config.floor_rooms {
            if !(1..=config.floors).contains(&floor_rooms.floor) {
                return Err(LayoutError::OverrideOutOfRange {
                    floor: floor_rooms.floor,
                    floors: config.floors,
                });
            }
            if overridden.contains(&floor_rooms.floor) {
                return Err(LayoutError::DuplicateOverride {
                    floor: floor_rooms.floor,
                });
            }
            overridden.push(floor_rooms.floor);
            rooms.insert(
                floor_rooms.floor,
                room_range(floor_rooms.first, floor_rooms.last)?,
            );
        }

        Ok(Self {
            rooms,
            seats_per_room: config.seats_per_room,
        })
    }

    pub fn floors(&self) -> impl Iterator<Item = u8> + '_ {
        self.rooms.keys().copied()
    }

    #[must_use]
    pub fn rooms_on_floor(&self, floor: u8) -> Option<RangeInclusive<u16>> {
        self.rooms.get(&floor).cloned()
    }

    #[must_use]
    pub const fn seats_per_room(&self) -> u8 {
        self.seats_per_room
    }

    fn problem(&self, floor: i64, room: i64, seat: i64) -> Option<String> {
        let Some(rooms) = u8::try_from(floor)
            .ok()
            .and_then(|floor| self.rooms.get(&floor))
        else {
            return Some(format!("floor must be between 1 and {}", self.rooms.len()));
        };
        if !(i64::from(*rooms.start())..=i64::from(*rooms.end())).contains(&room) {
            return Some(format!(
                "room must be between {} and {} on floor {floor}",
                rooms.start(),
                rooms.end()
            ));
        }
        if !(1..=i64::from(self.seats_per_room)).contains(&seat) {
            return Some(format!("seat must be between 1 and {}", self.seats_per_room));
        }
        None
    }

    /// Like [`Self::is_valid`] but explains what is wrong with the address.
    pub fn validate(&self, address: SeatAddress) -> Result<(), HallError> {
        self.address(
            address.floor.into(),
            address.room.into(),
            address.seat.into(),
        )
        .map(|_| ())
    }

    /// Checks raw client coordinates, which may not even fit a [`SeatAddress`].
    pub fn address(&self, floor: i64, room: i64, seat: i64) -> Result<SeatAddress, HallError> {
        let invalid = |reason| HallError::InvalidAddress {
            floor,
            room,
            seat,
            reason,
        };
        if let Some(reason) = self.problem(floor, room, seat) {
            return Err(invalid(reason));
        }
        match (u8::try_from(floor), u16::try_from(room), u8::try_from(seat)) {
            (Ok(floor), Ok(room), Ok(seat)) => Ok(SeatAddress::new(floor, room, seat)),
            _ => Err(invalid("coordinates out of range".to_owned())),
        }
    }

    #[must_use]
    pub fn is_valid(&self, address: SeatAddress) -> bool {
        self.validate(address).is_ok()
    }

    /// Checks a raw client floor number against the layout.
    pub fn floor(&self, floor: i64) -> Result<u8, HallError> {
        u8::try_from(floor)
            .ok()
            .filter(|floor| self.rooms.contains_key(floor))
            .ok_or(HallError::InvalidFloor { floor })
    }

    /// Every seat on the floor, sorted by room and seat, regardless of occupancy.
    pub fn all_seats_on_floor(&self, floor: u8) -> Result<Vec<SeatAddress>, HallError> {
        let rooms = self.rooms_on_floor(floor).ok_or(HallError::InvalidFloor {
            floor: floor.into(),
        })?;
        let seats_per_room = self.seats_per_room;
        Ok(rooms
            .flat_map(|room| {
                (1..=seats_per_room).map(move |seat| SeatAddress::new(floor, room, seat))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use hall_seat_allocation_config::{FloorRooms, RoomRange};

    use super::*;

    #[test]
    fn default_layout_has_five_floors_of_four_seat_rooms() {
        let layout = HallLayout::default();
        assert_eq!(layout.floors().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(layout.seats_per_room(), 4);
        assert!(layout.is_valid(SeatAddress::new(2, 10, 1)));
        assert!(layout.is_valid(SeatAddress::new(5, 20, 4)));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let layout = HallLayout::default();
        assert!(!layout.is_valid(SeatAddress::new(0, 1, 1)));
        assert!(!layout.is_valid(SeatAddress::new(6, 1, 1)));
        assert!(!layout.is_valid(SeatAddress::new(1, 0, 1)));
        assert!(!layout.is_valid(SeatAddress::new(1, 21, 1)));
        assert!(!layout.is_valid(SeatAddress::new(1, 1, 0)));

        match layout.validate(SeatAddress::new(1, 1, 5)) {
            Err(HallError::InvalidAddress {
                floor: 1,
                room: 1,
                seat: 5,
                reason,
            }) => assert_eq!(reason, "seat must be between 1 and 4"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn raw_coordinates_outside_the_integer_types_are_invalid_addresses() {
        let layout = HallLayout::default();
        assert_eq!(layout.address(2, 10, 1).unwrap(), SeatAddress::new(2, 10, 1));

        for (floor, room, seat, expected) in [
            (1, 1, 300, "seat must be between 1 and 4"),
            (1, 1, -1, "seat must be between 1 and 4"),
            (1, 70_000, 1, "room must be between 1 and 20 on floor 1"),
            (-1, 1, 1, "floor must be between 1 and 5"),
            (300, 1, 1, "floor must be between 1 and 5"),
        ] {
            match layout.address(floor, room, seat) {
                Err(HallError::InvalidAddress { reason, .. }) => assert_eq!(reason, expected),
                other => panic!("unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn raw_floor_numbers_are_checked() {
        let layout = HallLayout::default();
        assert_eq!(layout.floor(5).unwrap(), 5);
        assert!(matches!(
            layout.floor(300),
            Err(HallError::InvalidFloor { floor: 300 })
        ));
        assert!(matches!(
            layout.floor(-1),
            Err(HallError::InvalidFloor { floor: -1 })
        ));
    }

    #[test]
    fn all_seats_on_floor_is_sorted_and_complete() {
        let layout = HallLayout::default();
        let seats = layout.all_seats_on_floor(3).unwrap();
        assert_eq!(seats.len(), 20 * 4);
        assert_eq!(seats[0], SeatAddress::new(3, 1, 1));
        assert_eq!(seats[5], SeatAddress::new(3, 2, 2));
        assert_eq!(seats.last(), Some(&SeatAddress::new(3, 20, 4)));
        assert!(seats.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn all_seats_on_unknown_floor_fails() {
        let layout = HallLayout::default();
        assert!(matches!(
            layout.all_seats_on_floor(9),
            Err(HallError::InvalidFloor { floor: 9 })
        ));
    }

    #[test]
    fn floor_overrides_change_the_valid_rooms() {
        let layout = HallLayout::from_config(&LayoutConfig {
            floors: 2,
            seats_per_room: 2,
            rooms: RoomRange { first: 1, last: 3 },
            floor_rooms: vec![FloorRooms {
                floor: 2,
                first: 201,
                last: 202,
            }],
        })
        .unwrap();

        assert!(layout.is_valid(SeatAddress::new(1, 3, 2)));
        assert!(!layout.is_valid(SeatAddress::new(1, 3, 3)));
        assert!(!layout.is_valid(SeatAddress::new(2, 3, 1)));
        assert_eq!(
            layout.all_seats_on_floor(2).unwrap(),
            vec![
                SeatAddress::new(2, 201, 1),
                SeatAddress::new(2, 201, 2),
                SeatAddress::new(2, 202, 1),
                SeatAddress::new(2, 202, 2),
            ]
        );
    }

    #[test]
    fn inconsistent_configuration_is_rejected() {
        let base = LayoutConfig::default();
        assert_eq!(
            HallLayout::from_config(&LayoutConfig {
                floors: 0,
                ..base.clone()
            }),
            Err(LayoutError::NoFloors)
        );
        assert_eq!(
            HallLayout::from_config(&LayoutConfig {
                rooms: RoomRange { first: 5, last: 4 },
                ..base.clone()
            }),
            Err(LayoutError::EmptyRoomRange { first: 5, last: 4 })
        );
        assert_eq!(
            HallLayout::from_config(&LayoutConfig {
                floor_rooms: vec![FloorRooms {
                    floor: 6,
                    first: 1,
                    last: 2
                }],
                ..base
            }),
            Err(LayoutError::OverrideOutOfRange {
                floor: 6,
                floors: 5
            })
        );
    }
}
