use core::fmt::{self, Display};

use crate::address::SeatAddress;
use crate::application::{ApplicationId, ApplicationStatus};
use crate::notice::NoticeId;

/// Cause of a storage failure, boxed so every backend can report its own error type.
#[derive(thiserror::Error, Debug)]
#[error("{source}")]
pub struct StorageError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
    unapplied: bool,
}

impl StorageError {
    /// The operation may have reached storage before it failed.
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(error),
            unapplied: false,
        }
    }

    /// Storage was never reached, so nothing was written.
    pub fn unreachable(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(error),
            unapplied: true,
        }
    }

    #[must_use]
    pub const fn is_unapplied(&self) -> bool {
        self.unapplied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Application(ApplicationId),
    Allocation(SeatAddress),
    AllocationForApplication(ApplicationId),
    Notice(NoticeId),
}

impl Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application(id) => write!(f, "application {id} does not exist"),
            Self::Allocation(address) => write!(f, "no allocation at {address}"),
            Self::AllocationForApplication(id) => {
                write!(f, "application {id} has no seat allocated")
            }
            Self::Notice(id) => write!(f, "notice {id} does not exist"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HallError {
    #[error("invalid seat address floor {floor}, room {room}, seat {seat}: {reason}")]
    InvalidAddress {
        floor: i64,
        room: i64,
        seat: i64,
        reason: String,
    },
    #[error("floor {floor} does not exist")]
    InvalidFloor { floor: i64 },
    #[error("{0}")]
    NotFound(Missing),
    #[error("application {id} is {status}, only approved applications can be assigned a seat")]
    ApplicationNotApproved {
        id: ApplicationId,
        status: ApplicationStatus,
    },
    #[error("application {id} already holds the seat at {address}")]
    ApplicationAlreadyAllocated {
        id: ApplicationId,
        address: SeatAddress,
    },
    #[error("seat at {address} is already occupied by application {occupant}")]
    SeatAlreadyOccupied {
        address: SeatAddress,
        occupant: ApplicationId,
    },
    #[error("cannot change status of application {id} from {from} to {to}")]
    InvalidTransition {
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application {id} was changed concurrently: expected {expected} but found {actual}")]
    StaleWrite {
        id: ApplicationId,
        expected: ApplicationStatus,
        actual: ApplicationStatus,
    },
    #[error("{0}")]
    Validation(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
}

impl HallError {
    /// Stable machine-readable kind of the error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "invalid_address",
            Self::InvalidFloor { .. } => "invalid_floor",
            Self::NotFound(_) => "not_found",
            Self::ApplicationNotApproved { .. } => "application_not_approved",
            Self::ApplicationAlreadyAllocated { .. } => "application_already_allocated",
            Self::SeatAlreadyOccupied { .. } => "seat_already_occupied",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::StaleWrite { .. } => "stale_write",
            Self::Validation(_) => "validation_error",
            Self::Storage(_) => "storage_unavailable",
        }
    }

    /// Infrastructure faults, the only errors a read is retried after.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Storage failures that left no trace, the only ones a write may be retried after.
    #[must_use]
    pub const fn is_unapplied_storage(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_unapplied())
    }
}
