extern crate alloc;

pub mod address;
pub mod application;
pub mod error;
pub mod floor_map;
pub mod notice;
pub mod registry;
pub mod service;
pub mod store;

use std::sync::Arc;

pub use address::{HallLayout, LayoutError, SeatAddress};
pub use application::{
    Application, ApplicationId, ApplicationStatus, NewApplication, StatusChange, VivaSchedule,
};
pub use error::{HallError, Missing, StorageError};
pub use floor_map::FloorMap;
pub use notice::{NewNotice, Notice, NoticeBoard, NoticeId, NoticeService};
pub use registry::ApplicationRegistry;
pub use service::{AllocationService, ApprovedFilter};
pub use store::{Allocation, AllocationId, AllocationStore};

/// Services backed by process-local storage.
#[must_use]
pub fn in_memory(layout: HallLayout) -> (AllocationService, NoticeService) {
    (
        AllocationService::new(
            Arc::new(layout),
            Arc::new(registry::MemoryRegistry::new()),
            Arc::new(store::MemoryAllocationStore::new()),
        ),
        NoticeService::new(Arc::new(notice::MemoryNoticeBoard::new())),
    )
}
