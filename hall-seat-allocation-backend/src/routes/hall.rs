use axum::extract::State;
use serde::Serialize;

use crate::extract::Json;
use crate::AppState;

#[derive(Serialize)]
pub struct FloorLayout {
    floor: u8,
    first_room: u16,
    last_room: u16,
}

#[derive(Serialize)]
pub struct LayoutView {
    seats_per_room: u8,
    floors: Vec<FloorLayout>,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn layout(State(state): State<AppState>) -> Json<LayoutView> {
    let layout = state.allocations.layout();
    let floors = layout
        .floors()
        .filter_map(|floor| {
            layout.rooms_on_floor(floor).map(|rooms| FloorLayout {
                floor,
                first_room: *rooms.start(),
                last_room: *rooms.end(),
            })
        })
        .collect();
    Json(LayoutView {
        seats_per_room: layout.seats_per_room(),
        floors,
    })
}
