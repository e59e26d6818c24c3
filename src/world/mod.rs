//! World data model, persistence, and the authoritative session core.
//! The modules here own every mutable piece of game state: durable records
//! behind the sled store, live sessions, district membership, movement
//! resolution, and the interaction arbiter that serializes economy and
//! combat mutations.

pub mod arbiter;
pub mod districts;
pub mod errors;
pub mod events;
pub mod fanout;
pub mod geometry;
pub mod movement;
pub mod persist;
pub mod registry;
pub mod storage;
pub mod types;

pub use districts::DistrictManager;
pub use errors::{AuthError, EconomyError, StoreError};
pub use events::{ClientEvent, ServerEvent};
pub use fanout::Fanout;
pub use geometry::{district_geometry, DistrictGeometry, Rect, Vec2};
pub use movement::MoveOutcome;
pub use persist::{PersistCommand, PersistHandle};
pub use registry::SessionRegistry;
pub use storage::{WorldStore, WorldStoreBuilder};
pub use types::*;
