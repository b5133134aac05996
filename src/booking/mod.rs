//! 领域层：航班时刻查询、预订记录校验与持久化

pub mod flights;
pub mod record;
pub mod store;

pub use flights::{
    Codeshare, Direction, FlightQuery, FlightQueryError, FlightRecord, FlightSchedule, StaticSchedule,
};
pub use record::{
    parse_segments, AdditionalTraveler, FlightSegment, ReservationError, ReservationRecord, ServiceType,
    MANDATORY_SEGMENT_FIELDS,
};
pub use store::{InMemoryStore, JsonFileStore, ReservationId, ReservationStore, StoreError};
