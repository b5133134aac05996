pub mod create_reservation;
pub mod executor;
pub mod flight_info;
pub mod observation;
pub mod registry;
pub mod schema;

pub use create_reservation::{CreateReservationTool, CREATE_RESERVATION};
pub use executor::ToolExecutor;
pub use flight_info::{FlightInfoTool, GET_FLIGHT_INFO};
pub use observation::{Failure, FailureKind, Observation};
pub use registry::{render_vocabulary, to_schema_json, Tool, ToolRegistry};
pub use schema::{tool_call_schema_json, validate_args, ParamSpec, ParamType, ToolDescriptor};
