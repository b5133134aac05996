//! create_reservation 工具：校验航段并持久化预订记录
//!
//! 任一航段缺少必填字段即失败（错误指明航段下标与字段名），此时不写入任何记录；
//! 成功时以新生成的键保存，并返回包含旅客姓名的确认文本。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::booking::{parse_segments, AdditionalTraveler, ReservationRecord, ReservationStore};
use crate::core::ToolError;
use crate::tools::schema::{ParamSpec, ParamType, ToolDescriptor};
use crate::tools::Tool;

pub const CREATE_RESERVATION: &str = "create_reservation";

pub struct CreateReservationTool {
    descriptor: ToolDescriptor,
    store: Arc<dyn ReservationStore>,
}

impl CreateReservationTool {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        let descriptor = ToolDescriptor::new(
            CREATE_RESERVATION,
            "Creates a reservation in the reservation system.",
        )
        .param(ParamSpec::required("pax_last_name", ParamType::String, "Last name of the passenger"))
        .param(ParamSpec::required("pax_first_name", ParamType::String, "First name of the passenger"))
        .param(ParamSpec::required(
            "booked_last_name",
            ParamType::String,
            "Last name of the person booking the reservation",
        ))
        .param(ParamSpec::required(
            "booked_first_name",
            ParamType::String,
            "First name of the person booking the reservation",
        ))
        .param(ParamSpec::required(
            "booked_email",
            ParamType::String,
            "Email of the person booking the reservation",
        ))
        .param(ParamSpec::required("agent", ParamType::String, "Name of the agent booking the reservation"))
        .param(ParamSpec::required(
            "flights",
            ParamType::Array,
            "List of flights. Each flight is an object with the keys: service_type (\"ARR\" for arrivals, \
             \"DEP\" for departures, \"CONN\" for connections), service_date, airline, flight_number, airport, \
             time, airline_reference, departure_airport. The first five are mandatory.",
        ))
        .param(ParamSpec::optional("pax_cell", ParamType::String, "Cell phone of the passenger"))
        .param(ParamSpec::optional("travelers", ParamType::Integer, "Number of travelers"))
        .param(ParamSpec::optional(
            "additional_travelers",
            ParamType::Array,
            "List of additional travelers, each an object with the key \"name\"",
        ))
        .param(ParamSpec::optional("luggage", ParamType::Integer, "Number of pieces of luggage"))
        .param(ParamSpec::optional("booked_number", ParamType::String, "Booking number of the reservation"));
        Self { descriptor, store }
    }

    /// 由已校验的参数构建记录；不做任何 I/O
    pub fn build_record(args: &Map<String, Value>) -> Result<ReservationRecord, ToolError> {
        let text = |k: &str| args.get(k).and_then(|v| v.as_str()).map(|s| s.trim().to_string());
        let count = |k: &str| -> Result<Option<u32>, ToolError> {
            let Some(v) = args.get(k) else {
                return Ok(None);
            };
            match (v.as_u64(), v.as_i64()) {
                (Some(n), _) => u32::try_from(n).map(Some).map_err(|_| {
                    ToolError::domain(format!("'{k}' is out of range (max {}), got {n}", u32::MAX))
                }),
                (None, Some(n)) => {
                    Err(ToolError::domain(format!("'{k}' must not be negative, got {n}")))
                }
                (None, None) => Ok(None),
            }
        };

        let flights = args
            .get("flights")
            .and_then(|v| v.as_array())
            .map(|a| a.as_slice())
            .unwrap_or_default();
        let flights = parse_segments(flights).map_err(|e| ToolError::domain(e.to_string()))?;

        let additional_travelers = match args.get("additional_travelers").and_then(|v| v.as_array()) {
            None => None,
            Some(list) => Some(
                list.iter()
                    .enumerate()
                    .map(|(i, t)| {
                        t.get("name")
                            .and_then(|n| n.as_str())
                            .filter(|n| !n.trim().is_empty())
                            .map(|n| AdditionalTraveler { name: n.trim().to_string() })
                            .ok_or_else(|| {
                                ToolError::domain(format!(
                                    "additional traveler {i} is missing mandatory field 'name'"
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        let record = ReservationRecord {
            pax_first_name: text("pax_first_name").unwrap_or_default(),
            pax_last_name: text("pax_last_name").unwrap_or_default(),
            booked_first_name: text("booked_first_name").unwrap_or_default(),
            booked_last_name: text("booked_last_name").unwrap_or_default(),
            booked_email: text("booked_email").unwrap_or_default(),
            agent: text("agent").unwrap_or_default(),
            flights,
            pax_cell: text("pax_cell"),
            travelers: count("travelers")?,
            additional_travelers,
            luggage: count("luggage")?,
            booked_number: text("booked_number"),
        };
        record.validate().map_err(|e| ToolError::domain(e.to_string()))?;
        Ok(record)
    }
}

#[async_trait]
impl Tool for CreateReservationTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let record = Self::build_record(&args)?;
        let id = self.store.save(&record).await.map_err(|e| {
            tracing::error!(error = %e, "failed to persist reservation");
            ToolError::domain(format!("reservation could not be saved: {e}"))
        })?;
        tracing::info!(
            reservation_id = %id,
            passenger = %record.passenger_name(),
            segments = record.flights.len(),
            "reservation created"
        );
        Ok(json!(format!(
            "Reservation created for passenger {}. Reservation id: {}.",
            record.passenger_name(),
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{InMemoryStore, ServiceType};

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn valid_args() -> Value {
        json!({
            "pax_first_name": "Emma",
            "pax_last_name": "Guttman",
            "booked_first_name": "Sample Name",
            "booked_last_name": "Sample Last Name",
            "booked_email": "booker@domains.com",
            "agent": "Sample Name Sample Last Name",
            "flights": [
                {"service_type": "ARR", "service_date": "2023-08-26", "airline": "DL", "flight_number": "1636", "airport": "TPA", "airline_reference": "HOFRNI"},
                {"service_type": "DEP", "service_date": "2023-08-27", "airline": "DL", "flight_number": "1118", "airport": "TPA", "time": "15:25"}
            ],
            "travelers": 1
        })
    }

    #[test]
    fn test_descriptor_param_types() {
        let tool = CreateReservationTool::new(Arc::new(InMemoryStore::new()));
        let kind = |name: &str| {
            let p = tool.descriptor().params.iter().find(|p| p.name == name).unwrap();
            (p.param_type, p.required)
        };
        assert_eq!(kind("pax_last_name"), (ParamType::String, true));
        assert_eq!(kind("flights"), (ParamType::Array, true));
        assert_eq!(kind("pax_cell"), (ParamType::String, false));
        assert_eq!(kind("travelers"), (ParamType::Integer, false));
        assert_eq!(kind("luggage"), (ParamType::Integer, false));
        assert_eq!(tool.descriptor().params.len(), 12);
    }

    #[tokio::test]
    async fn test_create_persists_and_confirms() {
        let store = Arc::new(InMemoryStore::new());
        let tool = CreateReservationTool::new(store.clone());
        let out = tool.execute(args(valid_args())).await.unwrap();
        assert!(out.as_str().unwrap().starts_with("Reservation created for passenger Emma Guttman."));

        let ids = store.ids().await;
        assert_eq!(ids.len(), 1);
        let saved = store.load(ids[0]).await.unwrap();
        assert_eq!(saved.flights.len(), 2);
        assert_eq!(saved.flights[1].service_type, ServiceType::Departure);
        assert_eq!(saved.travelers, Some(1));
    }

    #[tokio::test]
    async fn test_missing_airport_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let tool = CreateReservationTool::new(store.clone());
        let mut a = valid_args();
        a["flights"][0].as_object_mut().unwrap().remove("airport");

        let err = tool.execute(args(a)).await.unwrap_err();
        match err {
            ToolError::Domain(msg) => {
                assert!(msg.contains("segment 0"));
                assert!(msg.contains("'airport'"));
            }
            other => panic!("expected domain error, got {other:?}"),
        }
        assert_eq!(store.len().await, 0);
    }

    #[test]
    fn test_negative_luggage_rejected() {
        let mut a = valid_args();
        a["luggage"] = json!(-1);
        let err = CreateReservationTool::build_record(&args(a)).unwrap_err();
        assert!(err.to_string().contains("luggage"));
    }

    #[test]
    fn test_oversized_counts_are_out_of_range() {
        for big in [json!(5_000_000_000u64), json!(u64::MAX)] {
            let mut a = valid_args();
            a["travelers"] = big;
            let msg = CreateReservationTool::build_record(&args(a)).unwrap_err().to_string();
            assert!(msg.contains("'travelers' is out of range"), "{msg}");
            assert!(!msg.contains("negative"));
        }

        let mut a = valid_args();
        a["luggage"] = json!(u32::MAX);
        let record = CreateReservationTool::build_record(&args(a)).unwrap();
        assert_eq!(record.luggage, Some(u32::MAX));
    }

    #[test]
    fn test_additional_traveler_needs_name() {
        let mut a = valid_args();
        a["additional_travelers"] = json!([{"name": "Avi"}, {"email": "x@y.z"}]);
        let err = CreateReservationTool::build_record(&args(a)).unwrap_err();
        assert!(err.to_string().contains("additional traveler 1"));
    }
}
