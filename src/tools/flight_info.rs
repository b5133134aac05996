//! get_flight_info 工具：按航司、航班号、日期与方向查询航班时刻
//!
//! 纯查询；查不到返回空数组，只有参数格式错误才失败。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::booking::{FlightQuery, FlightSchedule};
use crate::core::ToolError;
use crate::tools::schema::{ParamSpec, ParamType, ToolDescriptor};
use crate::tools::Tool;

pub const GET_FLIGHT_INFO: &str = "get_flight_info";

pub struct FlightInfoTool {
    descriptor: ToolDescriptor,
    schedule: Arc<dyn FlightSchedule>,
}

impl FlightInfoTool {
    pub fn new(schedule: Arc<dyn FlightSchedule>) -> Self {
        let descriptor = ToolDescriptor::new(
            GET_FLIGHT_INFO,
            "Gets full and accurate flight info whenever flight information is required. \
             Returns the list of matching scheduled flights (empty if none).",
        )
        .param(ParamSpec::required(
            "airline",
            ParamType::String,
            "Airline code (e.g. AA for American Airlines, DL for Delta)",
        ))
        .param(ParamSpec::required(
            "flight_number",
            ParamType::String,
            "Flight number (e.g. 1643, 6122)",
        ))
        .param(ParamSpec::required(
            "flight_date",
            ParamType::String,
            "Flight date in the format YYYY-MM-DD (e.g. 2023-08-10)",
        ))
        .param(ParamSpec::required(
            "direction",
            ParamType::String,
            "Either 'departing' or 'arriving'",
        ));
        Self {
            descriptor,
            schedule,
        }
    }
}

#[async_trait]
impl Tool for FlightInfoTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<Value, ToolError> {
        let arg = |k: &str| args.get(k).and_then(|v| v.as_str()).unwrap_or_default();
        let query = FlightQuery::parse(
            arg("airline"),
            arg("flight_number"),
            arg("flight_date"),
            arg("direction"),
        )
        .map_err(|e| ToolError::domain(e.to_string()))?;

        let flights = self.schedule.scheduled_flights(&query);
        tracing::debug!(
            airline = %query.airline,
            flight_number = %query.flight_number,
            date = %query.date,
            direction = %query.direction,
            matches = flights.len(),
            "flight lookup"
        );
        serde_json::to_value(flights).map_err(|e| ToolError::domain(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::StaticSchedule;
    use serde_json::json;

    fn tool() -> FlightInfoTool {
        FlightInfoTool::new(Arc::new(StaticSchedule::sample()))
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let out = tool()
            .execute(args(json!({
                "airline": "DL", "flight_number": "1118",
                "flight_date": "2023-08-27", "direction": "departing"
            })))
            .await
            .unwrap();
        let flights = out.as_array().unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0]["departureAirportFsCode"], json!("TPA"));
        assert_eq!(flights[0]["departureTime"], json!("2023-08-27T15:25:00"));
    }

    #[tokio::test]
    async fn test_not_found_is_empty_not_error() {
        let out = tool()
            .execute(args(json!({
                "airline": "UA", "flight_number": "1",
                "flight_date": "2023-08-27", "direction": "departing"
            })))
            .await
            .unwrap();
        assert_eq!(out, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_date_is_domain_error() {
        let err = tool()
            .execute(args(json!({
                "airline": "DL", "flight_number": "1118",
                "flight_date": "Aug 27th", "direction": "departing"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Domain(ref m) if m.contains("Aug 27th")));
    }

    #[tokio::test]
    async fn test_identical_calls_give_identical_results() {
        let t = tool();
        let a = args(json!({
            "airline": "DL", "flight_number": "1636",
            "flight_date": "2023-08-26", "direction": "arriving"
        }));
        let first = t.execute(a.clone()).await.unwrap();
        let second = t.execute(a).await.unwrap();
        assert_eq!(first, second);
    }
}
