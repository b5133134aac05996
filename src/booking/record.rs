//! 预订记录：ReservationRecord 与 FlightSegment
//!
//! 航段必须具备 service_type / service_date / airline / flight_number / airport 五个字段，
//! 从 LLM 给出的 JSON 构建时逐段检查，错误信息精确到航段下标与字段名。

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 每个航段的必填字段（按检查顺序）
pub const MANDATORY_SEGMENT_FIELDS: [&str; 5] = [
    "service_type",
    "service_date",
    "airline",
    "flight_number",
    "airport",
];

/// 预订校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    #[error("flights must contain at least one segment")]
    NoFlights,

    #[error("flight segment {index} is not an object")]
    SegmentNotObject { index: usize },

    #[error("flight segment {index} is missing mandatory field '{field}'")]
    MissingSegmentField { index: usize, field: &'static str },

    #[error("flight segment {index} has unknown service_type '{value}' (expected ARR, DEP or CONN)")]
    InvalidServiceType { index: usize, value: String },

    #[error("flight segment {index} is invalid: {reason}")]
    InvalidSegment { index: usize, reason: String },

    #[error("missing mandatory field '{0}'")]
    MissingField(&'static str),
}

/// 服务类型：接机 / 送机 / 中转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[serde(rename = "ARR", alias = "arrival", alias = "ARRIVAL")]
    Arrival,
    #[serde(rename = "DEP", alias = "departure", alias = "DEPARTURE")]
    Departure,
    #[serde(rename = "CONN", alias = "connection", alias = "CONNECTION")]
    Connection,
}

impl ServiceType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ARR" | "ARRIVAL" => Some(ServiceType::Arrival),
            "DEP" | "DEPARTURE" => Some(ServiceType::Departure),
            "CONN" | "CONNECTION" => Some(ServiceType::Connection),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceType::Arrival => "ARR",
            ServiceType::Departure => "DEP",
            ServiceType::Connection => "CONN",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 单个航段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSegment {
    pub service_type: ServiceType,
    pub service_date: String,
    pub airline: String,
    pub flight_number: String,
    pub airport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_airport: Option<String>,
}

impl FlightSegment {
    /// 从 JSON 对象构建航段；先检查必填字段（缺失、null 或空白均视为缺失），再解析类型
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ReservationError> {
        let obj = value
            .as_object()
            .ok_or(ReservationError::SegmentNotObject { index })?;

        for field in MANDATORY_SEGMENT_FIELDS {
            if is_blank(obj.get(field)) {
                return Err(ReservationError::MissingSegmentField { index, field });
            }
        }

        let raw_type = text(obj, "service_type").unwrap_or_default();
        let service_type = ServiceType::parse(&raw_type).ok_or_else(|| {
            ReservationError::InvalidServiceType {
                index,
                value: raw_type.clone(),
            }
        })?;

        Ok(Self {
            service_type,
            service_date: text(obj, "service_date").unwrap_or_default(),
            airline: text(obj, "airline").unwrap_or_default(),
            flight_number: text(obj, "flight_number").unwrap_or_default(),
            airport: text(obj, "airport").unwrap_or_default(),
            time: text(obj, "time"),
            airline_reference: text(obj, "airline_reference"),
            departure_airport: text(obj, "departure_airport"),
        })
    }

    fn check(&self, index: usize) -> Result<(), ReservationError> {
        let fields = [
            ("service_date", &self.service_date),
            ("airline", &self.airline),
            ("flight_number", &self.flight_number),
            ("airport", &self.airport),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ReservationError::MissingSegmentField { index, field });
            }
        }
        Ok(())
    }
}

/// 附加同行旅客
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalTraveler {
    pub name: String,
}

/// 预订记录：创建后不可修改，更正需新建记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub pax_first_name: String,
    pub pax_last_name: String,
    pub booked_first_name: String,
    pub booked_last_name: String,
    pub booked_email: String,
    pub agent: String,
    pub flights: Vec<FlightSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pax_cell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travelers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_travelers: Option<Vec<AdditionalTraveler>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub luggage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_number: Option<String>,
}

impl ReservationRecord {
    pub fn passenger_name(&self) -> String {
        format!("{} {}", self.pax_first_name, self.pax_last_name)
    }

    /// 校验已构建的记录：旅客姓名非空、至少一个航段、每个航段必填字段非空
    pub fn validate(&self) -> Result<(), ReservationError> {
        if self.pax_first_name.trim().is_empty() {
            return Err(ReservationError::MissingField("pax_first_name"));
        }
        if self.pax_last_name.trim().is_empty() {
            return Err(ReservationError::MissingField("pax_last_name"));
        }
        if self.flights.is_empty() {
            return Err(ReservationError::NoFlights);
        }
        for (i, seg) in self.flights.iter().enumerate() {
            seg.check(i)?;
        }
        Ok(())
    }
}

/// 从 JSON 航段列表构建；任一航段不合格即整体拒绝
pub fn parse_segments(flights: &[Value]) -> Result<Vec<FlightSegment>, ReservationError> {
    if flights.is_empty() {
        return Err(ReservationError::NoFlights);
    }
    flights
        .iter()
        .enumerate()
        .map(|(i, v)| FlightSegment::from_value(i, v))
        .collect()
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// 读取文本字段；数字也接受（LLM 常把航班号写成数字）
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
