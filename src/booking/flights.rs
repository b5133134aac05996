//! 航班时刻查询
//!
//! FlightQuery 解析并规范化查询条件；FlightSchedule 为只读数据源，查询无副作用、结果可重复。
//! StaticSchedule 持有内置样例时刻表，或从 JSON 文件加载（字段沿用时刻表 API 的 camelCase 命名）。

use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlightQueryError {
    #[error("invalid airline code '{0}' (expected 2-3 letters or digits, e.g. DL)")]
    InvalidAirline(String),

    #[error("invalid flight number '{0}' (expected 1-4 digits, e.g. 1636)")]
    InvalidFlightNumber(String),

    #[error("invalid flight date '{0}' (expected YYYY-MM-DD or YYYY/MM/DD)")]
    InvalidDate(String),

    #[error("invalid direction '{0}' (expected 'departing' or 'arriving')")]
    InvalidDirection(String),
}

/// 查询方向：按出发日期或到达日期匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Departing,
    Arriving,
}

impl Direction {
    pub fn parse(s: &str) -> Result<Self, FlightQueryError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "departing" | "departure" | "dep" => Ok(Direction::Departing),
            "arriving" | "arrival" | "arr" => Ok(Direction::Arriving),
            _ => Err(FlightQueryError::InvalidDirection(s.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Departing => f.write_str("departing"),
            Direction::Arriving => f.write_str("arriving"),
        }
    }
}

/// 规范化后的查询条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightQuery {
    pub airline: String,
    pub flight_number: String,
    pub date: NaiveDate,
    pub direction: Direction,
}

impl FlightQuery {
    /// 解析原始参数：航司代码转大写；航班号去掉重复的航司前缀（DL1636 -> 1636）与前导零
    pub fn parse(
        airline: &str,
        flight_number: &str,
        date: &str,
        direction: &str,
    ) -> Result<Self, FlightQueryError> {
        let airline = airline.trim().to_ascii_uppercase();
        if !(2..=3).contains(&airline.len()) || !airline.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FlightQueryError::InvalidAirline(airline));
        }

        let raw_number = flight_number.trim().to_ascii_uppercase();
        let digits = raw_number
            .strip_prefix(airline.as_str())
            .unwrap_or(&raw_number)
            .trim();
        if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FlightQueryError::InvalidFlightNumber(flight_number.to_string()));
        }
        let flight_number = digits.trim_start_matches('0');
        let flight_number = if flight_number.is_empty() { "0" } else { flight_number };

        let date = parse_date(date)?;
        let direction = Direction::parse(direction)?;

        Ok(Self {
            airline,
            flight_number: flight_number.to_string(),
            date,
            direction,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, FlightQueryError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .map_err(|_| FlightQueryError::InvalidDate(s.to_string()))
}

/// 代码共享航班
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Codeshare {
    pub carrier_fs_code: String,
    pub flight_number: String,
}

/// 航班时刻记录（只读，不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub carrier_fs_code: String,
    pub flight_number: String,
    pub departure_airport_fs_code: String,
    pub arrival_airport_fs_code: String,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    #[serde(default)]
    pub stops: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_equipment_iata_code: Option<String>,
    #[serde(default)]
    pub is_codeshare: bool,
    #[serde(default)]
    pub service_classes: Vec<String>,
    #[serde(default)]
    pub codeshares: Vec<Codeshare>,
    #[serde(default)]
    pub reference_code: String,
}

impl FlightRecord {
    /// 是否匹配查询：航司、航班号一致，且按方向比较出发或到达日期
    pub fn matches(&self, query: &FlightQuery) -> bool {
        let date = match query.direction {
            Direction::Departing => self.departure_time.date(),
            Direction::Arriving => self.arrival_time.date(),
        };
        self.carrier_fs_code.eq_ignore_ascii_case(&query.airline)
            && self.flight_number.trim_start_matches('0') == query.flight_number
            && date == query.date
    }
}

/// 只读航班数据源
pub trait FlightSchedule: Send + Sync {
    fn scheduled_flights(&self, query: &FlightQuery) -> Vec<FlightRecord>;
}

/// 静态时刻表：启动时载入，之后只读
#[derive(Debug, Clone, Default)]
pub struct StaticSchedule {
    flights: Vec<FlightRecord>,
}

impl StaticSchedule {
    pub fn new(flights: Vec<FlightRecord>) -> Self {
        Self { flights }
    }

    /// 从 JSON 文件加载（内容为 FlightRecord 数组）
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let flights: Vec<FlightRecord> = serde_json::from_str(&data)?;
        tracing::info!(path = %path.display(), flights = flights.len(), "flight schedule loaded");
        Ok(Self::new(flights))
    }

    /// 内置样例时刻表
    pub fn sample() -> Self {
        // 内置数据为常量，解析失败只可能是编码错误
        let flights: Vec<FlightRecord> =
            serde_json::from_str(SAMPLE_SCHEDULE).unwrap_or_default();
        Self::new(flights)
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

impl FlightSchedule for StaticSchedule {
    fn scheduled_flights(&self, query: &FlightQuery) -> Vec<FlightRecord> {
        self.flights
            .iter()
            .filter(|f| f.matches(query))
            .cloned()
            .collect()
    }
}

const SAMPLE_SCHEDULE: &str = r#"[
  {
    "carrierFsCode": "DL",
    "flightNumber": "1636",
    "departureAirportFsCode": "ATL",
    "arrivalAirportFsCode": "TPA",
    "departureTime": "2023-08-26T12:20:00",
    "arrivalTime": "2023-08-26T13:55:00",
    "stops": 0,
    "arrivalTerminal": "E",
    "flightEquipmentIataCode": "321",
    "isCodeshare": false,
    "serviceClasses": ["J", "Y"],
    "codeshares": [{"carrierFsCode": "KL", "flightNumber": "6124"}],
    "referenceCode": "1962-2291544--"
  },
  {
    "carrierFsCode": "DL",
    "flightNumber": "1118",
    "departureAirportFsCode": "TPA",
    "arrivalAirportFsCode": "ATL",
    "departureTime": "2023-08-27T15:25:00",
    "arrivalTime": "2023-08-27T17:01:00",
    "stops": 0,
    "departureTerminal": "E",
    "flightEquipmentIataCode": "739",
    "isCodeshare": false,
    "serviceClasses": ["J", "Y"],
    "codeshares": [],
    "referenceCode": "1962-2291870--"
  },
  {
    "carrierFsCode": "AA",
    "flightNumber": "1643",
    "departureAirportFsCode": "TPA",
    "arrivalAirportFsCode": "LGA",
    "departureTime": "2023-08-10T19:10:00",
    "arrivalTime": "2023-08-10T21:59:00",
    "stops": 0,
    "arrivalTerminal": "C",
    "flightEquipmentIataCode": "319",
    "isCodeshare": false,
    "serviceClasses": ["J", "Y"],
    "codeshares": [],
    "referenceCode": "2434-4815981--"
  },
  {
    "carrierFsCode": "AA",
    "flightNumber": "6122",
    "departureAirportFsCode": "LGA",
    "arrivalAirportFsCode": "TPA",
    "departureTime": "2023-08-10T15:01:00",
    "arrivalTime": "2023-08-10T18:10:00",
    "stops": 0,
    "departureTerminal": "C",
    "flightEquipmentIataCode": "319",
    "isCodeshare": false,
    "serviceClasses": ["J", "Y"],
    "codeshares": [{"carrierFsCode": "WS", "flightNumber": "6604"}],
    "referenceCode": "2434-3970270--"
  }
]"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_schedule_parses() {
        assert_eq!(StaticSchedule::sample().len(), 4);
    }

    #[test]
    fn test_query_normalizes_input() {
        let q = FlightQuery::parse("dl", "DL1636", "2023/08/26", "Arrival").unwrap();
        assert_eq!(q.airline, "DL");
        assert_eq!(q.flight_number, "1636");
        assert_eq!(q.date, NaiveDate::from_ymd_opt(2023, 8, 26).unwrap());
        assert_eq!(q.direction, Direction::Arriving);
    }

    #[test]
    fn test_query_rejects_malformed_input() {
        assert!(matches!(
            FlightQuery::parse("Delta Air", "1636", "2023-08-26", "arriving"),
            Err(FlightQueryError::InvalidAirline(_))
        ));
        assert!(matches!(
            FlightQuery::parse("DL", "16A6", "2023-08-26", "arriving"),
            Err(FlightQueryError::InvalidFlightNumber(_))
        ));
        assert!(matches!(
            FlightQuery::parse("DL", "1636", "Aug 26th", "arriving"),
            Err(FlightQueryError::InvalidDate(_))
        ));
        assert!(matches!(
            FlightQuery::parse("DL", "1636", "2023-08-26", "sideways"),
            Err(FlightQueryError::InvalidDirection(_))
        ));
    }

    #[test]
    fn test_direction_selects_date() {
        let schedule = StaticSchedule::sample();
        let arriving = FlightQuery::parse("DL", "1636", "2023-08-26", "arriving").unwrap();
        let found = schedule.scheduled_flights(&arriving);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].arrival_airport_fs_code, "TPA");

        let wrong_day = FlightQuery::parse("DL", "1636", "2023-08-25", "arriving").unwrap();
        assert!(schedule.scheduled_flights(&wrong_day).is_empty());
    }

    #[test]
    fn test_lookup_is_repeatable() {
        let schedule = StaticSchedule::sample();
        let q = FlightQuery::parse("DL", "1118", "2023-08-27", "departing").unwrap();
        assert_eq!(schedule.scheduled_flights(&q), schedule.scheduled_flights(&q));
    }
}
