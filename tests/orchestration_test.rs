//! 端到端测试：脚本化 LLM + 内置时刻表 + 临时目录中的 JSON 存储
//!
//! 覆盖：完整预订流程、航段缺字段时不写入、未知工具后继续、迭代上限兜底、带花括号的纯文本回复。

use std::sync::Arc;

use ruth::agent::{AgentComponents, Email};
use ruth::booking::{JsonFileStore, ReservationStore, ServiceType, StaticSchedule};
use ruth::config::AppConfig;
use ruth::core::{AbortReason, RunOutcome};
use ruth::llm::ScriptedLlmClient;
use ruth::memory::StepAction;
use ruth::tools::FailureKind;
use tempfile::TempDir;

fn action(thought: &str, tool: &str, input: serde_json::Value) -> String {
    format!(
        "Thought: {thought}\nAction:\n```json\n{}\n```",
        serde_json::json!({ "action": tool, "action_input": input })
    )
}

fn final_answer(text: &str) -> String {
    action("I know what to respond", "Final Answer", serde_json::json!(text))
}

fn sample_email() -> Email {
    Email::new(
        "new bookings TPA",
        "Dear team,\nPlease book new VIP services at TPA airport:\n1 pax:\nDr. Emma Guttman\n\n\
         Arrival:\nDate: Aug 26th\nFlight: DL1636\n\nDeparture:\nDate: Aug 27th\nFlight: DL1118 at 15:25\n\n\
         Airline booking refence / record locator : HOFRNI\n\n\
         Booked By Info:\nName: Sample Name\nLast Name: Sample Last Name\nEmail: booker@domains.com\n\
         Agent: Sample Name Sample Last Name",
    )
}

fn reservation_input(arrival_airport: Option<&str>) -> serde_json::Value {
    let mut arrival = serde_json::json!({
        "service_type": "ARR",
        "service_date": "2023-08-26",
        "airline": "DL",
        "flight_number": "1636",
        "time": "13:55",
        "airline_reference": "HOFRNI",
        "departure_airport": "ATL"
    });
    if let Some(airport) = arrival_airport {
        arrival["airport"] = serde_json::json!(airport);
    }
    serde_json::json!({
        "pax_first_name": "Emma",
        "pax_last_name": "Guttman",
        "booked_first_name": "Sample Name",
        "booked_last_name": "Sample Last Name",
        "booked_email": "booker@domains.com",
        "agent": "Sample Name Sample Last Name",
        "travelers": 1,
        "flights": [
            arrival,
            {
                "service_type": "DEP",
                "service_date": "2023-08-27",
                "airline": "DL",
                "flight_number": "1118",
                "airport": "TPA",
                "time": "15:25",
                "airline_reference": "HOFRNI"
            }
        ]
    })
}

fn lookups() -> Vec<String> {
    vec![
        action(
            "I need the arrival flight details",
            "get_flight_info",
            serde_json::json!({
                "airline": "DL", "flight_number": "1636",
                "flight_date": "2023-08-26", "direction": "arriving"
            }),
        ),
        action(
            "Now the departure flight",
            "get_flight_info",
            serde_json::json!({
                "airline": "DL", "flight_number": "DL1118",
                "flight_date": "2023-08-27", "direction": "departing"
            }),
        ),
    ]
}

fn components(
    script: Vec<String>,
    store: Arc<JsonFileStore>,
    cfg: &AppConfig,
) -> (AgentComponents, Arc<ScriptedLlmClient>) {
    let llm = Arc::new(ScriptedLlmClient::new(script));
    let components = AgentComponents::assemble(
        cfg,
        llm.clone(),
        Arc::new(StaticSchedule::sample()),
        store,
    )
    .unwrap();
    (components, llm)
}

#[tokio::test]
async fn test_email_creates_one_reservation() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()));

    let mut script = lookups();
    script.push(action(
        "I have both flights, create the reservation",
        "create_reservation",
        reservation_input(Some("TPA")),
    ));
    script.push(final_answer(
        "Reservation created for Emma Guttman. Thanks, Ruth",
    ));
    let (agent, llm) = components(script, store.clone(), &AppConfig::default());

    let report = agent.process_email(&sample_email()).await;

    assert!(report.outcome.is_answered());
    assert!(report.outcome.message().contains("Emma Guttman"));
    assert_eq!(report.iterations, 4);
    assert_eq!(llm.calls(), 4);
    assert_eq!(report.scratchpad.failures().count(), 0);

    // 每次工具调用都得到了 Observation
    let entries = report.scratchpad.entries();
    assert_eq!(entries.len(), 4);
    assert!(entries[..3].iter().all(|e| e.observation.is_some()));
    assert!(matches!(entries[3].action, StepAction::Final { .. }));

    // 第二次请求里能看到第一次查询的结果
    let second = llm.request(1).unwrap();
    let user = &second.last().unwrap().content;
    assert!(user.contains("Observation:"));
    assert!(user.contains("ATL"));

    let ids = store.list().await.unwrap();
    assert_eq!(ids.len(), 1);
    let record = store.load(ids[0]).await.unwrap();
    assert_eq!(record.passenger_name(), "Emma Guttman");
    assert_eq!(record.flights.len(), 2);
    assert_eq!(record.flights[0].service_type, ServiceType::Arrival);
    assert_eq!(record.flights[0].flight_number, "1636");
    assert_eq!(record.flights[0].service_date, "2023-08-26");
    assert_eq!(record.flights[1].service_type, ServiceType::Departure);
    assert_eq!(record.flights[1].flight_number, "1118");
    assert_eq!(record.flights[1].service_date, "2023-08-27");

    let create_obs = entries[2].observation.as_ref().unwrap().render();
    assert!(create_obs.contains("Emma Guttman"));
    assert!(create_obs.contains(&ids[0].to_string()));
}

#[tokio::test]
async fn test_missing_airport_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()));

    let mut script = lookups();
    script.push(action(
        "Create the reservation",
        "create_reservation",
        reservation_input(None),
    ));
    script.push(final_answer(
        "Reservation couldn't be created. Someone from the team will get in touch with the passenger.",
    ));
    let (agent, _llm) = components(script, store.clone(), &AppConfig::default());

    let report = agent.process_email(&sample_email()).await;

    let failures: Vec<_> = report.scratchpad.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Domain);
    assert!(failures[0].reason.contains("segment 0"));
    assert!(failures[0].reason.contains("airport"));
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_then_recovers() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()));

    let script = vec![
        action(
            "Maybe a hotel is needed",
            "book_hotel",
            serde_json::json!({"city": "Tampa"}),
        ),
        final_answer("Only flight services were requested. Thanks, Ruth"),
    ];
    let (agent, llm) = components(script, store.clone(), &AppConfig::default());

    let report = agent.run_task("Book a hotel in Tampa").await;

    assert!(report.outcome.is_answered());
    assert_eq!(report.iterations, 2);
    let failure = report.scratchpad.failures().next().unwrap();
    assert_eq!(failure.kind, FailureKind::UnknownTool);
    assert!(failure.reason.contains("book_hotel"));

    // 下一次推理能看到失败原因与可用工具
    let user = llm.request(1).unwrap().last().unwrap().content.clone();
    assert!(user.contains("book_hotel"));
    assert!(user.contains("get_flight_info"));
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_iteration_limit_returns_fallback() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let mut cfg = AppConfig::default();
    cfg.app.max_iterations = 3;

    // 只会反复查询，从不给出最终回复
    let script = vec![lookups().remove(0)];
    let (agent, llm) = components(script, store, &cfg);

    let report = agent.process_email(&sample_email()).await;

    assert_eq!(report.iterations, 3);
    assert_eq!(llm.calls(), 3);
    assert!(report.outcome.needs_escalation());
    assert_eq!(
        report.outcome,
        RunOutcome::Aborted {
            reason: AbortReason::IterationLimit,
            message: cfg.app.fallback_message.clone(),
        }
    );
}

#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()));

    let make = |name: &str| {
        let mut input = reservation_input(Some("TPA"));
        input["pax_first_name"] = serde_json::json!(name);
        vec![
            action("Create it", "create_reservation", input),
            final_answer(&format!("Reservation created for {name} Guttman. Thanks, Ruth")),
        ]
    };
    let (a, _) = components(make("Emma"), store.clone(), &AppConfig::default());
    let (b, _) = components(make("Noa"), store.clone(), &AppConfig::default());

    let (email_a, email_b) = (sample_email(), sample_email());
    let (ra, rb) = tokio::join!(a.process_email(&email_a), b.process_email(&email_b));

    assert!(ra.outcome.message().contains("Emma"));
    assert!(rb.outcome.message().contains("Noa"));
    assert_eq!(ra.scratchpad.len(), 2);
    assert_eq!(rb.scratchpad.len(), 2);
    assert_eq!(store.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_plain_answer_with_braces_finishes_in_one_step() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path()));
    let script =
        vec!["Thought: done\nFinal Answer: Booked {HOFRNI} for Emma Guttman. Thanks, Ruth".to_string()];
    let (agent, llm) = components(script, store, &AppConfig::default());

    let report = agent.run_task("Confirm the HOFRNI booking").await;

    assert_eq!(
        report.outcome,
        RunOutcome::Answered {
            text: "Booked {HOFRNI} for Emma Guttman. Thanks, Ruth".to_string()
        }
    );
    assert_eq!(report.iterations, 1);
    assert_eq!(llm.calls(), 1);
    assert_eq!(report.scratchpad.failures().count(), 0);
}
