//! Headless Agent 运行时
//!
//! create_agent_components 从配置构建 Planner（Oracle）、ToolRegistry、ToolExecutor；
//! process_email 把一封预订邮件转成任务文本并跑一次主循环。组件只读，可被多个并发运行共享。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tracing::Instrument;
use tokio_util::sync::CancellationToken;

use crate::booking::{FlightSchedule, JsonFileStore, ReservationStore, StaticSchedule};
use crate::config::AppConfig;
use crate::core::{AgentError, RunReport};
use crate::llm::{LlmClient, OpenAiClient};
use crate::react::{react_loop, Planner, ReactEvent, ReactSession, ReasoningOracle};
use crate::tools::{
    CreateReservationTool, FlightInfoTool, ToolExecutor, ToolRegistry, CREATE_RESERVATION,
    GET_FLIGHT_INFO,
};

/// 一封待处理的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// 解析纯文本邮件：首行若以 "Subject:" 开头则作为主题，其余为正文
    pub fn parse(text: &str) -> Self {
        let text = text.trim_start();
        match text.split_once('\n') {
            Some((first, rest)) if first.trim_start().starts_with("Subject:") => Self::new(
                first.trim_start().trim_start_matches("Subject:").trim(),
                rest.trim(),
            ),
            _ if text.starts_with("Subject:") => {
                Self::new(text.trim_start_matches("Subject:").trim(), "")
            }
            _ => Self::new("", text.trim()),
        }
    }
}

/// 预构建的 Agent 组件：Oracle、工具执行器与运行参数
pub struct AgentComponents {
    pub oracle: Arc<dyn ReasoningOracle>,
    /// Oracle 背后的 LLM，用于汇总 token 使用
    pub llm: Arc<dyn LlmClient>,
    pub executor: Arc<ToolExecutor>,
    pub agent_name: String,
    pub max_iterations: usize,
    pub oracle_timeout: Duration,
    pub fallback_message: String,
}

/// 客服人设（每次构建组件时写入当前日期时间）
pub fn persona_prompt(cfg: &AppConfig, now: DateTime<Local>) -> String {
    format!(
        "• You are a customer representative called {name} and you work for {company}.\n\
         • In every communication to customers, you will sign messages with \"{name}\".\n\
         • You will process requests if and only if requests are New Reservation Requests. If not, you will not process them.\n\
         • (TODAY'S DATE AND TIME: {now})",
        name = cfg.app.agent_name,
        company = cfg.app.company,
        now = now.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// 把邮件转为任务文本：邮件内容 + 处理要求
pub fn email_task(email: &Email, agent_name: &str) -> String {
    format!(
        "Email subject: {subject}\n\
         Email body:\n{body}\n\n\
         Expected handling:\n\
         • Call {lookup} once for each flight in the request.\n\
         • Call {create} with the information from the email and from the {lookup} results.\n\
         • Finish with a short confirmation that names the passenger, signed \"{agent}\".",
        subject = email.subject,
        body = email.body.trim(),
        lookup = GET_FLIGHT_INFO,
        create = CREATE_RESERVATION,
        agent = agent_name,
    )
}

/// 注册领域工具
pub fn build_registry(
    schedule: Arc<dyn FlightSchedule>,
    store: Arc<dyn ReservationStore>,
) -> Result<ToolRegistry, AgentError> {
    let mut tools = ToolRegistry::new();
    tools.register(FlightInfoTool::new(schedule))?;
    tools.register(CreateReservationTool::new(store))?;
    Ok(tools)
}

/// 按配置创建 LLM 客户端；调用前应已通过 AppConfig::validate
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    let api_key = cfg
        .llm
        .resolve_api_key()
        .ok_or_else(|| AgentError::ConfigError("missing API key".to_string()))?;
    let base_url = cfg.llm.resolve_base_url();
    tracing::info!(provider = %cfg.llm.provider, model = %cfg.llm.model, "using LLM");
    Ok(Arc::new(OpenAiClient::new(
        base_url.as_deref(),
        &cfg.llm.model,
        &api_key,
        cfg.llm.temperature,
    )))
}

/// 从配置创建全部组件：校验配置、加载时刻表、打开预订存储
pub fn create_agent_components(cfg: &AppConfig) -> Result<AgentComponents, AgentError> {
    cfg.validate()?;
    let llm = create_llm_from_config(cfg)?;

    let schedule: Arc<dyn FlightSchedule> = match &cfg.tools.flights.schedule_path {
        Some(path) => Arc::new(StaticSchedule::from_file(path).map_err(|e| {
            AgentError::ConfigError(format!("cannot load flight schedule {}: {e}", path.display()))
        })?),
        None => Arc::new(StaticSchedule::sample()),
    };
    let store: Arc<dyn ReservationStore> =
        Arc::new(JsonFileStore::new(&cfg.tools.reservations.storage_dir));

    AgentComponents::assemble(cfg, llm, schedule, store)
}

impl AgentComponents {
    /// 用给定的 LLM、时刻表与存储组装（不检查凭据，测试与离线演练用）
    pub fn assemble(
        cfg: &AppConfig,
        llm: Arc<dyn LlmClient>,
        schedule: Arc<dyn FlightSchedule>,
        store: Arc<dyn ReservationStore>,
    ) -> Result<Self, AgentError> {
        let registry = Arc::new(build_registry(schedule, store)?);
        let executor = ToolExecutor::new(registry, cfg.tools.tool_timeout_secs);
        let planner = Planner::new(llm.clone(), persona_prompt(cfg, Local::now()));
        Ok(Self {
            oracle: Arc::new(planner),
            llm,
            executor: Arc::new(executor),
            agent_name: cfg.app.agent_name.clone(),
            max_iterations: cfg.app.max_iterations,
            oracle_timeout: cfg.llm.request_timeout(),
            fallback_message: cfg.app.fallback_message.clone(),
        })
    }

    /// 所有运行累计的 token 使用：(prompt, completion, total)
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 按组件参数构建一次运行的会话
    pub fn session(&self) -> ReactSession<'_> {
        ReactSession::new(self.oracle.as_ref(), self.executor.as_ref())
            .with_max_steps(self.max_iterations)
            .with_oracle_timeout(self.oracle_timeout)
            .with_fallback_message(&self.fallback_message)
    }

    /// 对任意任务文本跑一次主循环
    pub async fn run_task(&self, task: &str) -> RunReport {
        react_loop(&self.session(), task).await
    }

    /// 处理一封邮件
    pub async fn process_email(&self, email: &Email) -> RunReport {
        let task = email_task(email, &self.agent_name);
        react_loop(&self.session(), &task)
            .instrument(tracing::info_span!("email", subject = %email.subject))
            .await
    }

    /// 处理一封邮件，并通过 event_tx 推送过程事件；cancel_token 可在步骤之间终止运行
    pub async fn process_email_with_events(
        &self,
        email: &Email,
        event_tx: &mpsc::UnboundedSender<ReactEvent>,
        cancel_token: CancellationToken,
    ) -> RunReport {
        let task = email_task(email, &self.agent_name);
        let session = self
            .session()
            .with_event_tx(event_tx)
            .with_cancel_token(cancel_token);
        react_loop(&session, &task).await
    }
}
