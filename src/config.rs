//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RUTH__*` 覆盖（双下划线表示嵌套，如 `RUTH__LLM__MODEL=gpt-4o-mini`）。
//! 启动时调用 validate：缺少 API Key 属于配置错误，不会留到运行时才暴露。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
}

/// [app] 段：人设与运行上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 客服代表署名
    pub agent_name: String,
    pub company: String,
    /// 单次运行最多调用 Oracle 的次数
    pub max_iterations: usize,
    /// 未得到最终回复时返回给调用方的兜底文本
    pub fallback_message: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            agent_name: "Ruth".to_string(),
            company: "CompanyA".to_string(),
            max_iterations: crate::react::DEFAULT_MAX_STEPS,
            fallback_message: crate::react::DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// [llm] 段：后端、模型、凭据与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek（均为 OpenAI 兼容接口）
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读取 OPENAI_API_KEY（deepseek 为 DEEPSEEK_API_KEY）
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.0,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次 Oracle 调用超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

impl LlmSection {
    fn key_env_var(&self) -> &'static str {
        if self.provider == "deepseek" {
            "DEEPSEEK_API_KEY"
        } else {
            "OPENAI_API_KEY"
        }
    }

    /// 凭据：配置优先，其次环境变量；空串视为未设置
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(self.key_env_var()).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn resolve_base_url(&self) -> Option<String> {
        match (&self.base_url, self.provider.as_str()) {
            (Some(url), _) => Some(url.clone()),
            (None, "deepseek") => Some(DEEPSEEK_BASE_URL.to_string()),
            (None, _) => None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request)
    }
}

/// [tools] 段：工具超时、预订存储目录、航班时刻表
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub reservations: ReservationsSection,
    pub flights: FlightsSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            reservations: ReservationsSection::default(),
            flights: FlightsSection::default(),
        }
    }
}

/// [tools.reservations] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReservationsSection {
    pub storage_dir: PathBuf,
}

impl Default for ReservationsSection {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("reservations"),
        }
    }
}

/// [tools.flights] 段：时刻表 JSON 文件；未设置时使用内置样例
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FlightsSection {
    pub schedule_path: Option<PathBuf>,
}

impl AppConfig {
    /// 启动时校验：迭代上限、超时、后端与凭据
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.app.max_iterations == 0 {
            return Err(AgentError::ConfigError(
                "app.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.llm.timeouts.request == 0 || self.tools.tool_timeout_secs == 0 {
            return Err(AgentError::ConfigError(
                "timeouts must be at least 1 second".to_string(),
            ));
        }
        if !matches!(self.llm.provider.as_str(), "openai" | "deepseek") {
            return Err(AgentError::ConfigError(format!(
                "unknown llm.provider '{}' (expected openai or deepseek)",
                self.llm.provider
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AgentError::ConfigError("llm.model must be set".to_string()));
        }
        if self.llm.resolve_api_key().is_none() {
            return Err(AgentError::ConfigError(format!(
                "missing API key: set llm.api_key, RUTH__LLM__API_KEY or {}",
                self.llm.key_env_var()
            )));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 RUTH__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（必须存在，可覆盖前面的键）
/// 3. 最后叠加环境变量 RUTH__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    // 显式给出的文件必须存在
    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RUTH")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.agent_name, "Ruth");
        assert_eq!(cfg.app.max_iterations, 15);
        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert_eq!(cfg.tools.reservations.storage_dir, PathBuf::from("reservations"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[app]\nmax_iterations = 5\n[llm]\nmodel = \"gpt-4o-mini\"\napi_key = \"sk-file\"\n[tools.reservations]\nstorage_dir = \"/tmp/res\""
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.app.max_iterations, 5);
        assert_eq!(cfg.app.agent_name, "Ruth");
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.resolve_api_key().as_deref(), Some("sk-file"));
        assert_eq!(cfg.tools.reservations.storage_dir, PathBuf::from("/tmp/res"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("ruht.toml");
        assert!(load_config(Some(missing)).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("sk-test".into());
        cfg.app.max_iterations = 0;
        assert!(matches!(cfg.validate(), Err(AgentError::ConfigError(_))));
    }

    #[test]
    fn test_blank_api_key_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("   ".into());
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(ref m) if m.contains("missing API key")));
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("sk-test".into());
        cfg.llm.provider = "carrier-pigeon".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_deepseek_base_url() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "deepseek".into();
        assert_eq!(cfg.llm.resolve_base_url().as_deref(), Some(DEEPSEEK_BASE_URL));
        cfg.llm.base_url = Some("http://localhost:8080/v1".into());
        assert_eq!(cfg.llm.resolve_base_url().as_deref(), Some("http://localhost:8080/v1"));
    }
}
