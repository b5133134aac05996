//! 工具描述与参数 Schema
//!
//! ToolDescriptor 声明工具名、描述与有序参数表；validate_args 按声明校验并规范化 LLM 给出的参数。
//! 动作格式的 JSON Schema 由 schemars 生成，注入 system prompt 以减少 LLM 输出格式错误。

use std::fmt;

use schemars::{schema_for, JsonSchema};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// 参数语义类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// 尝试把原始值转换为本类型；不可转换时返回 None
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamType::String, Value::String(_)) => Some(value.clone()),
            (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (ParamType::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    Some(value.clone())
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| json!(f as i64))
                }
            }
            (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| json!(i)),

            (ParamType::Number, Value::Number(_)) => Some(value.clone()),
            (ParamType::Number, Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| json!(f)),

            (ParamType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ParamType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(Value::Bool(true)),
                "false" | "no" => Some(Value::Bool(false)),
                _ => None,
            },

            (ParamType::Array, Value::Array(_)) => Some(value.clone()),
            (ParamType::Object, Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个参数声明
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            default: None,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// 工具描述：注册后不可变，由 ToolRegistry 持有
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// 参数的 JSON Schema（供 LLM 生成正确的参数格式）
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            let mut prop = json!({
                "type": p.param_type.as_str(),
                "description": p.description,
            });
            if let Some(default) = &p.default {
                prop["default"] = default.clone();
            }
            properties.insert(p.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// 单行签名，如 `get_flight_info(airline: string, flight_number: string, ...)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if p.required {
                    format!("{}: {}", p.name, p.param_type)
                } else {
                    format!("{}?: {}", p.name, p.param_type)
                }
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// 按描述校验参数：必填项齐全、类型可转换、无未声明参数；
/// 成功时返回规范化后的参数（已转换类型、已补默认值），失败时返回全部问题
pub fn validate_args(
    descriptor: &ToolDescriptor,
    args: &Map<String, Value>,
) -> Result<Map<String, Value>, Vec<String>> {
    let mut problems = Vec::new();
    let mut normalized = Map::new();

    for spec in &descriptor.params {
        match args.get(&spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    problems.push(format!(
                        "missing required parameter '{}' ({})",
                        spec.name, spec.param_type
                    ));
                } else if let Some(default) = &spec.default {
                    normalized.insert(spec.name.clone(), default.clone());
                }
            }
            Some(raw) => match spec.param_type.coerce(raw) {
                Some(v) => {
                    normalized.insert(spec.name.clone(), v);
                }
                None => problems.push(format!(
                    "parameter '{}' expects {}, got {}",
                    spec.name,
                    spec.param_type,
                    json_type_name(raw)
                )),
            },
        }
    }

    for name in args.keys() {
        if descriptor.get_param(name).is_none() {
            problems.push(format!("unexpected parameter '{}'", name));
        }
    }

    if problems.is_empty() {
        Ok(normalized)
    } else {
        Err(problems)
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 动作格式：与 Planner 解析的 `{"action": "...", "action_input": ...}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ActionBlob {
    /// 工具名，或 "Final Answer"
    pub action: String,
    /// 工具参数对象；action 为 "Final Answer" 时为回复文本
    pub action_input: serde_json::Value,
}

/// 返回动作格式的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ActionBlob);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_descriptor() -> ToolDescriptor {
        ToolDescriptor::new("get_flight_info", "Look up a flight")
            .param(ParamSpec::required("airline", ParamType::String, "Airline code"))
            .param(ParamSpec::required("flight_number", ParamType::String, "Flight number"))
            .param(ParamSpec::optional("stops", ParamType::Integer, "Max stops").with_default(json!(0)))
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_coerces_and_applies_defaults() {
        let d = lookup_descriptor();
        let out = validate_args(&d, &args(json!({"airline": "DL", "flight_number": 1636}))).unwrap();
        assert_eq!(out["flight_number"], json!("1636"));
        assert_eq!(out["stops"], json!(0));
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let d = lookup_descriptor();
        let problems =
            validate_args(&d, &args(json!({"flight_number": [1], "seat": "12A"}))).unwrap_err();
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("'airline'")));
        assert!(problems.iter().any(|p| p.contains("expects string, got array")));
        assert!(problems.iter().any(|p| p.contains("unexpected parameter 'seat'")));
    }

    #[test]
    fn test_null_optional_is_absent() {
        let d = lookup_descriptor();
        let out = validate_args(
            &d,
            &args(json!({"airline": "DL", "flight_number": "1", "stops": null})),
        )
        .unwrap();
        assert_eq!(out["stops"], json!(0));
    }

    #[test]
    fn test_integer_from_string() {
        assert_eq!(ParamType::Integer.coerce(&json!("2")), Some(json!(2)));
        assert_eq!(ParamType::Integer.coerce(&json!(2.0)), Some(json!(2)));
        assert_eq!(ParamType::Integer.coerce(&json!("two")), None);
        assert_eq!(ParamType::Integer.coerce(&json!(2.5)), None);
    }

    #[test]
    fn test_parameters_schema_lists_required() {
        let schema = lookup_descriptor().parameters_schema();
        assert_eq!(schema["required"], json!(["airline", "flight_number"]));
        assert_eq!(schema["properties"]["stops"]["default"], json!(0));
    }

    #[test]
    fn test_signature_marks_optional() {
        assert_eq!(
            lookup_descriptor().signature(),
            "get_flight_info(airline: string, flight_number: string, stops?: integer)"
        );
    }

    #[test]
    fn test_action_schema_mentions_fields() {
        let s = tool_call_schema_json();
        assert!(s.contains("action_input"));
    }
}
