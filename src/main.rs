//! Ruth - 预订邮件处理 Agent
//!
//! 入口：初始化日志、加载配置、构建 Agent 组件，并发处理命令行给出的邮件文件。
//! 未给出文件时处理内置的样例邮件。
//!
//! 用法: ruth [--config <path>] [email.txt ...]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use futures_util::future::join_all;
use ruth::agent::{create_agent_components, Email};
use ruth::config::load_config;
use ruth::observability;

const SAMPLE_SUBJECT: &str = "new bookings TPA";

const SAMPLE_BODY: &str = "Dear team,
Please book new VIP services at TPA airport:
1 pax:
Dr. Emma Guttman

Arrival:
Date: Aug 26th
Flight: DL1636

Departure:
Date: Aug 27th
Flight: DL1118 at 15:25

Airline booking refence / record locator : HOFRNI

Please confirm.
Thanks,
Avishug

Booked By Info:
Name: Sample Name
Last Name: Sample Last Name
Email: booker@domains.com
Agent: Sample Name Sample Last Name
";

/// Ruth 命令行参数
#[derive(Parser, Debug)]
#[command(name = "ruth")]
#[command(about = "Process reservation request emails with a ReAct agent", long_about = None)]
struct CliArgs {
    /// 配置文件路径（给出时必须存在）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 邮件文本文件；为空时处理内置样例
    emails: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let args = CliArgs::parse();
    let cfg = load_config(args.config).context("Failed to load config")?;
    let components = create_agent_components(&cfg).context("Failed to create agent")?;

    let emails = if args.emails.is_empty() {
        tracing::info!("no email files given, processing the sample request");
        vec![Email::new(SAMPLE_SUBJECT, SAMPLE_BODY)]
    } else {
        let mut loaded = Vec::with_capacity(args.emails.len());
        for path in &args.emails {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            loaded.push(Email::parse(&text));
        }
        loaded
    };

    // 各封邮件互不共享 Scratchpad，可并发处理
    let reports = join_all(emails.iter().map(|email| components.process_email(email))).await;

    let mut escalations = 0;
    for (email, report) in emails.iter().zip(&reports) {
        tracing::info!(
            subject = %email.subject,
            iterations = report.iterations,
            answered = report.outcome.is_answered(),
            "run finished"
        );
        if report.outcome.needs_escalation() {
            escalations += 1;
            tracing::warn!(subject = %email.subject, "run aborted, needs a human follow-up");
        }
        println!("{}", report.outcome.message());
    }

    if escalations > 0 {
        tracing::warn!(escalations, "some requests need manual handling");
    }

    let (prompt_tokens, completion_tokens, total_tokens) = components.token_usage();
    tracing::info!(prompt_tokens, completion_tokens, total_tokens, "token usage");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_config_and_emails() {
        let args = CliArgs::try_parse_from(["ruth", "-c", "ruth.toml", "a.txt", "b.txt"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("ruth.toml")));
        assert_eq!(args.emails, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);

        let args = CliArgs::try_parse_from(["ruth", "--config", "other.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("other.toml")));
        assert!(args.emails.is_empty());
    }

    #[test]
    fn test_cli_rejects_unknown_flag_and_missing_value() {
        assert!(CliArgs::try_parse_from(["ruth", "--verbose"]).is_err());
        assert!(CliArgs::try_parse_from(["ruth", "--config"]).is_err());
    }
}
