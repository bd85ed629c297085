//! bee-calc - 算术智能体命令行入口
//!
//! 初始化日志、加载配置、创建 CalcAgent，然后逐行读取 stdin：每行一个请求，exit / quit 退出。

use anyhow::Context;
use bee_calc::{agent::CalcAgent, config::load_config, core::RecoveryAction, core::RecoveryEngine};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bee_calc::observability::init();

    let cfg = load_config(None).context("Failed to load configuration")?;
    tracing::info!(memory = %cfg.app.memory_path.display(), "Starting bee-calc");

    let mut agent = CalcAgent::from_config(&cfg);
    let recovery = RecoveryEngine::new();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = match agent.handle(input).await {
            Ok(answer) => answer.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "Request failed");
                match recovery.handle(&err) {
                    RecoveryAction::AskUser(question) => question,
                    RecoveryAction::RetryWithPrompt(_) => {
                        format!("Sorry, I couldn't get a usable answer ({err}). Please try again.")
                    }
                    RecoveryAction::Inform(message) => message,
                }
            }
        };
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
    }

    let (prompt_tokens, completion_tokens, total_tokens) = agent.token_usage();
    tracing::info!(prompt_tokens, completion_tokens, total_tokens, "Oracle token usage");
    Ok(())
}
