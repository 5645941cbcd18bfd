use std::str::FromStr;

use anyhow::{anyhow, bail};

use crate::{
    format::{format_duration, format_timestamp},
    models::FastSession,
    timer::{FastController, FastStats, LedgerSnapshot},
};

pub const HELP: &str = "\
commands:
  start          begin a fast
  end            end the current fast and record it
  status         show the running timer
  history        list past fasts, newest first
  delete <id>    remove one past fast
  clear          remove all past fasts
  stats          totals over the history
  help           show this list
  quit           exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    End,
    Status,
    History,
    Delete(String),
    Clear,
    Stats,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| anyhow!("empty command"))?
            .to_ascii_lowercase();

        let command = match name.as_str() {
            "start" => Command::Start,
            "end" | "stop" => Command::End,
            "status" => Command::Status,
            "history" | "ls" => Command::History,
            "delete" | "rm" => {
                let id = parts
                    .next()
                    .ok_or_else(|| anyhow!("usage: delete <id>"))?;
                Command::Delete(id.to_string())
            }
            "clear" => Command::Clear,
            "stats" => Command::Stats,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command '{other}' (try 'help')"),
        };

        if parts.next().is_some() {
            bail!("too many arguments for '{name}'");
        }
        Ok(command)
    }
}

/// Runs one command and renders its output. `Quit` is handled by the caller.
pub async fn execute(controller: &FastController, command: Command) -> Result<String, String> {
    match command {
        Command::Start => start_fast(controller).await,
        Command::End => end_fast(controller).await,
        Command::Status => Ok(render_status(&controller.get_snapshot().await)),
        Command::History => Ok(render_history(&controller.history().await)),
        Command::Delete(id) => delete_session(controller, &id).await,
        Command::Clear => clear_history(controller).await,
        Command::Stats => Ok(render_stats(&controller.stats().await)),
        Command::Help | Command::Quit => Ok(HELP.to_string()),
    }
}

async fn start_fast(controller: &FastController) -> Result<String, String> {
    let snapshot = controller.start_fast().await.map_err(|e| e.to_string())?;
    let started = snapshot
        .active_start
        .map(format_timestamp)
        .unwrap_or_default();
    Ok(format!("Fast started at {started}"))
}

async fn end_fast(controller: &FastController) -> Result<String, String> {
    let session = controller.end_fast().await.map_err(|e| e.to_string())?;
    Ok(format!(
        "Fast ended: {} (id {})",
        format_duration(session.duration),
        session.id
    ))
}

async fn delete_session(controller: &FastController, id: &str) -> Result<String, String> {
    let removed = controller
        .delete_session(id)
        .await
        .map_err(|e| e.to_string())?;
    if removed {
        Ok(format!("Deleted {id}"))
    } else {
        Ok(format!("No fast with id {id}"))
    }
}

async fn clear_history(controller: &FastController) -> Result<String, String> {
    controller
        .clear_history()
        .await
        .map_err(|e| e.to_string())?;
    Ok("History cleared".to_string())
}

pub fn render_status(snapshot: &LedgerSnapshot) -> String {
    if snapshot.is_fasting() {
        format!("Fasting {}", format_duration(snapshot.elapsed_seconds))
    } else {
        "Not fasting".to_string()
    }
}

pub fn render_history(history: &[FastSession]) -> String {
    if history.is_empty() {
        return "No fasting history yet".to_string();
    }

    history
        .iter()
        .map(|fast| {
            format!(
                "{}  {}  {} -> {}",
                fast.id,
                format_duration(fast.duration),
                format_timestamp(fast.start_time),
                format_timestamp(fast.end_time)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_stats(stats: &FastStats) -> String {
    let longest = stats
        .longest
        .as_ref()
        .map(|fast| format_duration(fast.duration))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} fasts, {} total, longest {}",
        stats.count,
        format_duration(stats.total_seconds),
        longest
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::MemoryHistoryStore, timer::SystemClock};
    use std::{sync::Arc, time::Duration};

    fn controller() -> FastController {
        FastController::new(
            Arc::new(MemoryHistoryStore::new()),
            Arc::new(SystemClock),
            Duration::from_millis(50),
        )
    }

    #[test]
    fn parses_commands() {
        assert_eq!("start".parse::<Command>().unwrap(), Command::Start);
        assert_eq!("  END ".parse::<Command>().unwrap(), Command::End);
        assert_eq!(
            "delete 1700000000000".parse::<Command>().unwrap(),
            Command::Delete("1700000000000".into())
        );
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("delete".parse::<Command>().is_err());
        assert!("start now".parse::<Command>().is_err());
        assert!("fly".parse::<Command>().is_err());
    }

    #[test]
    fn empty_history_message() {
        assert_eq!(render_history(&[]), "No fasting history yet");
    }

    #[test]
    fn history_lists_one_line_per_fast() {
        let history = vec![
            FastSession::completed(10_000, 3_610_000),
            FastSession::completed(0, 5_000),
        ];
        let rendered = render_history(&history);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("3610000  01:00:00"));
        assert!(lines[1].starts_with("5000  00:00:05"));
    }

    #[tokio::test]
    async fn command_flow() {
        let controller = controller();

        assert_eq!(
            execute(&controller, Command::Status).await.unwrap(),
            "Not fasting"
        );
        assert!(execute(&controller, Command::End).await.is_err());
        assert!(execute(&controller, Command::Start)
            .await
            .unwrap()
            .starts_with("Fast started at"));
        assert!(execute(&controller, Command::Status)
            .await
            .unwrap()
            .starts_with("Fasting 00:00:0"));
        assert!(execute(&controller, Command::End)
            .await
            .unwrap()
            .starts_with("Fast ended: 00:00:0"));

        let id = controller.history().await[0].id.clone();
        assert_eq!(
            execute(&controller, Command::Delete(id.clone())).await.unwrap(),
            format!("Deleted {id}")
        );
        assert_eq!(
            execute(&controller, Command::Stats).await.unwrap(),
            "0 fasts, 00:00:00 total, longest -"
        );
    }
}
