//! Line-oriented front-end for the session manager.
//!
//! Plain lines become prompts; slash commands drive the history, todo, and
//! file collections. A subscriber task prints streamed chunks as they land,
//! so the prompt stays responsive for `/cancel` while a generation runs.

use session::SessionManager;
use shared::events::SessionEvent;
use shared::items::FileKind;
use std::io::Write as _;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use uuid::Uuid;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    Cancel,
    Quit,
    Help,
    History,
    EditResponse { index: usize, text: String },
    Resubmit(String),
    TodoAdd(String),
    TodoList,
    TodoToggle(usize),
    TodoRename { index: usize, title: String },
    TodoDelete(usize),
    FileAdd { name: String, content: String },
    FileList,
    FileShow(usize),
    FileUpdate { index: usize, name: String, content: String },
    FileDelete(usize),
    Sidebar,
    Empty,
    Unknown(String),
}

impl Command {
    /// Indices shown to the user are 1-based.
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if !line.starts_with('/') {
            return Command::Prompt(line.to_string());
        }

        let mut parts = line.splitn(2, ' ');
        let head = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or("").trim();

        match head {
            "/cancel" => Command::Cancel,
            "/quit" | "/exit" => Command::Quit,
            "/help" => Command::Help,
            "/sidebar" => Command::Sidebar,
            "/history" => Command::History,
            "/edit" => match split_index(rest) {
                Some((index, text)) if !text.is_empty() => Command::EditResponse {
                    index,
                    text: text.to_string(),
                },
                _ => Command::Unknown(line.to_string()),
            },
            "/resubmit" if !rest.is_empty() => Command::Resubmit(rest.to_string()),
            "/todo" => parse_todo(rest).unwrap_or_else(|| Command::Unknown(line.to_string())),
            "/file" => parse_file(rest).unwrap_or_else(|| Command::Unknown(line.to_string())),
            _ => Command::Unknown(line.to_string()),
        }
    }
}

fn split_index(rest: &str) -> Option<(usize, &str)> {
    let mut parts = rest.splitn(2, ' ');
    let index: usize = parts.next()?.parse().ok()?;
    Some((index, parts.next().unwrap_or("").trim()))
}

fn parse_todo(rest: &str) -> Option<Command> {
    let mut parts = rest.splitn(2, ' ');
    let verb = parts.next()?;
    let arg = parts.next().unwrap_or("").trim();
    match verb {
        "add" if !arg.is_empty() => Some(Command::TodoAdd(arg.to_string())),
        "list" | "" => Some(Command::TodoList),
        "done" => Some(Command::TodoToggle(arg.parse().ok()?)),
        "rename" => split_index(arg).filter(|(_, t)| !t.is_empty()).map(
            |(index, title)| Command::TodoRename {
                index,
                title: title.to_string(),
            },
        ),
        "rm" => Some(Command::TodoDelete(arg.parse().ok()?)),
        _ => None,
    }
}

fn parse_file(rest: &str) -> Option<Command> {
    let mut parts = rest.splitn(2, ' ');
    let verb = parts.next()?;
    let arg = parts.next().unwrap_or("").trim();
    match verb {
        "add" => {
            let mut parts = arg.splitn(2, ' ');
            let name = parts.next().filter(|n| !n.is_empty())?;
            Some(Command::FileAdd {
                name: name.to_string(),
                content: parts.next().unwrap_or("").to_string(),
            })
        }
        "list" | "" => Some(Command::FileList),
        "show" => Some(Command::FileShow(arg.parse().ok()?)),
        "update" => {
            let (index, rest) = split_index(arg)?;
            let mut parts = rest.splitn(2, ' ');
            let name = parts.next().filter(|n| !n.is_empty())?;
            Some(Command::FileUpdate {
                index,
                name: name.to_string(),
                content: parts.next().unwrap_or("").to_string(),
            })
        }
        "rm" => Some(Command::FileDelete(arg.parse().ok()?)),
        _ => None,
    }
}

const HELP: &str = "\
Commands:
  <text>                      send a prompt
  /cancel                     stop the running generation
  /history                    list committed exchanges
  /edit <n> <text>            overwrite response n
  /resubmit <text>            run a replacement prompt
  /todo add <title> | list | done <n> | rename <n> <title> | rm <n>
  /file add <name> [content] | list | show <n> | update <n> <name> <content> | rm <n>
  /sidebar                    toggle the sidebar flag
  /quit                       exit";

/// Render user-facing copy for a failed generation, in the same spirit as
/// the inline error the original app shows in place of the output.
pub fn format_provider_error(error: &str) -> String {
    let lower = error.to_lowercase();
    if lower.contains("connection")
        || lower.contains("connect")
        || lower.contains("timeout")
        || lower.contains("dns")
    {
        return format!(
            "Couldn't reach the local runtime. Is `ollama serve` running?\n\nError: {}",
            error
        );
    }
    if lower.contains("not found") || lower.contains("manifest") || lower.contains("no such model")
    {
        return format!(
            "That model isn't available. Try `ollama pull <model>` or pick another in settings.\n\nError: {}",
            error
        );
    }
    format!("Generation failed.\n\nError: {}", error)
}

fn print_event(event: SessionEvent) {
    match event {
        SessionEvent::OutputChunk { text } => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        SessionEvent::ModelProgress { fraction } if fraction < 1.0 => {
            eprint!("\rpulling model… {:>3.0}%", fraction * 100.0);
        }
        SessionEvent::GenerationCompleted { .. } => println!(),
        SessionEvent::GenerationCancelled => println!("\n[generation cancelled]"),
        SessionEvent::GenerationFailed { error } => {
            println!("\n{}", format_provider_error(&error))
        }
        _ => {}
    }
}

fn nth_id<T>(items: &[T], index: usize, id: impl Fn(&T) -> Uuid) -> Option<Uuid> {
    index
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .map(|item| id(item))
}

pub async fn run(manager: Arc<SessionManager>) -> anyhow::Result<()> {
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Help => println!("{}", HELP),
            Command::Quit => {
                manager.cancel_generation();
                break;
            }
            Command::Cancel => manager.cancel_generation(),
            Command::Prompt(prompt) | Command::Resubmit(prompt) => {
                if manager.snapshot().is_generating {
                    println!("A generation is already running — /cancel it first.");
                    continue;
                }
                let manager = Arc::clone(&manager);
                // Failures surface through GenerationFailed in the printer
                tokio::spawn(async move {
                    let _ = manager.start_generation(&prompt).await;
                });
            }
            Command::History => {
                let state = manager.snapshot();
                if state.history.is_empty() {
                    println!("No history yet.");
                }
                for (i, entry) in state.history.iter().enumerate() {
                    println!(
                        "{:>3}. [{}] {}",
                        i + 1,
                        entry.created_at.format("%H:%M"),
                        entry.prompt
                    );
                }
            }
            Command::EditResponse { index, text } => {
                match nth_id(&manager.snapshot().history, index, |e| e.id) {
                    Some(id) => manager.edit_history_output(id, text),
                    None => println!("No history entry {}.", index),
                }
            }
            Command::TodoAdd(title) => {
                manager.add_todo(title);
            }
            Command::TodoList => {
                let state = manager.snapshot();
                if state.todos.is_empty() {
                    println!("No todos.");
                }
                for (i, todo) in state.todos.iter().enumerate() {
                    let mark = if todo.is_completed { "x" } else { " " };
                    println!("{:>3}. [{}] {}", i + 1, mark, todo.title);
                }
            }
            Command::TodoToggle(index) => {
                match nth_id(&manager.snapshot().todos, index, |t| t.id) {
                    Some(id) => manager.toggle_todo(id),
                    None => println!("No todo {}.", index),
                }
            }
            Command::TodoRename { index, title } => {
                match nth_id(&manager.snapshot().todos, index, |t| t.id) {
                    Some(id) => manager.rename_todo(id, title),
                    None => println!("No todo {}.", index),
                }
            }
            Command::TodoDelete(index) => {
                match nth_id(&manager.snapshot().todos, index, |t| t.id) {
                    Some(id) => manager.delete_todo(id),
                    None => println!("No todo {}.", index),
                }
            }
            Command::FileAdd { name, content } => {
                let kind = FileKind::from_name(&name);
                manager.add_file(name, content, kind);
            }
            Command::FileList => {
                let state = manager.snapshot();
                if state.files.is_empty() {
                    println!("No files.");
                }
                for (i, file) in state.files.iter().enumerate() {
                    println!("{:>3}. {} {}", i + 1, file.kind.icon(), file.name);
                }
            }
            Command::FileShow(index) => {
                let state = manager.snapshot();
                match index.checked_sub(1).and_then(|i| state.files.get(i)) {
                    Some(file) => println!("--- {} ---\n{}", file.name, file.content),
                    None => println!("No file {}.", index),
                }
            }
            Command::FileUpdate {
                index,
                name,
                content,
            } => match nth_id(&manager.snapshot().files, index, |f| f.id) {
                Some(id) => manager.update_file(id, name, content),
                None => println!("No file {}.", index),
            },
            Command::FileDelete(index) => {
                match nth_id(&manager.snapshot().files, index, |f| f.id) {
                    Some(id) => manager.delete_file(id),
                    None => println!("No file {}.", index),
                }
            }
            Command::Sidebar => {
                let visible = !manager.snapshot().sidebar_visible;
                manager.set_sidebar_visible(visible);
                println!("sidebar {}", if visible { "shown" } else { "hidden" });
            }
            Command::Unknown(line) => {
                println!("Unrecognized command: {} (try /help)", line);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(
            Command::parse("write me a haiku"),
            Command::Prompt("write me a haiku".into())
        );
    }

    #[test]
    fn blank_lines_do_nothing() {
        assert_eq!(Command::parse("   "), Command::Empty);
    }

    #[test]
    fn todo_commands() {
        assert_eq!(
            Command::parse("/todo add buy milk"),
            Command::TodoAdd("buy milk".into())
        );
        assert_eq!(Command::parse("/todo"), Command::TodoList);
        assert_eq!(Command::parse("/todo done 2"), Command::TodoToggle(2));
        assert_eq!(
            Command::parse("/todo rename 1 call dentist"),
            Command::TodoRename {
                index: 1,
                title: "call dentist".into()
            }
        );
        assert_eq!(Command::parse("/todo rm 3"), Command::TodoDelete(3));
    }

    #[test]
    fn file_commands() {
        assert_eq!(
            Command::parse("/file add a.html <p/>"),
            Command::FileAdd {
                name: "a.html".into(),
                content: "<p/>".into()
            }
        );
        assert_eq!(
            Command::parse("/file update 1 b.html <b/>"),
            Command::FileUpdate {
                index: 1,
                name: "b.html".into(),
                content: "<b/>".into()
            }
        );
        assert_eq!(Command::parse("/file rm 1"), Command::FileDelete(1));
    }

    #[test]
    fn edit_needs_index_and_text() {
        assert_eq!(
            Command::parse("/edit 2 better answer"),
            Command::EditResponse {
                index: 2,
                text: "better answer".into()
            }
        );
        assert!(matches!(Command::parse("/edit 2"), Command::Unknown(_)));
        assert!(matches!(Command::parse("/edit x y"), Command::Unknown(_)));
    }

    #[test]
    fn bad_indices_are_rejected() {
        assert!(matches!(
            Command::parse("/todo done two"),
            Command::Unknown(_)
        ));
        assert!(matches!(Command::parse("/file show"), Command::Unknown(_)));
    }

    #[test]
    fn error_copy_matches_failure_class() {
        assert!(format_provider_error("error sending request: connection refused")
            .contains("ollama serve"));
        assert!(format_provider_error("pull model manifest: file does not exist")
            .contains("ollama pull"));
        assert!(format_provider_error("weird").starts_with("Generation failed."));
    }
}
