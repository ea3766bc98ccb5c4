//! Command-line demo of the optimistic todo list.
//!
//! Without arguments it runs a scripted walkthrough: two additions confirmed
//! out of order, a toggle, a delete and a withdrawn addition, then the
//! deferred profile. With `--interactive` it reads commands from stdin and
//! re-renders the list whenever the store changes.

use anyhow::{Context, Result, bail};
use clap::Parser;
use optimist_core::environment::SystemClock;
use optimist_runtime::{Store, StoreConfig};
use optimistic_todo::{
    Backend, ProfileAction, ProfileEnvironment, ProfileReducer, ProfileState, SimulatedBackend,
    TodoAction, TodoConfig, TodoEnvironment, TodoId, TodoReducer, TodoState, render,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type TodoStore = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;
type ProfileStore = Store<ProfileState, ProfileAction, ProfileEnvironment, ProfileReducer>;

/// Optimistic todo list demo
#[derive(Debug, Parser)]
#[command(name = "optimistic-todo", version)]
struct Cli {
    /// Read commands from stdin instead of running the scripted walkthrough
    #[arg(short, long)]
    interactive: bool,
}

const HELP: &str = "commands: add <text> | toggle <id> | delete <id> | list | json | profile | help | quit";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = TodoConfig::from_env().context("invalid configuration")?;
    init_tracing(&config);

    let backend: Arc<dyn Backend> = Arc::new(SimulatedBackend::new());
    let store_config = StoreConfig::default().with_shutdown_timeout(config.shutdown_timeout);

    let todos: TodoStore = Store::with_config(
        TodoState::seeded(),
        TodoReducer::new(),
        TodoEnvironment::new(Arc::new(SystemClock), Arc::clone(&backend)).with_config(&config),
        store_config.clone(),
    );
    let profile: ProfileStore = Store::with_config(
        ProfileState::default(),
        ProfileReducer,
        ProfileEnvironment::new(backend, config.profile_delay),
        store_config,
    );

    tracing::info!(
        add_delay = ?config.add_delay,
        delete_delay = ?config.delete_delay,
        "Starting optimistic todo demo"
    );

    if cli.interactive {
        interactive(&todos, &profile).await
    } else {
        scripted(&todos, &profile, &config).await
    }
}

fn init_tracing(config: &TodoConfig) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn print_list(store: &TodoStore) {
    let (list, button) = store
        .state(|s| (render::todo_list(s), render::form(&s.form)))
        .await;
    println!("{list}[{button}]\n");
}

async fn scripted(todos: &TodoStore, profile: &ProfileStore, config: &TodoConfig) -> Result<()> {
    println!("=== Optimistic Todo ===\n");
    print_list(todos).await;

    println!("Submitting two todos; the second confirms first...");
    let mut slow = todos.send(TodoAction::submit("Write the report")).await?;
    let mut quick = todos
        .send(TodoAction::submit_after("Quick note", config.add_delay / 3))
        .await?;
    print_list(todos).await;

    quick.wait().await;
    println!("'Quick note' confirmed:");
    print_list(todos).await;

    slow.wait().await;
    println!("'Write the report' confirmed:");
    print_list(todos).await;

    println!("Toggling #1 and deleting #2...");
    todos.send(TodoAction::toggle(TodoId::new(1))).await?;
    let mut deleting = todos.send(TodoAction::delete(TodoId::new(2))).await?;
    print_list(todos).await;
    deleting.wait().await;

    println!("Submitting and immediately withdrawing a todo...");
    todos.send(TodoAction::submit("Never mind")).await?;
    let withdrawn = todos
        .state(|s| s.in_flight.last().map(|t| t.id))
        .await
        .context("submission was not staged")?;
    todos.send(TodoAction::delete(withdrawn)).await?;
    print_list(todos).await;

    println!("Loading profile...");
    let mut loading = profile.send(ProfileAction::Load { user_id: 1 }).await?;
    println!("{}\n", profile.state(render::profile).await);
    loading.wait().await;
    println!("{}\n", profile.state(render::profile).await);

    todos.shutdown_default().await?;
    profile.shutdown_default().await?;
    println!("=== Demo Complete ===");
    Ok(())
}

/// One line of interactive input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Add(String),
    Toggle(TodoId),
    Delete(TodoId),
    List,
    Json,
    Profile,
    Help,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let id = || {
            rest.parse::<TodoId>()
                .with_context(|| format!("expected a todo id, got {rest:?}"))
        };

        Ok(match word {
            "add" | "a" => Self::Add(rest.to_string()),
            "toggle" | "t" => Self::Toggle(id()?),
            "delete" | "d" | "rm" => Self::Delete(id()?),
            "list" | "ls" | "" => Self::List,
            "json" => Self::Json,
            "profile" => Self::Profile,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => bail!("unknown command {other:?}"),
        })
    }
}

async fn interactive(todos: &TodoStore, profile: &ProfileStore) -> Result<()> {
    println!("{HELP}\n");
    print_list(todos).await;

    let list_watcher = {
        let store = todos.clone();
        let mut changes = todos.subscribe_changes();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                print_list(&store).await;
            }
        })
    };
    let profile_watcher = {
        let store = profile.clone();
        let mut changes = profile.subscribe_changes();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                println!("{}\n", store.state(render::profile).await);
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(error) => {
                println!("{error:#}\n{HELP}");
                continue;
            },
        };

        match command {
            Command::Add(text) => {
                todos.send(TodoAction::submit(text)).await?;
            },
            Command::Toggle(id) => {
                todos.send(TodoAction::toggle(id)).await?;
            },
            Command::Delete(id) => {
                todos.send(TodoAction::delete(id)).await?;
            },
            Command::List => print_list(todos).await,
            Command::Json => {
                let visible = todos.state(TodoState::visible_list).await;
                println!("{}", serde_json::to_string_pretty(&visible)?);
            },
            Command::Profile => {
                profile.send(ProfileAction::Load { user_id: 1 }).await?;
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    list_watcher.abort();
    profile_watcher.abort();

    let dropped = todos.teardown() + profile.teardown();
    if dropped > 0 {
        println!("Discarded {dropped} unconfirmed change(s)");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            "add Buy milk".parse::<Command>().unwrap(),
            Command::Add("Buy milk".to_string())
        );
        assert_eq!("toggle #3".parse::<Command>().unwrap(), Command::Toggle(TodoId::new(3)));
        assert_eq!("rm 2".parse::<Command>().unwrap(), Command::Delete(TodoId::new(2)));
        assert_eq!("".parse::<Command>().unwrap(), Command::List);
        assert_eq!(" quit ".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn parses_flags() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        assert!(!Cli::try_parse_from(["optimistic-todo"]).unwrap().interactive);
        assert!(Cli::try_parse_from(["optimistic-todo", "-i"]).unwrap().interactive);
        assert!(
            Cli::try_parse_from(["optimistic-todo", "--interactive"])
                .unwrap()
                .interactive
        );
        assert!(Cli::try_parse_from(["optimistic-todo", "--verbose"]).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!("delete soon".parse::<Command>().is_err());
        assert!("launch".parse::<Command>().is_err());
    }
}
