use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weft_credential::{Credential, MemoryDirectory};
use weft_engine::{EngineConfig, ExecutionResult, WorkflowEngine};
use weft_platform::PlatformRegistry;
use weft_resolver::{Binder, StandardBinder};
use weft_service::WorkflowService;
use weft_store::{
  DefinitionFilter, DefinitionStatus, DefinitionStore, NewDefinition, PageRequest, SqliteStore,
};

/// Weft - declarative LLM workflows compiled and run from the command line
#[derive(Parser)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.weft)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile and run a graph file without storing it
  Test {
    /// Path to the graph document (JSON)
    graph_file: PathBuf,

    /// Read credentials from this JSON file instead of the database
    #[arg(long)]
    credentials: Option<PathBuf>,

    #[command(flatten)]
    exec: ExecArgs,
  },

  /// Run a stored workflow definition
  Run {
    /// Definition id
    id: i64,

    #[command(flatten)]
    exec: ExecArgs,
  },

  /// Manage workflow definitions
  Definition {
    #[command(subcommand)]
    action: DefinitionAction,
  },

  /// Manage platform credentials
  Credential {
    #[command(subcommand)]
    action: CredentialAction,
  },
}

#[derive(Args)]
struct ExecArgs {
  /// Input variables as a JSON object file (default: stdin)
  #[arg(long)]
  vars: Option<PathBuf>,

  /// Run nodes one at a time instead of level by level
  #[arg(long)]
  sequential: bool,

  /// Timeout for nodes that do not set their own, in milliseconds
  #[arg(long)]
  timeout_ms: Option<u64>,
}

impl ExecArgs {
  fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      parallel: !self.sequential,
      node_timeout: self.timeout_ms.map(Duration::from_millis),
    }
  }
}

#[derive(Subcommand)]
enum DefinitionAction {
  /// Create a definition
  Create {
    name: String,

    /// Unique definition key
    #[arg(long)]
    key: Option<String>,

    #[arg(long)]
    remark: Option<String>,

    /// Initial graph document
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Create the definition disabled
    #[arg(long)]
    disabled: bool,
  },

  /// Replace a definition's graph
  UpdateGraph { id: i64, graph_file: PathBuf },

  /// Print a definition
  Show { id: i64 },

  /// List definitions
  List {
    /// Name substring
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    key: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 20)]
    page_size: u32,
  },

  /// Delete a definition
  Delete { id: i64 },
}

#[derive(Subcommand)]
enum CredentialAction {
  /// Add or replace a credential
  Add {
    id: i64,

    /// Platform tag, e.g. OpenAI or echo
    #[arg(long)]
    platform: String,

    #[arg(long, env = "WEFT_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, default_value = "")]
    name: String,

    #[arg(long)]
    base_url: Option<String>,
  },

  /// Print a credential with its secret redacted
  Show { id: i64 },

  /// List credentials with their secrets redacted
  List,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weft=info,warn")),
    )
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".weft"),
  };

  let Some(command) = cli.command else {
    println!("weft - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { dispatch(command, &data_dir).await })
}

async fn dispatch(command: Commands, data_dir: &Path) -> Result<()> {
  let store = open_store(data_dir).await?;

  match command {
    Commands::Test {
      graph_file,
      credentials,
      exec,
    } => {
      let graph_text = read_file(&graph_file).await?;
      let inputs = read_variables(exec.vars.as_deref()).await?;
      let engine = WorkflowEngine::new(exec.engine_config());
      let platforms = PlatformRegistry::global();

      let result = match credentials {
        Some(path) => {
          let directory = load_credentials(&path).await?;
          let service =
            WorkflowService::new(store, StandardBinder::new(directory, platforms), engine);
          run_test(&service, &graph_text, inputs).await?
        }
        None => {
          let binder = StandardBinder::new(store.clone(), platforms);
          let service = WorkflowService::new(store, binder, engine);
          run_test(&service, &graph_text, inputs).await?
        }
      };
      print_result(&result)
    }
    Commands::Run { id, exec } => {
      let inputs = read_variables(exec.vars.as_deref()).await?;
      let binder = StandardBinder::with_global_platforms(store.clone());
      let service = WorkflowService::new(store, binder, WorkflowEngine::new(exec.engine_config()));

      let cancel = cancel_on_ctrl_c();
      let result = service
        .run_definition(id, inputs, cancel)
        .await
        .with_context(|| format!("failed to run workflow definition {}", id))?;
      print_result(&result)
    }
    Commands::Definition { action } => definition_command(store, action).await,
    Commands::Credential { action } => credential_command(store, action).await,
  }
}

async fn run_test<S, B>(
  service: &WorkflowService<S, B>,
  graph_text: &str,
  inputs: serde_json::Map<String, serde_json::Value>,
) -> Result<ExecutionResult>
where
  S: DefinitionStore,
  B: Binder,
{
  let cancel = cancel_on_ctrl_c();
  service
    .test(graph_text, inputs, cancel)
    .await
    .context("workflow test failed")
}

async fn definition_command(store: SqliteStore, action: DefinitionAction) -> Result<()> {
  let binder = StandardBinder::with_global_platforms(store.clone());
  let service = WorkflowService::new(store, binder, WorkflowEngine::default());

  match action {
    DefinitionAction::Create {
      name,
      key,
      remark,
      graph,
      disabled,
    } => {
      let graph_text = match graph {
        Some(path) => read_file(&path).await?,
        None => String::new(),
      };
      let definition = NewDefinition {
        name,
        definition_key: key,
        graph_text,
        remark,
        status: if disabled {
          DefinitionStatus::Disabled
        } else {
          DefinitionStatus::Enabled
        },
      };
      let id = service
        .create_definition(definition)
        .await
        .context("failed to create definition")?;
      println!("{}", id);
    }
    DefinitionAction::UpdateGraph { id, graph_file } => {
      let graph_text = read_file(&graph_file).await?;
      // Reject documents that do not even parse before storing them.
      weft_config::parse(&graph_text)
        .with_context(|| format!("invalid graph document: {}", graph_file.display()))?;
      service
        .update_graph(id, &graph_text)
        .await
        .with_context(|| format!("failed to update graph of definition {}", id))?;
      eprintln!("Updated graph of definition {}", id);
    }
    DefinitionAction::Show { id } => {
      let definition = service
        .get_definition(id)
        .await?
        .with_context(|| format!("workflow definition {} does not exist", id))?;
      println!("{}", serde_json::to_string_pretty(&definition)?);
    }
    DefinitionAction::List {
      name,
      key,
      page,
      page_size,
    } => {
      let filter = DefinitionFilter {
        name,
        definition_key: key,
        status: None,
      };
      let page = service
        .list_definitions(&filter, PageRequest::new(page, page_size))
        .await?;
      eprintln!("{} definition(s) total", page.total);
      for definition in page.items {
        println!(
          "{}\t{}\t{}\t{:?}",
          definition.id,
          definition.definition_key.as_deref().unwrap_or("-"),
          definition.name,
          definition.status
        );
      }
    }
    DefinitionAction::Delete { id } => {
      service
        .delete_definition(id)
        .await
        .with_context(|| format!("failed to delete definition {}", id))?;
      eprintln!("Deleted definition {}", id);
    }
  }

  Ok(())
}

async fn credential_command(store: SqliteStore, action: CredentialAction) -> Result<()> {
  match action {
    CredentialAction::Add {
      id,
      platform,
      api_key,
      name,
      base_url,
    } => {
      let registry = PlatformRegistry::global();
      if !registry.contains(&platform) {
        eprintln!(
          "warning: no strategy registered for platform '{}' (known: {})",
          platform,
          registry.platforms().join(", ")
        );
      }
      let credential = Credential {
        id,
        name,
        platform,
        api_key,
        base_url,
      };
      store.upsert_credential(&credential).await?;
      eprintln!("Stored credential {:?}", credential);
    }
    CredentialAction::Show { id } => {
      let credential = store
        .get_credential(id)
        .await?
        .with_context(|| format!("credential {} does not exist", id))?;
      println!("{:#?}", credential);
    }
    CredentialAction::List => {
      for credential in store.list_credentials().await? {
        println!("{:?}", credential);
      }
    }
  }

  Ok(())
}

async fn open_store(data_dir: &Path) -> Result<SqliteStore> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let db_path = data_dir.join("weft.db");
  let options = SqliteConnectOptions::new()
    .filename(&db_path)
    .create_if_missing(true);
  let pool = SqlitePoolOptions::new()
    .connect_with(options)
    .await
    .with_context(|| format!("failed to open database: {}", db_path.display()))?;

  let store = SqliteStore::new(pool);
  store.migrate().await.context("failed to migrate database")?;
  info!(path = %db_path.display(), "store_opened");
  Ok(store)
}

async fn load_credentials(path: &Path) -> Result<MemoryDirectory> {
  let content = read_file(path).await?;
  let credentials: Vec<Credential> = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse credentials file: {}", path.display()))?;
  Ok(MemoryDirectory::from_credentials(credentials))
}

async fn read_file(path: &Path) -> Result<String> {
  tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Cancel the returned token when Ctrl-C is pressed.
fn cancel_on_ctrl_c() -> CancellationToken {
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Cancelling...");
      trigger.cancel();
    }
  });
  cancel
}

fn print_result(result: &ExecutionResult) -> Result<()> {
  eprintln!("Execution completed: {}", result.execution_id);
  eprintln!("Nodes executed: {}", result.node_results.len());
  println!("{}", serde_json::to_string_pretty(&result.output)?);
  Ok(())
}

async fn read_variables(path: Option<&Path>) -> Result<serde_json::Map<String, serde_json::Value>> {
  let value = match path {
    Some(path) => {
      let content = read_file(path).await?;
      serde_json::from_str(&content)
        .with_context(|| format!("failed to parse variables file: {}", path.display()))?
    }
    None => read_variables_from_stdin()?,
  };

  match value {
    serde_json::Value::Object(map) => Ok(map),
    other => bail!("input variables must be a JSON object, got {}", other),
  }
}

fn read_variables_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read variables from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse variables JSON from stdin")
    }
  }
}
