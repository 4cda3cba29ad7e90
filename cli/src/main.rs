mod actions;
mod config;
mod editor;
mod mcp;
mod render;
mod repl;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use kunja_core::{AuthRepository, VikunjaRepository};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::actions::{EditArgs, Services, NO_TOKEN};
use crate::config::{Config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "kunja")]
#[command(about = "A command line client for the Vikunja task manager", long_about = None)]
#[command(version)]
struct Cli {
    /// Raw JSON output and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Username for login
    #[arg(short, long, global = true)]
    username: Option<String>,

    /// Password for login
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// API base URL, e.g. https://tasks.example.com/api/v1
    #[arg(short = 'b', long = "baseurl", global = true)]
    base_url: Option<String>,

    /// Include done tasks
    #[arg(short, long, global = true)]
    all: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List tasks sorted by urgency (the default)
    List,
    /// Create a new task
    New {
        /// Task title
        #[arg(required = true, trailing_var_arg = true)]
        title: Vec<String>,
        /// Due date: YYYY-MM-DD, today, tom, eow, eom, +3d, fri, 2:fri
        #[arg(short, long)]
        due: Option<String>,
        /// Project ID (falls back to default_project, then asks)
        #[arg(short = 'P', long)]
        project: Option<i64>,
    },
    /// Toggle the done status of a task
    Done { id: i64 },
    /// Delete a task
    Delete { id: i64 },
    /// Show a task as JSON
    Show { id: i64 },
    /// Edit a task with flags, or interactively when none are given
    Edit {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
        /// Move the task to another project
        #[arg(short = 'P', long)]
        project: Option<i64>,
    },
    /// List projects
    Projects,
    /// Create a project
    ProjectNew {
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Delete a project
    ProjectDel { id: i64 },
    /// Show the owner and the users a project is shared with
    ProjectUsers { id: i64 },
    /// List the users assigned to a task
    Assigned { id: i64 },
    /// Assign a user to a task
    Assign { task_id: i64, user_id: i64 },
    /// List users
    Users,
    /// Log in and store the token in the config file
    Login {
        /// One-time password when two-factor auth is enabled
        #[arg(long)]
        totp: Option<String>,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Read commands line by line
    Repl,
    /// Run kunja as an MCP server over stdio
    Mcp {
        /// Log file, empty to disable (default: <config dir>/kunja-mcp.log)
        #[arg(short, long)]
        log: Option<String>,
        /// Print the available tools and exit
        #[arg(long)]
        list_tools: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Some(Commands::Mcp { log, list_tools: false }) => mcp_log_path(log.as_deref())?,
        _ => None,
    };
    init_tracing(cli.verbose, log_file.as_deref())?;

    run(cli)
}

/// `RUST_LOG` when set and valid, else warn (debug with `-v`).
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    rust_log
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.to_string()))
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(verbose, rust_log.as_deref());

    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(io::stderr.and(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

fn mcp_log_path(flag: Option<&str>) -> Result<Option<PathBuf>> {
    match flag.map(str::trim) {
        Some("") => Ok(None),
        Some(path) => Ok(Some(PathBuf::from(path))),
        None => Ok(Some(config::get_config_dir()?.join("kunja-mcp.log"))),
    }
}

fn run(cli: Cli) -> Result<()> {
    let file_config = config::load_config()?;
    let overrides = Overrides {
        base_url: cli.base_url.clone(),
        username: cli.username.clone(),
        password: cli.password.clone(),
    };
    let settings = file_config.clone().with_env().with_overrides(&overrides);
    let command = cli.command.unwrap_or(Commands::List);

    match command {
        Commands::Login { totp } => return login(file_config, &settings, totp.as_deref().unwrap_or("")),
        Commands::Config { action } => return handle_config(action, file_config),
        Commands::Mcp { list_tools: true, .. } => {
            print!("{}", mcp::tool_catalogue());
            return Ok(());
        }
        _ => {}
    }

    if settings.token.is_empty() {
        bail!(NO_TOKEN);
    }

    let services = match command {
        Commands::Mcp { .. } => {
            let rt = tokio::runtime::Runtime::new()?;
            return rt.block_on(mcp::start_server(settings));
        }
        Commands::Repl => return run_repl(),
        _ => Services::connect(&settings)?,
    };

    match command {
        Commands::List => {
            print!("{}", actions::task_list(&services.tasks, cli.verbose, cli.all)?);
        }
        Commands::New { title, due, project } => {
            let project_id = match project.or(settings.default_project).filter(|id| *id > 0) {
                Some(id) => id,
                None => {
                    let projects = services.projects.list()?;
                    editor::pick_project(&mut io::stdin().lock(), &mut io::stdout(), &projects)?
                }
            };
            let msg = actions::create_task(&services.tasks, &title.join(" "), due.as_deref(), project_id)?;
            println!("{}", msg);
        }
        Commands::Done { id } => {
            println!("{}", actions::toggle_done(&services.tasks, id)?);
        }
        Commands::Delete { id } => {
            services.tasks.delete_task(id)?;
            println!("Task deleted successfully");
        }
        Commands::Show { id } => {
            let task = services.tasks.get_task(id)?;
            print!("{}", render::pretty_json(&task)?);
        }
        Commands::Edit { id, title, description, due, project } => {
            let args = EditArgs {
                title: title.as_deref(),
                description: description.as_deref(),
                due: due.as_deref(),
                project_id: project,
            };
            let patch = args.to_patch()?;
            if patch.is_empty() {
                let mut task = services.tasks.get_task(id)?;
                editor::edit_task_interactively(
                    &mut task,
                    &mut io::stdin().lock(),
                    &mut io::stdout(),
                    editor::edit_in_editor,
                )?;
                services.tasks.update_task(&task)?;
                println!("Task updated successfully");
            } else {
                println!("{}", actions::edit_task(&services.tasks, id, &patch)?);
            }
        }
        Commands::Projects => {
            print!("{}", actions::project_list(&services.projects, cli.verbose, true)?);
        }
        Commands::ProjectNew { name } => {
            println!("{}", actions::create_project(&services.projects, &name.join(" "))?);
        }
        Commands::ProjectDel { id } => {
            services.projects.delete(id)?;
            println!("Project deleted.");
        }
        Commands::ProjectUsers { id } => {
            let project = services.projects.get(id)?;
            let users = services.projects.users(id)?;
            if cli.verbose {
                print!("{}", render::pretty_json(&users)?);
            } else {
                print!("{}", render::project_users(&project, &users));
            }
        }
        Commands::Assigned { id } => {
            let assignees = services.tasks.assignees(id)?;
            if cli.verbose {
                print!("{}", render::pretty_json(&assignees)?);
            } else {
                print!("{}", render::user_list(&assignees));
            }
        }
        Commands::Assign { task_id, user_id } => {
            services.tasks.assign_user(task_id, user_id)?;
            println!("User {} assigned to task {}", user_id, task_id);
        }
        Commands::Users => {
            let users = services.users.list()?;
            if cli.verbose {
                print!("{}", render::pretty_json(&users)?);
            } else {
                print!("{}", render::user_list(&users));
            }
        }
        Commands::Login { .. } | Commands::Config { .. } | Commands::Repl | Commands::Mcp { .. } => {}
    }
    Ok(())
}

fn login(mut file_config: Config, settings: &Config, totp: &str) -> Result<()> {
    if settings.username.is_empty() || settings.password.is_empty() || settings.base_url.is_empty() {
        bail!("username, password and baseurl must be set (flags, env or config)");
    }

    let repo = VikunjaRepository::new(&settings.base_url, "")?;
    let token = repo.login(&settings.username, &settings.password, totp)?;

    file_config.token = token;
    file_config.base_url = settings.base_url.clone();
    file_config.username = settings.username.clone();
    config::save_config(&file_config)?;

    println!("Login successful – token saved to config.");
    Ok(())
}

fn handle_config(action: ConfigAction, mut file_config: Config) -> Result<()> {
    match action {
        ConfigAction::Get { key } => match config::get_config_value(&file_config, &key) {
            Some(value) => println!("{}", value),
            None => bail!("Unknown config key: {}", key),
        },
        ConfigAction::Set { key, value } => {
            config::set_config_value(&mut file_config, &key, &value)?;
            config::save_config(&file_config)?;
            let shown = if key == "password" || key == "token" { "********" } else { value.as_str() };
            println!("Set {} = {}", key, shown);
        }
        ConfigAction::Path => {
            println!("{}", config::get_config_file()?.display());
        }
    }
    Ok(())
}

fn run_repl() -> Result<()> {
    let history = config::get_config_dir()?.join("cmd.history");
    let repl = repl::Repl::new(Some(history));

    repl.run(&mut io::stdin().lock(), &mut io::stdout(), |words| {
        let args = std::iter::once("kunja".to_string()).chain(words);
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(e) => {
                e.print()?;
                return Ok(());
            }
        };
        if matches!(cli.command, Some(Commands::Repl) | Some(Commands::Mcp { .. })) {
            bail!("not available inside the REPL");
        }
        run(cli)
    })
}
