//! Grant Matrix CLI
//!
//! Command-line front end for editing a group's page/role grants.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grant_matrix::bridge::encode_grants;
use grant_matrix::client::{BackendConfig, HttpBackend, MatrixBackend};
use grant_matrix::panels::{PagePanelView, RolePanelView};
use grant_matrix::{Catalog, GroupFields, MatrixEditor, MatrixError, PageId, RoleId};

#[derive(Parser)]
#[command(name = "grant-matrix")]
#[command(about = "Page/role permission matrix editor")]
#[command(version)]
struct Cli {
    /// Backend base URL [default: $GRANT_MATRIX_BASE_URL]
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token for the backend [default: $GRANT_MATRIX_TOKEN]
    #[arg(long)]
    token: Option<String>,

    /// Request timeout in seconds [default: $GRANT_MATRIX_TIMEOUT_SECS or 30]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, env = "GRANT_MATRIX_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pages and their roles
    Catalog,
    /// Show a group's grant matrix
    Show {
        /// Group ID
        #[arg(short, long)]
        group: i64,
    },
    /// Edit a group's grants interactively (omit --group to create one)
    Edit {
        /// Group ID
        #[arg(short, long)]
        group: Option<i64>,
        /// Group name
        #[arg(short, long)]
        name: Option<String>,
        /// Group description
        #[arg(short, long)]
        description: Option<String>,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(false),
            )
            .with(filter)
            .init();
    }
}

/// Environment settings with command-line flags layered on top
fn backend_config(cli: &Cli, env: Option<BackendConfig>) -> anyhow::Result<BackendConfig> {
    let mut config = match (&cli.base_url, env) {
        (Some(url), Some(env)) => BackendConfig {
            base_url: url.clone(),
            ..env
        },
        (Some(url), None) => BackendConfig::new(url.clone()),
        (None, Some(env)) => env,
        (None, None) => {
            anyhow::bail!("no backend URL: pass --base-url or set GRANT_MATRIX_BASE_URL")
        }
    };
    if let Some(token) = cli.token.as_ref().filter(|t| !t.is_empty()) {
        config.token = Some(token.clone());
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.timeout_secs = timeout_secs;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = backend_config(&cli, BackendConfig::from_env())?;
    let backend: Arc<dyn MatrixBackend> =
        Arc::new(HttpBackend::new(config).context("invalid backend configuration")?);

    match cli.command {
        Commands::Catalog => {
            let payload = backend
                .fetch_catalog()
                .await
                .context("failed to load the page catalog")?;
            print_catalog(&Catalog::from(payload));
        }

        Commands::Show { group } => {
            let editor = MatrixEditor::open(backend, group)
                .await
                .with_context(|| format!("failed to open group {}", group))?;
            report_catalog_error(&editor);
            println!("Group #{}: {}", group, editor.fields().group_name);
            print_pages(&editor.page_panel());
            println!("groupPage: {}", encode_grants(&editor.store().snapshot()));
        }

        Commands::Edit {
            group,
            name,
            description,
        } => {
            let mut editor = match group {
                Some(id) => MatrixEditor::open(backend, id)
                    .await
                    .with_context(|| format!("failed to open group {}", id))?,
                None => {
                    MatrixEditor::create(
                        backend,
                        GroupFields::new_group(name.clone().unwrap_or_default(), ""),
                    )
                    .await
                }
            };
            if let Some(name) = name {
                editor.set_group_name(name);
            }
            if let Some(description) = description {
                editor.set_description(description);
            }
            report_catalog_error(&editor);
            interactive(&mut editor).await?;
        }
    }

    Ok(())
}

/// One line of the interactive session
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Quit,
    Help,
    Pages,
    Roles,
    Focus(PageId),
    Role(RoleId),
    /// `None` clicks the checkbox, `Some` forces the page on or off
    Page(PageId, Option<bool>),
    Header,
    /// `None` clicks the header, `Some` forces everything on or off
    All(Option<bool>),
    Name(String),
    Describe(String),
    Status(i32),
    Grants,
    Save,
}

const HELP: &str = "\
Commands:
  pages                  - Show pages
  focus <pageId>         - Show roles of a page
  roles                  - Show roles of the focused page
  role <roleId>          - Toggle a role on the focused page
  page <pageId> [on|off] - Toggle every role of a page
  header                 - Toggle every role of the focused page
  all [on|off]           - Toggle everything, or force it on or off
  name <text>            - Set the group name
  describe <text>        - Set the group description
  status <n>             - Set the group status code
  grants                 - Show the encoded grants
  save                   - Save to the backend
  quit                   - Exit without saving";

/// Parse a non-empty input line; `Err` carries the message to show
fn parse_command(line: &str) -> Result<Command, &'static str> {
    let (cmd, arg) = line
        .trim()
        .split_once(' ')
        .map(|(c, a)| (c, a.trim()))
        .unwrap_or((line.trim(), ""));

    match cmd {
        "quit" | "exit" => Ok(Command::Quit),
        "help" => Ok(Command::Help),
        "pages" => Ok(Command::Pages),
        "roles" => Ok(Command::Roles),
        "header" => Ok(Command::Header),
        "grants" => Ok(Command::Grants),
        "save" => Ok(Command::Save),
        "focus" => parse_id(arg)
            .map(Command::Focus)
            .ok_or("Usage: focus <pageId>"),
        "role" => parse_id(arg)
            .map(Command::Role)
            .ok_or("Usage: role <roleId>"),
        "page" => {
            let mut parts = arg.split_whitespace();
            let id = parts.next().and_then(parse_id);
            let target = parts.next().map(parse_switch);
            match (id, target, parts.next()) {
                (Some(id), None, None) => Ok(Command::Page(id, None)),
                (Some(id), Some(Some(on)), None) => Ok(Command::Page(id, Some(on))),
                _ => Err("Usage: page <pageId> [on|off]"),
            }
        }
        "all" => match arg {
            "" => Ok(Command::All(None)),
            _ => parse_switch(arg)
                .map(|on| Command::All(Some(on)))
                .ok_or("Usage: all [on|off]"),
        },
        "name" if !arg.is_empty() => Ok(Command::Name(arg.to_string())),
        "name" => Err("Usage: name <text>"),
        "describe" => Ok(Command::Describe(arg.to_string())),
        "status" => arg.parse().map(Command::Status).map_err(|_| "Usage: status <n>"),
        _ => Err("Unknown command. Type 'help' for available commands."),
    }
}

fn parse_switch(s: &str) -> Option<bool> {
    match s {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn parse_id(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

async fn interactive(editor: &mut MatrixEditor) -> anyhow::Result<()> {
    println!("Editing grants for '{}'", editor.fields().group_name);
    println!("Type 'help' for commands, 'quit' to exit\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("grants> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Pages => print_pages(&editor.page_panel()),
            Command::Roles => print_roles(&editor.role_panel()),
            Command::Focus(id) => {
                if editor.focus_page(id) {
                    print_roles(&editor.role_panel());
                } else {
                    println!("Unknown page");
                }
            }
            Command::Role(id) => {
                editor.click_role(id);
                print_roles(&editor.role_panel());
            }
            Command::Page(id, target) => {
                match target {
                    Some(on) => editor.store_mut().toggle_page(id, on),
                    None => editor.click_page_checkbox(id),
                }
                print_pages(&editor.page_panel());
            }
            Command::Header => {
                editor.click_role_header();
                print_roles(&editor.role_panel());
            }
            Command::All(target) => {
                match target {
                    Some(on) => editor.store_mut().select_all_pages(on),
                    None => editor.click_all_pages(),
                }
                print_pages(&editor.page_panel());
            }
            Command::Name(name) => editor.set_group_name(name),
            Command::Describe(text) => editor.set_description(text),
            Command::Status(status) => editor.set_status(status),
            Command::Grants => println!("{}", encode_grants(&editor.store().snapshot())),
            Command::Save => match editor.save().await {
                Ok(body) => println!(
                    "Saved '{}' ({} grants)",
                    body.group.group_name,
                    editor.store().len()
                ),
                Err(e) => report_save_error(&e),
            },
        }
    }

    Ok(())
}

fn report_catalog_error(editor: &MatrixEditor) {
    if let Some(message) = editor.catalog_error() {
        eprintln!("Could not load the page catalog: {}", message);
    }
}

fn report_save_error(e: &MatrixError) {
    if e.is_retryable() {
        eprintln!("Save failed: {} (selection kept, try again)", e.user_message());
    } else {
        eprintln!("Save failed: {}", e.user_message());
    }
}

fn print_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        println!("No pages");
        return;
    }
    for page in catalog.pages() {
        println!("#{} {}", page.id, page.name);
        for role in catalog.roles_of(page.id) {
            println!("    #{} {}", role.id, role.name);
        }
    }
}

fn print_pages(view: &PagePanelView) {
    if view.is_empty() {
        println!("No catalog loaded");
        return;
    }
    println!("{} All pages", view.header.glyph());
    for row in &view.rows {
        println!(
            "{} {} #{} {} ({}/{})",
            if row.focused { ">" } else { " " },
            row.check.glyph(),
            row.page_id,
            row.name,
            row.selected_roles,
            row.total_roles
        );
    }
}

fn print_roles(view: &RolePanelView) {
    match view {
        RolePanelView::NoPageFocused => println!("{}", RolePanelView::EMPTY_MESSAGE),
        RolePanelView::Roles {
            page_id,
            page_name,
            header,
            rows,
        } => {
            println!("{} #{} {}", header.glyph(), page_id, page_name);
            if rows.is_empty() {
                println!("    (no roles)");
            }
            for row in rows {
                println!(
                    "    {} #{} {}",
                    if row.checked { "[x]" } else { "[ ]" },
                    row.role_id,
                    row.name
                );
            }
        }
    }
}
