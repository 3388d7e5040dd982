//! `aquagreen`: command-line client for the AquaGreen monitoring API.
//!
//! The session is kept in the configured storage file, so `login` once and
//! later commands reuse (and transparently refresh) the credentials.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use aquagreen_client::api::{
    parse_resource_id, CropImageFilter, CropImageUpload, Credentials, DashboardClient, FileUpload,
    MetadataEntry, RegisterRequest, RegistrationOutcome,
};
use aquagreen_client::columns::{template_csv, transform_to_standard_format, validate_against_standard};
use aquagreen_client::config::{load_config, validate_config, ClientConfig, ConfigError};
use aquagreen_client::http::{AuthPipeline, ReqwestTransport, SessionObserver};
use aquagreen_client::observability::logging;
use aquagreen_client::session::{
    ActivityEvent, FileStorage, InactivityMonitor, SessionContext, SessionStorage,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "aquagreen")]
#[command(about = "Command-line client for the AquaGreen monitoring API", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(short, long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        username: String,
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Drop the stored session
    Logout,
    /// Show the logged-in user's profile
    Whoami,
    /// Excel file operations
    Files {
        #[command(subcommand)]
        command: FileCommands,
    },
    /// Show a file's processed rows
    Data {
        id: String,
        /// Reshape rows to the standard columns
        #[arg(long)]
        standard: bool,
    },
    /// CSV sample sheet operations
    Csv {
        #[command(subcommand)]
        command: CsvCommands,
    },
    /// Crop image operations
    Crops {
        #[command(subcommand)]
        command: CropCommands,
    },
    /// Standard column schema tools
    Columns {
        #[command(subcommand)]
        command: ColumnCommands,
    },
    /// Keep the session alive while input arrives; log out when idle
    Watch,
}

#[derive(Subcommand)]
enum FileCommands {
    List,
    Show { id: String },
    Upload { title: String, path: PathBuf },
    Process { id: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum CsvCommands {
    List,
    Show { id: String },
    Upload { title: String, path: PathBuf },
    Process { id: String },
}

#[derive(Subcommand)]
enum CropCommands {
    List {
        #[arg(long)]
        csv_file: Option<String>,
        #[arg(long)]
        sample_id: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },
    Show {
        id: String,
    },
    Upload {
        #[arg(long)]
        csv_file: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    Labels,
    /// Attach `label=value` pairs to an image
    AddMetadata {
        id: String,
        #[arg(required = true)]
        entries: Vec<MetadataEntry>,
    },
}

#[derive(Subcommand)]
enum ColumnCommands {
    /// Print the CSV template header
    Template,
    /// Check a JSON array of rows against the standard columns
    Check { path: PathBuf },
}

/// Reports an expired session on the terminal.
struct TerminalObserver;

impl SessionObserver for TerminalObserver {
    fn session_expired(&self, message: &str) {
        eprintln!("{message}");
    }

    fn redirect_to_login(&self) {
        eprintln!("Run `aquagreen login <username> --password <password>` to continue.");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load(cli: &Cli) -> Result<ClientConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

async fn run(cli: Cli) -> CliResult {
    let config = load(&cli)?;
    logging::init(&config.observability);

    tracing::debug!(
        base_url = %config.api.base_url,
        storage = %config.session.storage_path.display(),
        "Configuration loaded"
    );

    let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::open(&config.session.storage_path)?);
    let session = Arc::new(SessionContext::restore(storage));
    if config.session.clear_on_start {
        session.clear_auth();
    }

    let transport = ReqwestTransport::new(&config.api)?;
    let pipeline = AuthPipeline::new(Arc::new(transport), session.clone())
        .with_observer(Arc::new(TerminalObserver));
    let client = DashboardClient::new(Arc::new(pipeline), &config);

    match cli.command {
        Commands::Login { username, password } => {
            let profile = client.login(&Credentials { username, password }).await?;
            print_json(profile.as_json())?;
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let request = RegisterRequest {
                username,
                email,
                password,
            };
            match client.register(&request).await? {
                RegistrationOutcome::LoggedIn(profile) => print_json(profile.as_json())?,
                RegistrationOutcome::VerificationRequired { message } => println!(
                    "{}",
                    message.unwrap_or_else(|| "Verify your email address to finish".to_string())
                ),
            }
        }
        Commands::Logout => client.logout(),
        Commands::Whoami => {
            if !session.is_authenticated() {
                return Err("Not logged in".into());
            }
            print_json(client.fetch_profile().await?.as_json())?;
        }
        Commands::Files { command } => files(&client, command).await?,
        Commands::Data { id, standard } => {
            let rows = client.fetch_processed_data(parse_resource_id(&id)?).await;
            if let Some(error) = client.snapshot().last_error {
                eprintln!("Warning: {error}");
            }
            if standard {
                if let Some(message) = validate_against_standard(&rows).message() {
                    eprintln!("Warning: {message}");
                }
                print_json(&transform_to_standard_format(&rows))?;
            } else {
                print_json(&rows)?;
            }
        }
        Commands::Csv { command } => csv(&client, command).await?,
        Commands::Crops { command } => crops(&client, command).await?,
        Commands::Columns { command } => match command {
            ColumnCommands::Template => println!("{}", template_csv()),
            ColumnCommands::Check { path } => {
                let rows: Vec<Value> = serde_json::from_slice(&tokio::fs::read(path).await?)?;
                let check = validate_against_standard(&rows);
                match check.message() {
                    Some(message) => return Err(message.into()),
                    None => println!("All required columns present"),
                }
            }
        },
        Commands::Watch => watch(&config, session).await?,
    }

    Ok(())
}

async fn files(client: &DashboardClient, command: FileCommands) -> CliResult {
    match command {
        FileCommands::List => print_json(&client.list_files().await?),
        FileCommands::Show { id } => print_json(&client.get_file(parse_resource_id(&id)?).await?),
        FileCommands::Upload { title, path } => {
            print_json(&client.upload_file(&FileUpload::new(title, path)).await?)
        }
        FileCommands::Process { id } => {
            print_json(&client.process_file(parse_resource_id(&id)?).await?)
        }
        FileCommands::Delete { id } => {
            let id = parse_resource_id(&id)?;
            client.delete_file(id).await?;
            println!("Deleted file {id}");
            Ok(())
        }
    }
}

async fn csv(client: &DashboardClient, command: CsvCommands) -> CliResult {
    match command {
        CsvCommands::List => print_json(&client.list_csv_files().await?),
        CsvCommands::Show { id } => {
            print_json(&client.get_csv_file(parse_resource_id(&id)?).await?)
        }
        CsvCommands::Upload { title, path } => {
            print_json(&client.upload_csv_file(&FileUpload::new(title, path)).await?)
        }
        CsvCommands::Process { id } => {
            print_json(&client.process_csv_file(parse_resource_id(&id)?).await?)
        }
    }
}

async fn crops(client: &DashboardClient, command: CropCommands) -> CliResult {
    match command {
        CropCommands::List {
            csv_file,
            sample_id,
            label,
            value,
        } => {
            let filter = CropImageFilter {
                csv_file: csv_file.as_deref().map(parse_resource_id).transpose()?,
                sample_id,
                metadata_label: label,
                metadata_value: value,
            };
            print_json(&client.list_crop_images(&filter).await?)
        }
        CropCommands::Show { id } => {
            print_json(&client.get_crop_image(parse_resource_id(&id)?).await?)
        }
        CropCommands::Upload {
            csv_file,
            prefix,
            images,
        } => {
            let upload = CropImageUpload {
                csv_file: csv_file.as_deref().map(parse_resource_id).transpose()?,
                sample_id_prefix: prefix,
                images,
            };
            print_json(&client.upload_crop_images(&upload).await?)
        }
        CropCommands::Labels => print_json(&client.metadata_labels().await),
        CropCommands::AddMetadata { id, entries } => {
            print_json(&client.add_metadata(parse_resource_id(&id)?, &entries).await?)
        }
    }
}

/// Treat each stdin line as a key press until idle logout, EOF or Ctrl-C.
async fn watch(config: &ClientConfig, session: Arc<SessionContext>) -> CliResult {
    if !session.is_authenticated() {
        return Err("Not logged in".into());
    }

    let logged_out = Arc::new(Notify::new());
    let notify = logged_out.clone();
    let handle = InactivityMonitor::new(
        session,
        config.session.inactivity_timeout(),
        config.session.check_interval(),
    )
    .start(move || notify.notify_one());

    eprintln!(
        "Watching for inactivity ({} min). Press Enter to stay active, Ctrl-C to stop.",
        config.session.inactivity_timeout().as_secs() / 60
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(_) => handle.notify(ActivityEvent::KeyPress),
                None => break,
            },
            _ = logged_out.notified() => {
                eprintln!("Logged out after inactivity");
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.join().await;
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
