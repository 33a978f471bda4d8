//! meetly - command-line client for meetly-server
//!
//! Signs in, creates and joins meetings, and shows attendance. `join` keeps
//! the session open with a live elapsed-time display until Ctrl+C, then
//! leaves the meeting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meetly_client::{HttpMeetingApi, MeetingSession, SessionConfig};
use meetly_common::api::SubmitFileRequest;
use meetly_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use meetly_common::db::MeetingWithParticipants;
use meetly_common::human_time::{format_duration, format_elapsed};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Session token file inside the root folder
const TOKEN_FILE_NAME: &str = "session_token";

#[derive(Parser, Debug)]
#[command(name = "meetly")]
#[command(about = "Command-line client for meetly meetings")]
#[command(version)]
struct Args {
    /// Path to meetly.toml (default: platform config directory)
    #[arg(short, long, env = "MEETLY_CONFIG")]
    config: Option<PathBuf>,

    /// Server base URL (default: from [server] in meetly.toml)
    #[arg(short, long, env = "MEETLY_SERVER_URL")]
    server: Option<String>,

    /// Bearer token (default: the one saved by `login`)
    #[arg(long, env = "MEETLY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Folder where the session token is saved
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Sign in
    Login { email: String, password: String },
    /// Sign out and forget the saved token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create a meeting and print its join code
    Create {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Join a meeting by code; Ctrl+C leaves
    Join { code: String },
    /// Meetings currently in progress
    Ongoing,
    /// Meetings you host
    Created,
    /// Meetings you took part in
    History,
    /// Attendance report of a meeting you host
    Attendance { meeting_id: String },
    /// Attach a hosted file to a meeting
    Submit {
        meeting_id: String,
        file_url: String,
        file_name: String,
        #[arg(long, default_value = "application/octet-stream")]
        file_type: String,
        #[arg(long, default_value_t = 0)]
        file_size: i64,
    },
    /// List a meeting's submissions
    Submissions { meeting_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,meetly=info,meetly_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let root = RootFolderResolver::new("meetly")
        .with_cli_arg(args.root_folder.clone())
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root);
    let token_path = initializer.root().join(TOKEN_FILE_NAME);

    let token = args.token.clone().or_else(|| read_token(&token_path));
    let server = args
        .server
        .clone()
        .unwrap_or_else(|| config.server.base_url());
    let mut api = HttpMeetingApi::new(&server, token)?;

    match args.command {
        Command::Register {
            username,
            email,
            password,
        } => {
            let auth = api.register(&username, &email, &password).await?;
            initializer.ensure_directory_exists()?;
            save_token(&token_path, &auth.token)?;
            println!("Registered and signed in as {}", auth.user.username);
        }
        Command::Login { email, password } => {
            let auth = api.login(&email, &password).await?;
            initializer.ensure_directory_exists()?;
            save_token(&token_path, &auth.token)?;
            println!("Signed in as {}", auth.user.username);
        }
        Command::Logout => {
            api.logout().await?;
            api.set_token(None);
            if token_path.exists() {
                std::fs::remove_file(&token_path)
                    .with_context(|| format!("Failed to remove {}", token_path.display()))?;
            }
            println!("Signed out");
        }
        Command::Whoami => {
            let user = api.me().await?;
            println!("{} <{}> ({})", user.username, user.email, user.id);
        }
        Command::Create { title, description } => {
            let meeting = api.create_meeting(&title, description).await?;
            println!("Created \"{}\"", meeting.title);
            println!("  code: {}", meeting.code);
            println!("  id:   {}", meeting.id);
        }
        Command::Join { code } => {
            join_until_interrupted(Arc::new(api), &code, SessionConfig::from(&config.tracker))
                .await?;
        }
        Command::Ongoing => print_meetings(&api.ongoing().await?),
        Command::Created => print_meetings(&api.created().await?),
        Command::History => print_meetings(&api.participated().await?),
        Command::Attendance { meeting_id } => {
            let report = api.attendance(&meeting_id).await?;
            println!(
                "{} (host attended {})",
                report.title, report.host_duration_display
            );
            for entry in &report.entries {
                println!(
                    "  {:<20} {:>12} {:>4}%{}{}",
                    entry.username,
                    entry.duration_display,
                    entry.percentage,
                    if entry.is_host { "  host" } else { "" },
                    if entry.low_attendance { "  LOW" } else { "" },
                );
            }
            println!("{} of {} below 50%", report.low_attendance_count(), report.entries.len());
        }
        Command::Submit {
            meeting_id,
            file_url,
            file_name,
            file_type,
            file_size,
        } => {
            let submission = api
                .submit(&SubmitFileRequest {
                    meeting_id,
                    file_url,
                    file_name,
                    file_type,
                    file_size,
                })
                .await?;
            println!("Submitted {} ({} bytes)", submission.file_name, submission.file_size);
        }
        Command::Submissions { meeting_id } => {
            for item in api.submissions(&meeting_id).await? {
                println!(
                    "  {:<20} {} ({}, {} bytes) {}",
                    item.user.username,
                    item.submission.file_name,
                    item.submission.file_type,
                    item.submission.file_size,
                    item.submission.file_url
                );
            }
        }
    }

    Ok(())
}

async fn join_until_interrupted(
    api: Arc<HttpMeetingApi>,
    code: &str,
    config: SessionConfig,
) -> Result<()> {
    let session = MeetingSession::join(api, code, config)
        .await
        .with_context(|| format!("Failed to join meeting {}", code))?;

    println!(
        "In \"{}\" ({}). Press Ctrl+C to leave.",
        session.meeting().title,
        session.meeting().code
    );
    debug!("Room token issued ({} bytes)", session.room_token().len());

    let mut elapsed = session.subscribe_elapsed();
    let mut snapshot = session.subscribe_snapshot();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!("Ctrl+C handler failed: {}", e);
                }
                break;
            }
            Ok(()) = elapsed.changed() => {
                println!("  elapsed {}", format_elapsed(*elapsed.borrow_and_update()));
            }
            Ok(()) = snapshot.changed() => {
                if let Some(meeting) = snapshot.borrow_and_update().as_ref() {
                    println!(
                        "  {} of {} participants connected",
                        meeting.active_count(),
                        meeting.participants.len()
                    );
                }
            }
        }
    }

    let left = session.leave().await.context("Failed to leave meeting")?;
    println!(
        "Left meeting; attended {}",
        format_duration(left.duration_in_secs.max(0) as u64)
    );
    Ok(())
}

fn print_meetings(meetings: &[MeetingWithParticipants]) {
    if meetings.is_empty() {
        println!("No meetings");
        return;
    }
    for m in meetings {
        println!(
            "{}  {:<30} {:>3} participants ({} active)  {}",
            m.meeting.code,
            m.meeting.title,
            m.participants.len(),
            m.active_count(),
            format_duration(m.meeting.duration_in_secs.max(0) as u64)
        );
    }
}

fn read_token(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Write the session token readable by the owner only
fn save_token(path: &Path, token: &str) -> Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to save token to {}", path.display()))?;
    // mode() only applies on creation; tighten a file left by an older version
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to restrict {}", path.display()))?;
    }
    file.write_all(token.as_bytes())
        .with_context(|| format!("Failed to save token to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_round_trip_trims_whitespace() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(TOKEN_FILE_NAME);
        assert_eq!(read_token(&path), None);

        save_token(&path, "abc123").unwrap();
        assert_eq!(read_token(&path).as_deref(), Some("abc123"));

        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(read_token(&path), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join(TOKEN_FILE_NAME);

        // Pre-existing world-readable file gets tightened too
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        save_token(&path, "new-token").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(read_token(&path).as_deref(), Some("new-token"));
    }
}
