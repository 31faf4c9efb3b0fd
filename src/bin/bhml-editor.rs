use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use bhml_admin::editing::{MatchForm, Upserted};
use bhml_admin::models::MatchStatus;
use bhml_admin::transport::{
    self, ConnectionSettings, Documents, DEFAULT_DATA_DIR, DEFAULT_REMOTE_PATH, DEFAULT_SSH_PORT,
};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Password};

/// Edit the tournament site's teams.json and matches.json
///
/// Documents are loaded from the local data directory, or over SFTP when
/// --host is given, edited, and saved back in one go.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Remote host; leave empty to work on the local data directory
    #[arg(long, default_value = "")]
    host: String,

    #[arg(long, default_value_t = DEFAULT_SSH_PORT)]
    port: u16,

    #[arg(long, default_value = "")]
    user: String,

    /// Prompted for when a host is given and this is omitted
    #[arg(long)]
    password: Option<String>,

    /// Directory on the remote host holding the documents
    #[arg(long, default_value = DEFAULT_REMOTE_PATH)]
    remote_path: String,

    /// Local data directory
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage teams
    Teams {
        #[command(subcommand)]
        action: TeamAction,
    },
    /// Manage match results
    Matches {
        #[command(subcommand)]
        action: MatchAction,
    },
}

#[derive(Subcommand, Debug)]
enum TeamAction {
    List,
    /// Add a team or update its display name
    Upsert {
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "")]
        name: String,
        /// Existing id to rename from
        #[arg(long)]
        selected: Option<String>,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum MatchAction {
    List,
    /// Add a match or update status, teams and score of an existing one
    Upsert {
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = MatchStatus::Upcoming)]
        status: MatchStatus,
        #[arg(long, default_value = "")]
        team_a: String,
        #[arg(long, default_value = "")]
        team_b: String,
        #[arg(long, default_value = "tba")]
        score_a: String,
        #[arg(long, default_value = "tba")]
        score_b: String,
    },
    /// Delete the match at a list position (see `matches list`)
    Delete {
        index: usize,
        /// Id shown at that position; the delete is refused if it moved
        #[arg(long)]
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

impl Args {
    fn settings(&self) -> Result<ConnectionSettings> {
        let mut settings = ConnectionSettings {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone().unwrap_or_default(),
            remote_path: self.remote_path.clone(),
            data_dir: self.data_dir.clone(),
        };
        if settings.is_remote() && self.password.is_none() {
            settings.password = Password::new()
                .with_prompt(format!("Password for {}@{}", settings.user, settings.host))
                .interact()?;
        }
        Ok(settings)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let settings = args.settings()?;
    let transport = transport::connect(&settings);
    log::info!("using {}", transport.describe());
    let mut documents = transport
        .load()
        .with_context(|| format!("loading from {} failed", transport.describe()))?;

    let message = match args.command {
        Command::Teams { action: TeamAction::List } => {
            print_teams(&documents);
            return Ok(());
        }
        Command::Matches { action: MatchAction::List } => {
            print_matches(&documents);
            return Ok(());
        }
        Command::Teams {
            action: TeamAction::Upsert { id, name, selected },
        } => {
            let team = documents.teams.upsert_team(selected.as_deref(), &id, &name)?;
            format!("team {} is now \"{}\"", id.trim(), team.name)
        }
        Command::Teams {
            action: TeamAction::Delete { id, yes },
        } => {
            if !confirm(yes, &format!("Delete team {id}?"))? {
                return Ok(());
            }
            documents.teams.delete_team(&id)?;
            format!("deleted team {id}")
        }
        Command::Matches {
            action:
                MatchAction::Upsert {
                    id,
                    status,
                    team_a,
                    team_b,
                    score_a,
                    score_b,
                },
        } => {
            let form = MatchForm {
                id,
                status,
                team_a,
                team_b,
                score_a,
                score_b,
            };
            match documents.matches.upsert_match(&form)? {
                Upserted::Inserted(index) => format!("added match {} at position {index}", form.id.trim()),
                Upserted::Updated(index) => format!("updated match {} at position {index}", form.id.trim()),
            }
        }
        Command::Matches {
            action: MatchAction::Delete { index, id, yes },
        } => {
            let id = id.trim();
            if documents.matches.matches.get(index).map(|m| m.id.as_str()) == Some(id)
                && !confirm(yes, &format!("Delete match {id} at position {index}?"))?
            {
                return Ok(());
            }
            documents.matches.delete_match(index, id)?;
            format!("deleted match {id}")
        }
    };

    transport
        .save(&documents)
        .with_context(|| format!("saving to {} failed", transport.describe()))?;
    println!("{message}; saved to {}", transport.describe());
    Ok(())
}

fn confirm(skip: bool, prompt: &str) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn print_teams(documents: &Documents) {
    for (id, team) in &documents.teams.teams {
        println!("{id}\t{}", team.name);
    }
}

fn print_matches(documents: &Documents) {
    for (index, m) in documents.matches.matches.iter().enumerate() {
        println!(
            "{index}\t{}\t{}\t{}\t{} : {}\t{}",
            m.id, m.status, m.teams.a, m.score.a, m.score.b, m.teams.b
        );
    }
}
