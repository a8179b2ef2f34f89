use std::{error::Error, io::Write};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "bilancio_admin")]
#[command(about = "Admin utilities for bilancio (bootstrap users, run recurring templates)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./bilancio.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    /// Materialize every due recurring template of every user.
    RunDue,
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// Skip the interactive prompt.
    #[arg(long, env = "BILANCIO_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

/// Masked line editor on stderr. Raw mode lasts as long as the value.
struct MaskedInput {
    out: std::io::Stderr,
}

impl MaskedInput {
    fn open() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self {
            out: std::io::stderr(),
        })
    }

    fn say(&mut self, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        execute!(
            self.out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(text)
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn read(&mut self, prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.say(prompt)?;
        let mut secret = String::new();
        loop {
            let Event::Key(KeyEvent {
                code, modifiers, ..
            }) = event::read()?
            else {
                continue;
            };
            let ctrl = modifiers.contains(KeyModifiers::CONTROL);
            match code {
                KeyCode::Enter => break,
                KeyCode::Char('c') if ctrl => {
                    execute!(self.out, Print("\r\n"))?;
                    return Err("interrupted".into());
                }
                KeyCode::Char(ch) if !ctrl => {
                    secret.push(ch);
                    execute!(self.out, Print('*'))?;
                }
                KeyCode::Backspace if secret.pop().is_some() => {
                    execute!(self.out, cursor::MoveLeft(1), Print(' '), cursor::MoveLeft(1))?;
                }
                _ => continue,
            }
            self.out.flush()?;
        }
        execute!(self.out, Print("\r\n"))?;
        Ok(secret)
    }
}

impl Drop for MaskedInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Ask for a new password with confirmation, up to three times.
fn prompt_new_password() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut input = MaskedInput::open()?;
    for _ in 0..3 {
        let password = input.read("Password: ")?;
        if password.is_empty() {
            input.say("Password must not be empty.\r\n")?;
        } else if input.read("Confirm password: ")? == password {
            return Ok(password);
        } else {
            input.say("Passwords do not match. Try again.\r\n")?;
        }
    }
    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = match args.password {
                Some(password) => password,
                None => prompt_new_password()?,
            };

            match engine.new_user(&args.username, &password).await {
                Ok(()) => println!("created user: {}", args.username.trim()),
                Err(EngineError::ExistingKey(name)) => {
                    eprintln!("user already exists: {name}");
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::User(User {
            command: UserCommand::List,
        }) => {
            for username in engine.list_users().await? {
                println!("{username}");
            }
        }
        Command::RunDue => {
            let reports = engine.run_due_check_all(Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    Ok(())
}
