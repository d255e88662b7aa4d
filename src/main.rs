use colored::Colorize;
use eventdesk_ledger::{AuthError, DatabaseError, Ledger, NewPlainUser, Role, SqliteDatabase};
use eventdesk_server::ServerContext;
use log::{error, info, warn};
use settings::{Settings, SettingsError};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

use crate::logging::LogColor;

mod logging;
mod settings;

pub struct EventDesk {
    settings: Settings,
    context: ServerContext,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum EventDeskError {
    #[error("Invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not create the admin account: {0}")]
    Bootstrap(#[from] AuthError),

    #[error("Could not start the server: {0}")]
    Server(#[from] std::io::Error),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl EventDesk {
    fn new() -> Result<Self, EventDeskError> {
        let settings = Settings::from_env()?;

        info!("Building async runtime...");
        let main_runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("eventdesk-async")
            .build()
            .map_err(|e| EventDeskError::Fatal(e.to_string()))?;

        info!("Connecting to database at {}...", settings.database_url);

        let database = main_runtime.block_on(SqliteDatabase::connect(
            &settings.database_url,
            settings.max_connections,
        ))?;

        let ledger = Ledger::new(database, settings.ledger.clone());

        match &settings.admin_password {
            Some(password) => {
                let created = main_runtime.block_on(ledger.auth.ensure_admin(NewPlainUser {
                    username: settings.admin_username.clone(),
                    password: password.clone(),
                    email: None,
                    role: Role::Admin,
                }))?;

                if let Some(admin) = created {
                    info!("Created the first admin account, {}", admin.username);
                }
            }
            None => warn!(
                "EVENTDESK_ADMIN_PASSWORD is not set, no admin account will be created if none exists"
            ),
        }

        Ok(Self {
            settings,
            context: ServerContext::new(ledger),
            runtime: main_runtime,
        })
    }

    fn run(self) -> Result<(), EventDeskError> {
        let context = self.context;
        let port = self.settings.port;

        self.runtime
            .block_on(eventdesk_server::run_server(context, port))?;

        Ok(())
    }
}

impl EventDeskError {
    fn hint(&self) -> String {
        match self {
            EventDeskError::Settings(_) => "Check the EVENTDESK_* environment variables, then try again.".to_string(),
            EventDeskError::Database(_) => "This is a database error. Make sure EVENTDESK_DATABASE_URL points to a writable SQLite file, then try again.".to_string(),
            EventDeskError::Bootstrap(_) => "The admin account could not be created. Make sure EVENTDESK_ADMIN_USERNAME is not already taken by a student.".to_string(),
            EventDeskError::Server(_) => "Make sure EVENTDESK_SERVER_PORT is free, then try again.".to_string(),
            EventDeskError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn report(error: EventDeskError) {
    error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "eventdesk failed!".bold().color(LogColor::Red));
    error!("{}", error);
    error!(
        "{}",
        format!("Hint: {}", error.hint())
            .color(LogColor::Dimmed)
            .italic()
    );
}

fn main() {
    if let Err(error) = logging::init_logger() {
        eprintln!("Could not initialize logging: {}", error);
        return;
    }

    let result = EventDesk::new().and_then(|eventdesk| {
        info!("Initialized successfully.");
        eventdesk.run()
    });

    if let Err(error) = result {
        report(error);
    }
}
