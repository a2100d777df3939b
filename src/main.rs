//! Shastho Registration Console
//!
//! Line-driven front end for the Shastho registration core. It plays the
//! role the portal pages play in the browser: each command maps to one
//! session transition or directory query.
//!
//! # Flow
//! 1. `phone <number>` submits a Bangladeshi mobile number
//! 2. `otp <code>` enters the verification code
//! 3. `role <patient|doctor|diagnostic|bloodbank>` creates the account
//! 4. `register <json>` saves the role profile
//!
//! Type `help` for the remaining commands.
//!
//! @author Shastho
//! @copyright 2025

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use shastho_registration::config::{Config, LoggingConfig, StorageBackend, StorageConfig};
use shastho_registration::db::{FileStore, MemoryStore, Store};
use shastho_registration::directory::{BookingRequest, Directory};
use shastho_registration::models::{Phase, RegistrationForm, Role};
use shastho_registration::phone::{format_phone_number, initials};
use shastho_registration::session::{AuthSession, Verification};

const HELP: &str = "\
Commands:
  phone <number>            submit a phone number
  otp <code>                enter the verification code
  role <role>               pick patient, doctor, diagnostic or bloodbank
  register <json>           save the profile for the signed-in account
  whoami                    show the session state
  profile                   show the saved profile
  search <kind> [term]      kind is doctors, hospitals, diagnostics or bloodbanks
  appointments              list upcoming and past appointments
  book <doctor-id> <date> <time>
  cancel <appointment-id>
  prescriptions             list prescriptions
  back                      return to phone entry
  signout
  quit";

/// Initializes the logging system from configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to
/// stderr so command output on stdout stays readable.
fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!(e))
}

/// Opens the configured store.
async fn setup_store(config: &StorageConfig) -> Result<Arc<dyn Store>> {
    Ok(match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::File => {
            let store = FileStore::open(config.path.clone())
                .await
                .with_context(|| format!("failed to open store at {:?}", config.path))?;
            Arc::new(store)
        }
    })
}

async fn run_command(
    line: &str,
    session: &mut AuthSession,
    directory: &Directory,
) -> Result<bool> {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(false),
        "phone" => {
            let issued = session.submit_phone(rest).await?;
            println!(
                "Verification code sent to {} (enter any {} characters)",
                format_phone_number(&issued.phone),
                issued.code_length
            );
        }
        "otp" => match session.verify_otp(rest).await? {
            Verification::ReturningUser(user) => {
                let name = directory.display_name(&user).await?;
                println!("Welcome back, {}", name);
                if let Some(route) = session.pending_registration().await? {
                    println!("Your profile is incomplete, continue at {}", route.path());
                }
            }
            Verification::NewUser => {
                println!("New number. Choose a role: patient, doctor, diagnostic, bloodbank")
            }
        },
        "role" => {
            let role: Role = rest.parse()?;
            let route = session.select_role(role).await?;
            println!("Account created. Continue at {}", route.path());
        }
        "register" => {
            let role = session
                .user()
                .map(|u| u.role)
                .context("sign in before registering")?;
            let form = RegistrationForm::from_json(role, rest).context("invalid registration JSON")?;
            let registered = session.complete_registration(form).await?;
            println!(
                "Saved {} profile {}. Continue at {}",
                registered.profile.role(),
                registered.profile.id(),
                registered.route.path()
            );
        }
        "whoami" => {
            println!("step: {}", session.phase());
            match session.user() {
                Some(user) => {
                    let name = directory.display_name(user).await?;
                    match user.name.as_deref().map(initials) {
                        Some(badge) if !badge.is_empty() => {
                            println!("signed in as {} [{}] ({}, {})", name, badge, user.role, user.id)
                        }
                        _ => println!("signed in as {} ({}, {})", name, user.role, user.id),
                    }
                }
                None if session.phase() == Phase::Phone => println!("signed out"),
                None => println!("verifying {}", format_phone_number(session.phone_number())),
            }
        }
        "profile" => match session.profile().await? {
            Some(profile) => println!("{:#?}", profile),
            None => println!("No profile saved yet"),
        },
        "search" => {
            let (kind, term) = rest.split_once(' ').unwrap_or((rest, ""));
            match kind {
                "doctors" => {
                    for d in directory.doctors(term).await? {
                        println!(
                            "{}  {} - {} at {} (fee {})",
                            d.id, d.name, d.specialization, d.hospital, d.fee
                        );
                    }
                }
                "hospitals" => {
                    for h in directory.hospitals(term).await? {
                        println!("{}  {} - {}", h.id, h.name, h.address);
                    }
                }
                "diagnostics" => {
                    for c in directory.diagnostics(term).await? {
                        println!("{}  {} - {} ({})", c.id, c.name, c.address, c.operating_hours);
                    }
                }
                "bloodbanks" => {
                    for b in directory.blood_banks(term).await? {
                        let stock: u32 = b.blood_types.iter().map(|t| t.count).sum();
                        println!("{}  {} - {} ({} units)", b.id, b.name, b.address, stock);
                    }
                }
                other => println!("Unknown directory: {}", other),
            }
        }
        "appointments" => {
            let user = session.user().context("sign in to see appointments")?;
            let today = Utc::now().date_naive();
            let split = directory.appointments_for(&user.id, today).await?;
            println!("Upcoming:");
            for a in &split.upcoming {
                println!("  {}  {} {} {:?}", a.id, a.date, a.time, a.status);
            }
            println!("Past:");
            for a in &split.past {
                println!("  {}  {} {} {:?}", a.id, a.date, a.time, a.status);
            }
        }
        "book" => {
            let user = session.user().context("sign in to book")?;
            let mut parts = rest.splitn(3, ' ');
            let (Some(doctor_id), Some(date), Some(time)) = (parts.next(), parts.next(), parts.next())
            else {
                println!("usage: book <doctor-id> <YYYY-MM-DD> <time>");
                return Ok(true);
            };
            let date: NaiveDate = date.parse().context("date must be YYYY-MM-DD")?;
            let appointment = directory
                .book_appointment(BookingRequest {
                    patient_id: user.id.clone(),
                    doctor_id: doctor_id.to_string(),
                    date,
                    time: time.to_string(),
                    problem: None,
                })
                .await?;
            println!("Booked {} (pending)", appointment.id);
        }
        "cancel" => {
            directory.cancel_appointment(rest).await?;
            println!("Cancelled {}", rest);
        }
        "prescriptions" => {
            let user = session.user().context("sign in to see prescriptions")?;
            for p in directory.prescriptions_for(&user.id).await? {
                println!("{}  {}  {}", p.date, p.diagnosis, p.doctor_name.unwrap_or_default());
                for m in &p.medications {
                    println!("    {} {}: {} for {}", m.name, m.dosage, m.instruction, m.duration);
                }
            }
        }
        "back" => {
            session.back_to_phone()?;
            println!("Enter your phone number");
        }
        "signout" => {
            session.sign_out().await?;
            println!("Signed out");
        }
        other => println!("Unknown command {:?}, type help", other),
    }

    Ok(true)
}

/// Main entry point for the registration console.
///
/// # Flow
/// 1. Loads configuration and initializes logging
/// 2. Opens the configured store and restores any signed-in user
/// 3. Reads commands from stdin until `quit` or end of input
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new().context("failed to load configuration")?;
    setup_logging(&config.logging)?;
    info!("{} starting up...", config.application.name);

    let store = setup_store(&config.storage).await?;
    let mut session = AuthSession::hydrate(store.clone())
        .await?
        .with_code_length(config.auth.otp_length);
    let directory = Directory::new(store);

    if let Some(user) = session.user() {
        let name = directory.display_name(user).await?;
        println!("Signed in as {}", name);
    } else {
        println!("Enter your phone number (type help for commands)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match run_command(&line, &mut session, &directory).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("Command failed: {:#}", e);
                println!("Error: {}", e);
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
