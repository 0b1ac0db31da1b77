use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relief_tracker::config::AppConfig;
use relief_tracker::controller::Controller;
use relief_tracker::db::Database;
use relief_tracker::diagnostics::ErrorLog;
use relief_tracker::i18n::Translations;
use relief_tracker::ids::IdAllocator;

#[derive(Parser)]
#[command(name = "relief")]
#[command(about = "Victim, shelter, supply and inquiry tracking for disaster response")]
struct Cli {
    /// SQLite database file (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Translation resource, e.g. en-CA or fr-CA (overrides the config file)
    #[arg(long, global = true)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Show how many records of each kind are stored
    Status,
    /// List locations with their occupants and inventory
    Locations,
    /// List missing-person inquiries
    Inquiries,
    /// Print the translation of a key
    Translate { key: String },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "relief_tracker=info".into()),
    );

    // Logs go to stderr so command output stays clean on stdout
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Looks up `key`, showing the key itself when the catalog lacks it.
fn tr<'a>(translations: &'a Translations, key: &'a str) -> &'a str {
    translations.get(key).unwrap_or(key)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = AppConfig::load();
    if let Some(path) = cli.db {
        config.database_path = Some(path);
    }
    if let Some(lang) = cli.lang {
        config.language = lang;
    }

    let errors = ErrorLog::new(config.error_log_path()?);
    let translations = match Translations::load(&config.translations_dir, &config.language) {
        Ok(t) => t,
        Err(e) => {
            if let Err(log_err) = errors.log_error(&e, "loading translations") {
                tracing::warn!("{:#}", anyhow::Error::from(log_err));
            }
            Translations::default()
        }
    };

    let command = cli.command.unwrap_or(Commands::Status);
    if let Commands::Translate { key } = &command {
        println!("{}", translations.get(key)?);
        return Ok(());
    }

    let db_path = config.database_path()?;
    let db = Database::open(db_path.clone())
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    db.migrate()?;

    if let Commands::Init = command {
        println!("{} {}", tr(&translations, "init.done"), db_path.display());
        return Ok(());
    }

    let controller = match Controller::load(db, IdAllocator::new()) {
        Ok(controller) => controller,
        Err(e) => errors.log_fatal_error(&e, "loading records"),
    };

    match command {
        Commands::Status => print_status(&controller, &translations),
        Commands::Locations => print_locations(&controller, &translations),
        Commands::Inquiries => print_inquiries(&controller, &translations),
        Commands::Init | Commands::Translate { .. } => {}
    }

    Ok(())
}

fn print_status(controller: &Controller<Database>, t: &Translations) {
    println!("{}", tr(t, "status.header"));
    let counts = [
        ("status.people", controller.people().len()),
        ("status.victims", controller.victims().len()),
        ("status.locations", controller.locations().len()),
        ("status.supplies", controller.supplies().len()),
        ("status.families", controller.family_groups().len()),
        ("status.medical_records", controller.medical_records().len()),
        ("status.inquiries", controller.inquiries().len()),
    ];
    for (key, count) in counts {
        println!("  {}: {}", tr(t, key), count);
    }
}

fn print_locations(controller: &Controller<Database>, t: &Translations) {
    let locations = controller.locations();
    if locations.is_empty() {
        println!("{}", tr(t, "locations.none"));
        return;
    }

    for location in locations {
        println!("[{}] {} ({})", location.id(), location.name(), location.address());

        println!("  {}:", tr(t, "locations.occupants"));
        let occupants = controller.occupants_of(location.id());
        if occupants.is_empty() {
            println!("    {}", tr(t, "locations.empty"));
        }
        for victim in occupants {
            println!("    [{}] {}", victim.id(), victim.full_name());
        }

        println!("  {}:", tr(t, "locations.inventory"));
        if location.inventory().is_empty() {
            println!("    {}", tr(t, "locations.empty"));
        }
        for supply in location.inventory() {
            println!(
                "    [{}] {} ({}, {})",
                supply.id(),
                supply.name(),
                supply.kind(),
                supply.item().as_str()
            );
        }
    }
}

fn print_inquiries(controller: &Controller<Database>, t: &Translations) {
    let inquiries = controller.inquiries();
    if inquiries.is_empty() {
        println!("{}", tr(t, "inquiries.none"));
        return;
    }

    let name_of = |id: i64| {
        controller
            .person(id)
            .map(|p| p.person().full_name())
            .unwrap_or_else(|| format!("#{id}"))
    };
    for inquiry in inquiries {
        let location = controller
            .location(inquiry.last_known_location())
            .map(|l| l.name().to_string())
            .unwrap_or_else(|| format!("#{}", inquiry.last_known_location()));
        println!(
            "[{}] {} {}, {} {}, {} {}: {}",
            inquiry.id(),
            inquiry.date_of_inquiry(),
            name_of(inquiry.missing_person()),
            tr(t, "inquiries.asked_by"),
            name_of(inquiry.inquirer()),
            tr(t, "inquiries.last_seen"),
            location,
            inquiry.info_provided()
        );
    }
}
