use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use financial_record::{
    NewRecord, NewUser, PasswordHash, RecordType, create_record, create_user, initialize_db,
};

/// A utility for creating a test database for the financial_record web server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const TEST_EMAIL: &str = "test@example.com";
const TEST_PASSWORD: &str = "test123";

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user {TEST_EMAIL} with the password {TEST_PASSWORD}...");

    let user = create_user(
        &NewUser {
            name: "Test User".to_owned(),
            email: TEST_EMAIL.to_owned(),
            password_hash: PasswordHash::new(TEST_PASSWORD, PasswordHash::DEFAULT_COST)?,
        },
        &conn,
    )?;

    println!("Creating records...");

    let today = OffsetDateTime::now_utc().date();
    let records = [
        (0, RecordType::Income, "gaji", 8_500_000, Some("Gaji bulanan")),
        (1, RecordType::Expense, "makan", 45_000, None),
        (2, RecordType::Expense, "transportasi", 20_000, Some("Ojek ke kantor")),
        (5, RecordType::Expense, "belanja", 350_000, None),
        (35, RecordType::Income, "gaji", 8_500_000, Some("Gaji bulanan")),
        (36, RecordType::Expense, "sewa", 2_000_000, Some("Sewa kos")),
    ];

    for (days_ago, record_type, category, nominal, description) in records {
        create_record(
            &NewRecord {
                user_id: user.id,
                date: today - Duration::days(days_ago),
                record_type,
                category: category.to_owned(),
                nominal,
                description: description.map(str::to_owned),
                attachment: None,
            },
            &conn,
        )?;
    }

    println!("Success!");

    Ok(())
}
