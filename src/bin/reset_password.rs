use std::{
    error::Error,
    io::{self},
    path::Path,
    process::exit,
};

use clap::Parser;
use rusqlite::Connection;

use finance_tracker::{
    Email, PasswordHash, SQLiteIdentityProvider, ValidatedPassword, get_user_by_email,
    set_password_hash,
};

/// A utility for changing the password of a registered user.
///
/// The password is replaced in both the user table and the identity provider.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The email the user registered with.
    #[arg(long)]
    email: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let email = match Email::new(&args.email) {
        Ok(email) => email,
        Err(error) => {
            print_error(error);
            exit(1);
        }
    };

    let connection = Connection::open(db_path)?;
    if let Err(error) = get_user_by_email(&email, &connection) {
        print_error(format!("Could not find a user with the email {email}: {error}"));
        exit(1);
    }
    println!("Resetting password for {email}");

    let password = match get_new_password() {
        Some(password) => password,
        None => return Ok(()),
    };
    update_password(db_path, &email, password, &connection)?;

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            print_error("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }
}

fn get_new_password() -> Option<ValidatedPassword> {
    loop {
        println!();

        let first_password = match rpassword::prompt_password("Enter a new password: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        let password = match ValidatedPassword::new(&first_password) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = match rpassword::prompt_password("Enter the same password again: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        return Some(password);
    }
}

fn update_password(
    db_path: &Path,
    email: &Email,
    password: ValidatedPassword,
    connection: &Connection,
) -> Result<(), Box<dyn Error>> {
    let password_hash = PasswordHash::new(password.clone(), PasswordHash::DEFAULT_COST)?;
    let identity_provider =
        SQLiteIdentityProvider::new(Connection::open(db_path)?, PasswordHash::DEFAULT_COST)?;

    identity_provider.reset_password(email, password)?;
    set_password_hash(email, &password_hash, connection)?;

    println!("Password updated successfully!");

    Ok(())
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
