use clap::Parser;
use htpasswd_mgr::{Algorithm, DEFAULT_BCRYPT_COST, Encoder, Manager, Options};
use snafu::ResultExt;
use std::io::{self, Read};
use std::path::PathBuf;
use zeroize::Zeroizing;

mod logging;

/// Manage htpasswd credential files.
#[derive(Parser)]
#[command(name = "htpasswd-mgr")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SetArgs {
    /// Path to the password file
    file: PathBuf,
    /// Username to store
    username: String,
    /// Encoding scheme (md5, bcrypt, crypt, sha); unknown names mean md5
    #[arg(long, default_value = "md5")]
    algorithm: String,
    /// bcrypt cost factor
    #[arg(long, default_value_t = DEFAULT_BCRYPT_COST)]
    cost: u32,
    /// Read password from stdin instead of prompting
    #[arg(long)]
    password: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Add a new user to the password file
    Add(SetArgs),

    /// Change the password of an existing user
    Update(SetArgs),

    /// Add the user, or change its password if it exists
    Upsert(SetArgs),

    /// Remove a user from the password file
    Remove {
        /// Path to the password file
        file: PathBuf,
        /// Username to remove
        username: String,
    },

    /// List all users in the password file
    List {
        /// Path to the password file
        file: PathBuf,
    },
}

type Result<T> = ::std::result::Result<T, snafu::Whatever>;

const PROMPT_ATTEMPTS: usize = 3;

/// Reads the new password from stdin, or prompts for it twice on the terminal.
fn read_password(from_stdin: bool) -> Result<Zeroizing<String>> {
    if from_stdin {
        let mut input = Zeroizing::new(String::new());
        io::stdin()
            .read_to_string(&mut input)
            .whatever_context("Can't read password from stdin")?;
        let trimmed = input.trim_end_matches(['\r', '\n']);
        return Ok(Zeroizing::new(trimmed.to_string()));
    }

    for attempt in 1..=PROMPT_ATTEMPTS {
        let password = Zeroizing::new(
            rpassword::prompt_password("New password: ")
                .whatever_context("Can't prompt for new password")?,
        );
        let confirm = Zeroizing::new(
            rpassword::prompt_password("Re-type new password: ")
                .whatever_context("Can't prompt for password re-type")?,
        );
        if *password == *confirm {
            return Ok(password);
        }
        log::warn!("Passwords do not match (attempt {attempt} of {PROMPT_ATTEMPTS})");
    }

    snafu::whatever!("Password verification failed after {PROMPT_ATTEMPTS} attempts")
}

/// Opens the file and resolves the password and options shared by add, update and upsert.
fn prepare(args: &SetArgs) -> Result<(Manager, Zeroizing<String>, Options)> {
    let password = read_password(args.password)?;

    let algorithm = Algorithm::from_name(&args.algorithm);
    let encoder = Encoder::new().with_bcrypt_cost(args.cost);
    if algorithm == Algorithm::Bcrypt {
        log::info!("Using bcrypt cost {}", encoder.bcrypt_cost());
    }
    let manager =
        Manager::with_encoder(&args.file, encoder).whatever_context("Can't open password file")?;

    Ok((manager, password, Options::new().algorithm(algorithm)))
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose).whatever_context("Can't initialize logging")?;

    match cli.command {
        Commands::Add(args) => {
            let (mut manager, password, options) = prepare(&args)?;
            manager
                .add(&args.username, &password, options)
                .whatever_context("Can't add user")?;

            println!("Adding password for user {}", args.username);
            Ok(())
        }

        Commands::Update(args) => {
            let (mut manager, password, options) = prepare(&args)?;
            manager
                .update(&args.username, &password, options)
                .whatever_context("Can't update user")?;

            println!("Updating password for user {}", args.username);
            Ok(())
        }

        Commands::Upsert(args) => {
            let (mut manager, password, options) = prepare(&args)?;
            let existed = manager.contains(&args.username);
            manager
                .upsert(&args.username, &password, options)
                .whatever_context("Can't store user")?;

            if existed {
                println!("Updating password for user {}", args.username);
            } else {
                println!("Adding password for user {}", args.username);
            }
            Ok(())
        }

        Commands::Remove { file, username } => {
            let mut manager = Manager::open(&file).whatever_context("Can't open password file")?;
            if !manager.contains(&username) {
                log::warn!("User {username} not found");
            }
            manager
                .remove(&username, Options::new())
                .whatever_context("Can't remove user")?;

            println!("Deleting user {}", username);
            Ok(())
        }

        Commands::List { file } => {
            let manager = Manager::open(&file).whatever_context("Can't open password file")?;
            for user in manager.list() {
                println!("{}", user);
            }
            Ok(())
        }
    }
}

#[snafu::report]
fn main() -> Result<()> {
    run()
}
