//! Password hashing utility for Plant-Vita
//!
//! Generates Argon2id password hashes for seeding accounts by hand.
//!
//! Usage:
//!   cargo run --bin hash-password
//!   cargo run --bin hash-password "MySecurePassword123!"
//!
//! Cost parameters come from `HASH_MEMORY_KIB`, `HASH_ITERATIONS` and
//! `HASH_PARALLELISM` when set, matching what the server uses.

use std::env;
use std::io::{self, Write};

use anyhow::{bail, Context};
use plantvita_api::auth::{CredentialHasher, HasherConfig};

fn cost_from_env() -> anyhow::Result<HasherConfig> {
    let defaults = HasherConfig::default();
    let read = |key: &str, default: u32| -> anyhow::Result<u32> {
        match env::var(key) {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a positive integer")),
            Err(_) => Ok(default),
        }
    };

    Ok(HasherConfig {
        memory_kib: read("HASH_MEMORY_KIB", defaults.memory_kib)?,
        iterations: read("HASH_ITERATIONS", defaults.iterations)?,
        parallelism: read("HASH_PARALLELISM", defaults.parallelism)?,
    })
}

fn main() -> anyhow::Result<()> {
    let password = if let Some(pwd) = env::args().nth(1) {
        pwd
    } else {
        // Read from stdin so the password does not show in the process list
        print!("Enter password to hash: ");
        io::stdout().flush()?;

        let mut password = String::new();
        io::stdin().read_line(&mut password)?;
        password.trim().to_string()
    };

    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let hasher = CredentialHasher::new(cost_from_env()?)?;
    let password_hash = hasher.hash(&password)?;

    println!("\n===========================================");
    println!("Password Hash (Argon2id):");
    println!("===========================================");
    println!("{}", password_hash);
    println!("===========================================\n");

    println!("Example SQL:");
    println!(
        "INSERT INTO accounts (id, email, password_hash) VALUES (gen_random_uuid(), 'owner@example.com', '{}');",
        password_hash
    );

    Ok(())
}
