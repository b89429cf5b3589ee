//! The `examkit login` and `examkit logout` commands.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

pub async fn login(username: String, password: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let (config, backend) = super::connect(config_path)?;

    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };

    let user = backend
        .login(&username, &password)
        .await
        .with_context(|| format!("login to {} failed", config.api_base_url))?;

    let name = if user.full_name.is_empty() {
        &user.username
    } else {
        &user.full_name
    };
    println!("Logged in as {name}.");
    Ok(())
}

pub fn logout(config_path: Option<PathBuf>) -> Result<()> {
    let (_, backend) = super::connect(config_path)?;
    if !backend.session().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    backend.logout()?;
    println!("Logged out.");
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    anyhow::ensure!(!password.is_empty(), "no password given");
    Ok(password)
}
