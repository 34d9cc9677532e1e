//! Identity command handlers

use anyhow::{Context, Result};

use cyberpad_core::identity::{sign_in, sign_out};
use cyberpad_core::Identity;

use super::Session;
use crate::output::{Output, OutputFormat};

/// Print the identity this invocation acts as
pub fn whoami(session: &Session, output: &Output) -> Result<()> {
    match output.format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "identity": session.identity }));
        }
        _ => match &session.identity {
            Some(identity) => println!("{}", identity),
            None => output.message("Not signed in."),
        },
    }
    Ok(())
}

/// Store `name` as the current identity
pub fn login(session: &mut Session, name: String, output: &Output) -> Result<()> {
    let identity = Identity::parse(&name).with_context(|| format!("Invalid identity: {:?}", name))?;
    sign_in(session.store.backend_mut(), &identity).context("Failed to store identity")?;

    let existing = session.store.exists(&identity);
    session.identity = Some(identity.clone());

    output.success(&format!(
        "Signed in as {}{}",
        identity,
        if existing { "" } else { " (new workspace)" }
    ));
    Ok(())
}

/// Clear the stored current identity
pub fn logout(session: &mut Session, output: &Output) -> Result<()> {
    let removed = sign_out(session.store.backend_mut()).context("Failed to clear identity")?;
    if removed {
        output.success("Signed out");
    } else {
        output.message("Not signed in.");
    }
    Ok(())
}
