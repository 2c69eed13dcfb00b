//! Session commands.

use shopline_storefront::{BootOutcome, Storefront};

use super::start;
use crate::error::CliError;
use crate::output;

pub async fn login(store: &Storefront, email: &str, password: &str) -> Result<(), CliError> {
    let identity = store.login(email, password).await?;
    output::message("Logged in");
    output::identity(&identity);
    Ok(())
}

pub async fn register(
    store: &Storefront,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    let identity = store.register(name, email, password).await?;
    output::message("Account created");
    output::identity(&identity);
    Ok(())
}

pub async fn logout(store: &Storefront) {
    store.logout().await;
    output::message("Logged out");
}

pub async fn whoami(store: &Storefront) {
    match start(store).await {
        BootOutcome::Restored(identity) => output::identity(&identity),
        BootOutcome::IdentityUnavailable => {
            output::message("Session found, but the account could not be loaded");
        }
        BootOutcome::Anonymous | BootOutcome::RefreshRejected => output::anonymous(),
    }
}
