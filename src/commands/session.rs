//! Sign-in state commands: `login`, `logout`, `whoami`.

use console::style;

use crate::config::SecretsFile;
use crate::session::{AuthSession, LocalSession};

fn local_session() -> anyhow::Result<LocalSession> {
    Ok(LocalSession::new(SecretsFile::open_default()?))
}

pub fn handle_login() -> Result<(), anyhow::Error> {
    let user = local_session()?.sign_in()?;
    println!("{} Signed in as {}", style("✓").green(), style(&user.display_name).bold());
    Ok(())
}

/// Signs out. Saved recordings stay on disk but are hidden until the same
/// user signs in again.
pub fn handle_logout() -> Result<(), anyhow::Error> {
    let session = local_session()?;
    match session.current_user() {
        Some(user) => {
            session.sign_out()?;
            println!("Signed out {}", user.display_name);
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

pub fn handle_whoami() -> Result<(), anyhow::Error> {
    match local_session()?.current_user() {
        Some(user) => println!("{} ({})", user.display_name, style(&user.id).dim()),
        None => println!("Not signed in. Run 'voxscribe login'."),
    }
    Ok(())
}
