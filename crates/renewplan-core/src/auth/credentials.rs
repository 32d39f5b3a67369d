use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "renewplan";

/// OS keychain storage for the admin password, used by `login --remember`.
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }
}

impl CredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, username: &str) -> Result<Entry> {
        Entry::new(&self.service, username).context("Failed to open keychain entry")
    }

    pub fn remember(&self, username: &str, password: &str) -> Result<()> {
        self.entry(username)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// The remembered password, or `None` when nothing is stored or the
    /// keychain is unavailable.
    pub fn recall(&self, username: &str) -> Option<String> {
        match self.entry(username).and_then(|e| Ok(e.get_password()?)) {
            Ok(password) => Some(password),
            Err(e) => {
                debug!(username = username, error = %e, "No remembered password");
                None
            }
        }
    }

    /// Remove the stored password. Nothing stored is not an error.
    pub fn forget(&self, username: &str) -> Result<()> {
        match self.entry(username)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}
