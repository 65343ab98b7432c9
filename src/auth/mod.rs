//! API key storage and resolution.
//!
//! One credential, kept in the system keyring under the `confab` service.
//! The `CONFAB_API_KEY` environment variable takes precedence over the
//! keyring, and a missing key is not an error: the transport simply omits
//! the Authorization header, which keyless local endpoints accept.

use keyring::Entry;
use std::error::Error;
use std::io::{self, Write};

const KEYRING_SERVICE: &str = "confab";
const KEYRING_USER: &str = "api-key";

/// Environment override checked before the keyring.
pub const API_KEY_ENV: &str = "CONFAB_API_KEY";

pub struct AuthManager {
    use_keyring: bool,
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthManager {
    pub fn new() -> Self {
        Self { use_keyring: true }
    }

    /// Construct an AuthManager with keyring access disabled (useful for tests).
    pub fn new_without_keyring() -> Self {
        Self { use_keyring: false }
    }

    pub fn store_key(&self, key: &str) -> Result<(), Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        entry.set_password(key)?;
        Ok(())
    }

    pub fn get_key(&self) -> Result<Option<String>, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(None);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(Box::new(err)),
        }
    }

    /// Removes the stored key. Returns false when there was nothing to remove.
    pub fn remove_key(&self) -> Result<bool, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(false);
        }
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(err) => Err(Box::new(err)),
        }
    }

    /// Resolves the key to use for this run: environment first, then the
    /// keyring. An empty result means keyless operation.
    pub fn resolve_api_key(&self) -> Result<String, Box<dyn Error>> {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        match self.get_key() {
            Ok(key) => Ok(key.unwrap_or_default()),
            Err(err) => Err(format!(
                "Could not read the API key from the system keyring: {err}\n\
                 Set {API_KEY_ENV} to bypass the keyring, or run 'confab auth' again."
            )
            .into()),
        }
    }

    pub fn interactive_auth(&self) -> Result<(), Box<dyn Error>> {
        println!("🔐 Confab Authentication Setup");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!();
        println!("The key is stored in your system keyring, never in the config file.");
        println!("Leave the prompt empty to cancel.");
        println!();

        print!("Enter your API key: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let key = input.trim();

        if key.is_empty() {
            println!("Cancelled.");
            return Ok(());
        }

        if !looks_like_api_key(key) {
            println!("⚠️  The key does not start with \"sk-\"; storing it anyway.");
        }

        self.store_key(key)?;
        println!("✅ API key stored.");
        Ok(())
    }

    pub fn interactive_deauth(&self) -> Result<(), Box<dyn Error>> {
        if self.remove_key()? {
            println!("✅ API key removed from the keyring.");
        } else {
            println!("No stored API key to remove.");
        }
        Ok(())
    }
}

/// Shape check only. Custom endpoints hand out keys in other formats, so a
/// mismatch warns rather than rejects.
pub fn looks_like_api_key(key: &str) -> bool {
    key.starts_with("sk-")
}
