//! Emergency contact list.
//!
//! [`ContactStore`] is the read-only view the alert coordinator takes a
//! snapshot from.  [`JsonContactStore`] persists the list as JSON in the
//! platform config directory:
//!
//! | Platform | Path |
//! |----------|------|
//! | Windows  | `%APPDATA%\sos-alert\contacts.json` |
//! | macOS    | `~/Library/Application Support/sos-alert/contacts.json` |
//! | Linux    | `~/.config/sos-alert/contacts.json` |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A person who receives the alert message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone_number: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ContactError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("cannot access contact list: {0}")]
    Io(#[from] std::io::Error),

    #[error("contact list is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// ContactStore trait
// ---------------------------------------------------------------------------

/// Snapshot read of the registered contacts, in registration order.
pub trait ContactStore: Send + Sync {
    fn list_contacts(&self) -> Result<Vec<Contact>, ContactError>;
}

// ---------------------------------------------------------------------------
// JsonContactStore
// ---------------------------------------------------------------------------

/// Contact list persisted as a JSON array of `{ "name", "phone_number" }`.
///
/// The file is re-read on every [`list_contacts`](ContactStore::list_contacts)
/// call so edits made by the CLI while the service runs are picked up by the
/// next alert.
#[derive(Debug, Clone)]
pub struct JsonContactStore {
    path: PathBuf,
}

impl JsonContactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a contact.  An existing entry with the same phone number is
    /// replaced in place.
    pub fn add(&self, contact: Contact) -> Result<(), ContactError> {
        let mut contacts = self.list_contacts()?;
        match contacts
            .iter_mut()
            .find(|c| c.phone_number == contact.phone_number)
        {
            Some(existing) => *existing = contact,
            None => contacts.push(contact),
        }
        self.write(&contacts)
    }

    /// Remove the contact with `phone_number`.  Returns `false` when no such
    /// contact was registered.
    pub fn remove(&self, phone_number: &str) -> Result<bool, ContactError> {
        let mut contacts = self.list_contacts()?;
        let before = contacts.len();
        contacts.retain(|c| c.phone_number != phone_number);
        if contacts.len() == before {
            return Ok(false);
        }
        self.write(&contacts)?;
        Ok(true)
    }

    fn write(&self, contacts: &[Contact]) -> Result<(), ContactError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(contacts)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl ContactStore for JsonContactStore {
    fn list_contacts(&self) -> Result<Vec<Contact>, ContactError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
