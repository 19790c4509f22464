//! JSON inventory of people and computers.
//!
//! The inventory file is an object whose keys name collections (`personas`, `computers`, ...)
//! and whose values are lists of flat records. Record field names go through a fixed
//! translation table to become directory attribute names, so `{"usuario": "jdoe"}` turns into
//! `uid=jdoe`. Anything outside the tables is rejected before the directory is touched.

use provision_core::config::AccountConfig;
use provision_core::ids::IdPool;
use provision_core::Error;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::DirectoryConfig;
use crate::entry::EntryDescriptor;
use crate::host::computer_entry;
use crate::people::user_entry;
use crate::Result;

/// Directory attributes of one inventory record, keyed by attribute name.
pub type Record = BTreeMap<String, String>;

const COLLECTIONS: &[(&str, Collection)] = &[
    ("personas", Collection::People),
    ("people", Collection::People),
    ("computers", Collection::Computers),
    ("ordenadores", Collection::Computers),
];

const FIELD_ATTRIBUTES: &[(&str, &str)] = &[
    ("nombre", "givenName"),
    ("name", "givenName"),
    ("apellidos", "sn"),
    ("surname", "sn"),
    ("usuario", "uid"),
    ("username", "uid"),
    ("clave", "sshPublicKey"),
    ("key", "sshPublicKey"),
    ("hostname", "cn"),
    ("ipv4", "ipHostNumber"),
    ("address", "ipHostNumber"),
    ("correo", "mail"),
    ("email", "mail"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    People,
    Computers,
}

/// Translates an inventory field name to its directory attribute.
#[must_use]
pub fn attribute_for_field(field: &str) -> Option<&'static str> {
    FIELD_ATTRIBUTES
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, attribute)| *attribute)
}

fn collection_for_key(key: &str) -> Option<Collection> {
    COLLECTIONS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, collection)| *collection)
}

/// Normalized inventory: records already expressed as directory attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Person records, in file order.
    pub people: Vec<Record>,
    /// Computer records, in file order.
    pub computers: Vec<Record>,
}

impl Inventory {
    /// Reads and normalizes an inventory file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputError`] if the file is missing, unreadable or not JSON, and
    /// [`Error::ValidationError`] if it uses unknown collections or fields.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InputError(format!(
                "file \"{}\" does not exist",
                path.display()
            )));
        }
        let raw = fs::read_to_string(path)
            .map_err(|err| Error::InputError(format!("failed to read {}: {err}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parses and normalizes inventory JSON.
    ///
    /// # Errors
    ///
    /// See [`Inventory::from_path`].
    pub fn from_json(raw: &str) -> Result<Self> {
        let document: Map<String, Value> = serde_json::from_str(raw)?;
        let mut inventory = Self::default();

        for (key, value) in document {
            let collection = collection_for_key(&key)
                .ok_or_else(|| Error::ValidationError(format!("unknown collection `{key}`")))?;
            let items = value.as_array().ok_or_else(|| {
                Error::ValidationError(format!("collection `{key}` must be a list"))
            })?;

            let target = match collection {
                Collection::People => &mut inventory.people,
                Collection::Computers => &mut inventory.computers,
            };
            for (index, item) in items.iter().enumerate() {
                target.push(normalize_record(&key, index, item)?);
            }
        }

        tracing::debug!(
            people = inventory.people.len(),
            computers = inventory.computers.len(),
            "parsed inventory"
        );
        Ok(inventory)
    }

    /// Builds the entries to provision: every person (with a fresh id from `pool`), then every
    /// computer, each in file order.
    ///
    /// # Errors
    ///
    /// Returns the first record that fails validation, or an allocation failure.
    pub fn entries(
        &self,
        directory: &DirectoryConfig,
        accounts: &AccountConfig,
        pool: &mut IdPool,
    ) -> Result<Vec<EntryDescriptor>> {
        let mut entries = Vec::with_capacity(self.people.len() + self.computers.len());
        for record in &self.people {
            entries.push(user_entry(record, directory, accounts, pool)?);
        }
        for record in &self.computers {
            entries.push(computer_entry(record, directory)?);
        }
        Ok(entries)
    }

    /// Returns true if there is nothing to provision.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.computers.is_empty()
    }
}

fn normalize_record(collection: &str, index: usize, item: &Value) -> Result<Record> {
    let fields = item.as_object().ok_or_else(|| {
        Error::ValidationError(format!("{collection}[{index}] must be an object"))
    })?;

    let mut record = Record::new();
    for (field, value) in fields {
        let attribute = attribute_for_field(field).ok_or_else(|| {
            Error::ValidationError(format!("{collection}[{index}]: unknown field `{field}`"))
        })?;
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            _ => {
                return Err(Error::ValidationError(format!(
                    "{collection}[{index}]: field `{field}` must be a string"
                )))
            }
        };
        if record.insert(attribute.to_string(), text).is_some() {
            return Err(Error::ValidationError(format!(
                "{collection}[{index}]: attribute `{attribute}` given more than once"
            )));
        }
    }
    Ok(record)
}
