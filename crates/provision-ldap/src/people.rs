//! Person entries and their companion posix groups.

use provision_core::config::AccountConfig;
use provision_core::ids::IdPool;
use provision_core::Error;

use crate::config::DirectoryConfig;
use crate::entry::{EntryDescriptor, EntryLookup};
use crate::inventory::Record;
use crate::Result;

/// Object classes of a provisioned person.
pub const USER_OBJECT_CLASSES: &[&str] = &[
    "top",
    "person",
    "organizationalPerson",
    "inetOrgPerson",
    "posixAccount",
    "shadowAccount",
    "ldapPublicKey",
];

/// Object classes of a per-user group.
pub const GROUP_OBJECT_CLASSES: &[&str] = &["top", "posixGroup"];

/// Builds the entry for one person, allocating a fresh uid/gid from `pool`.
///
/// The record's attributes are copied as given; `cn`, `uidNumber`, `gidNumber`, `loginShell` and
/// `homeDirectory` are derived. The person's posix group is attached as a dependent entry.
///
/// # Errors
///
/// Returns [`Error::ValidationError`] if `uid`, `givenName` or `sn` is missing, and propagates
/// allocation failures.
pub fn user_entry(
    record: &Record,
    directory: &DirectoryConfig,
    accounts: &AccountConfig,
    pool: &mut IdPool,
) -> Result<EntryDescriptor> {
    let login = required(record, "uid")?;
    let given_name = required(record, "givenName")?;
    let surname = required(record, "sn")?;

    let id = pool.allocate(accounts.min_id)?;
    let id_text = id.to_string();

    let group = group_entry(login, id, directory);
    let dn = directory.people_base_dn().child("uid", login);

    Ok(EntryDescriptor::builder(dn, EntryLookup::new("person", "uid", login))
        .object_classes(USER_OBJECT_CLASSES)
        .attributes(record)
        .attribute("cn", format!("{given_name} {surname}"))
        .attribute("uidNumber", id_text.clone())
        .attribute("gidNumber", id_text)
        .attribute("loginShell", accounts.login_shell.clone())
        .attribute("homeDirectory", accounts.home_directory(login))
        .child(group)
        .build())
}

/// Builds the posix group named after `login` with the given gid.
#[must_use]
pub fn group_entry(login: &str, gid: u32, directory: &DirectoryConfig) -> EntryDescriptor {
    let dn = directory.group_base_dn().child("cn", login);
    EntryDescriptor::builder(dn, EntryLookup::new("posixGroup", "cn", login))
        .object_classes(GROUP_OBJECT_CLASSES)
        .attribute("cn", login)
        .attribute("gidNumber", gid.to_string())
        .build()
}

pub(crate) fn required<'a>(record: &'a Record, attribute: &str) -> Result<&'a str> {
    record
        .get(attribute)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            Error::ValidationError(format!(
                "record {} is missing `{attribute}`",
                describe(record)
            ))
        })
}

fn describe(record: &Record) -> String {
    record
        .get("uid")
        .or_else(|| record.get("cn"))
        .map_or_else(|| format!("{record:?}"), |name| format!("`{name}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::DistinguishedName;

    fn directory() -> DirectoryConfig {
        let base_dn = DistinguishedName::parse("dc=example,dc=org").unwrap();
        DirectoryConfig::new("ldap://ldap.example.org", base_dn).unwrap()
    }

    fn record(login: &str) -> Record {
        Record::from([
            ("uid".to_string(), login.to_string()),
            ("givenName".to_string(), "Ana".to_string()),
            ("sn".to_string(), "Ruiz Soto".to_string()),
            ("sshPublicKey".to_string(), "ssh-ed25519 AAAA ana".to_string()),
        ])
    }

    #[test]
    fn builds_user_with_group() {
        let mut pool = IdPool::from_used([2000], [2001]);
        let entry = user_entry(
            &record("aruiz"),
            &directory(),
            &AccountConfig::default(),
            &mut pool,
        )
        .unwrap();

        assert_eq!(entry.dn.as_str(), "uid=aruiz,ou=People,dc=example,dc=org");
        assert_eq!(entry.object_classes.len(), USER_OBJECT_CLASSES.len());
        assert_eq!(entry.first("cn"), Some("Ana Ruiz Soto"));
        assert_eq!(entry.first("uidNumber"), Some("2002"));
        assert_eq!(entry.first("gidNumber"), Some("2002"));
        assert_eq!(entry.first("loginShell"), Some("/bin/bash"));
        assert_eq!(entry.first("homeDirectory"), Some("/home/nfs/aruiz"));
        assert_eq!(entry.first("sshPublicKey"), Some("ssh-ed25519 AAAA ana"));
        assert_eq!(
            entry.lookup.filter(),
            "(&(objectClass=person)(uid=aruiz))"
        );

        assert_eq!(entry.children.len(), 1);
        let group = &entry.children[0];
        assert_eq!(group.dn.as_str(), "cn=aruiz,ou=Group,dc=example,dc=org");
        assert_eq!(group.first("gidNumber"), Some("2002"));
        assert_eq!(group.object_classes, vec!["top", "posixGroup"]);
        assert!(group.children.is_empty());
    }

    #[test]
    fn consecutive_users_get_distinct_ids() {
        let mut pool = IdPool::new();
        let directory = directory();
        let accounts = AccountConfig::default();
        let first = user_entry(&record("a"), &directory, &accounts, &mut pool).unwrap();
        let second = user_entry(&record("b"), &directory, &accounts, &mut pool).unwrap();
        assert_eq!(first.first("uidNumber"), Some("2000"));
        assert_eq!(second.first("uidNumber"), Some("2001"));
    }

    #[test]
    fn missing_surname_is_rejected_without_allocating() {
        let mut record = record("aruiz");
        record.remove("sn");
        let mut pool = IdPool::new();
        let err = user_entry(&record, &directory(), &AccountConfig::default(), &mut pool)
            .unwrap_err();
        match err {
            Error::ValidationError(message) => {
                assert!(message.contains("aruiz"));
                assert!(message.contains("sn"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(pool.uids().is_empty());
    }
}
