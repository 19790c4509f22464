//! Directory client implementation.

use crate::{config::DirectoryConfig, entry::EntryDescriptor, host::KnownHost, Result};
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchResult};
use native_tls::{Certificate, TlsConnector};
use provision_core::ids::IdPool;
use provision_core::Error;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// LDAP result code for a search base that does not exist.
const NO_SUCH_OBJECT: u32 = 32;

/// Requests no attributes, only the DNs of matching entries.
const NO_ATTRIBUTES: &[&str] = &["1.1"];

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// LDAP entry representation used by the client.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserve server order).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Returns all values for the attribute. Attribute names match case-insensitively.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .get(attribute)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
                    .map(|(_, values)| values)
            })
            .map(Vec::as_slice)
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

impl From<SearchEntry> for LdapEntry {
    fn from(entry: SearchEntry) -> Self {
        let mut attributes = entry.attrs;
        for (name, values) in entry.bin_attrs {
            attributes.entry(name).or_default().extend(
                values
                    .iter()
                    .map(|value| String::from_utf8_lossy(value).into_owned()),
            );
        }
        Self {
            dn: entry.dn,
            attributes,
        }
    }
}

/// Outcome counters of a bulk insert or delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Entries added to the directory.
    pub added: usize,
    /// Entries deleted from the directory.
    pub deleted: usize,
    /// Entries left alone because they already were in the requested state.
    pub skipped: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} deleted, {} skipped",
            self.added, self.deleted, self.skipped
        )
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>>;
    async fn add(&mut self, dn: &str, attributes: &[(String, Vec<String>)]) -> Result<()>;
    async fn delete(&mut self, dn: &str) -> Result<()>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Directory client with pluggable LDAP backend.
pub struct DirectoryClient {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
}

impl DirectoryClient {
    /// Creates a client that uses the real LDAP connector.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self { config, connector }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_connector(config: DirectoryConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Collects every uid and gid number already present in the directory.
    ///
    /// Person entries contribute their `uidNumber` and `gidNumber`; posix groups contribute
    /// their `gidNumber`. Values that are not numbers are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin bind or a search fails.
    pub async fn load_id_pool(&self) -> Result<IdPool> {
        let mut session = self.admin_session().await?;
        let found = self.search_ids(&mut *session).await;
        let (people, groups) = release(session, found).await?;

        let pool = IdPool::from_used(
            numeric_values(&people, "uidNumber"),
            numeric_values(&people, "gidNumber").chain(numeric_values(&groups, "gidNumber")),
        );
        debug!(
            uids = pool.uids().len(),
            gids = pool.gids().len(),
            "loaded identifiers in use"
        );
        Ok(pool)
    }

    /// Adds every entry that does not exist yet, each followed by its dependents.
    ///
    /// Dependents are checked and added even when their parent was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin bind, an existence check or an add fails.
    pub async fn insert_all(&self, entries: &[EntryDescriptor]) -> Result<SyncReport> {
        let mut session = self.admin_session().await?;
        let inserted = self.insert_entries(&mut *session, entries).await;
        let report = release(session, inserted).await?;
        info!(%report, "insert finished");
        Ok(report)
    }

    /// Deletes every entry that exists, dependents first.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin bind, an existence check or a delete fails.
    pub async fn delete_all(&self, entries: &[EntryDescriptor]) -> Result<SyncReport> {
        let mut session = self.admin_session().await?;
        let deleted = self.delete_entries(&mut *session, entries).await;
        let report = release(session, deleted).await?;
        info!(%report, "delete finished");
        Ok(report)
    }

    /// Reads a user's `sshPublicKey` with an anonymous bind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user does not exist or has no key.
    pub async fn fetch_public_key(&self, login: &str) -> Result<String> {
        let dn = self.config.people_base_dn().child("uid", login);
        let mut session = self.connector.connect().await?;
        let found = session
            .search(
                dn.as_str(),
                SearchScope::Base,
                "(objectClass=person)",
                &["sshPublicKey"],
            )
            .await;
        let entries = release(session, found).await?;

        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("user `{login}` not found")))?;
        entry
            .first("sshPublicKey")
            .map(str::to_owned)
            .ok_or_else(|| Error::NotFound(format!("user `{login}` has no public key")))
    }

    /// Lists every computer with a complete host key, in directory order, with an anonymous
    /// bind.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the search fails.
    pub async fn known_hosts(&self) -> Result<Vec<KnownHost>> {
        let mut session = self.connector.connect().await?;
        let found = session
            .search(
                self.config.computer_base_dn().as_str(),
                SearchScope::Subtree,
                "(objectClass=device)",
                &["*"],
            )
            .await;
        let entries = release(session, found).await?;

        Ok(entries.iter().filter_map(KnownHost::from_entry).collect())
    }

    async fn admin_session(&self) -> Result<Box<dyn LdapSession>> {
        let credentials = self.config.credentials().ok_or_else(|| {
            Error::ConfigError("administrator credentials are required".to_string())
        })?;
        let mut session = self.connector.connect().await?;
        let bound = session
            .simple_bind(credentials.bind_dn(), credentials.bind_password())
            .await;
        match bound {
            Ok(()) => Ok(session),
            Err(err) => release(session, Err(err)).await,
        }
    }

    async fn search_ids(
        &self,
        session: &mut dyn LdapSession,
    ) -> Result<(Vec<LdapEntry>, Vec<LdapEntry>)> {
        let people = session
            .search(
                self.config.people_base_dn().as_str(),
                SearchScope::Subtree,
                "(objectClass=person)",
                &["uidNumber", "gidNumber"],
            )
            .await?;
        let groups = session
            .search(
                self.config.group_base_dn().as_str(),
                SearchScope::Subtree,
                "(objectClass=posixGroup)",
                &["gidNumber"],
            )
            .await?;
        Ok((people, groups))
    }

    async fn insert_entries(
        &self,
        session: &mut dyn LdapSession,
        entries: &[EntryDescriptor],
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for entry in entries.iter().flat_map(EntryDescriptor::creation_order) {
            if self.exists(session, entry).await? {
                info!(dn = %entry.dn, "already exists: {entry}, skipping");
                report.skipped += 1;
                continue;
            }
            info!(dn = %entry.dn, "inserting: {entry}");
            session.add(entry.dn.as_str(), &entry.add_request()).await?;
            report.added += 1;
        }
        Ok(report)
    }

    async fn delete_entries(
        &self,
        session: &mut dyn LdapSession,
        entries: &[EntryDescriptor],
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for entry in entries.iter().flat_map(EntryDescriptor::removal_order) {
            if !self.exists(session, entry).await? {
                info!(dn = %entry.dn, "does not exist: {entry}, skipping");
                report.skipped += 1;
                continue;
            }
            info!(dn = %entry.dn, "deleting: {entry}");
            session.delete(entry.dn.as_str()).await?;
            report.deleted += 1;
        }
        Ok(report)
    }

    async fn exists(&self, session: &mut dyn LdapSession, entry: &EntryDescriptor) -> Result<bool> {
        let filter = entry.lookup.filter();
        debug!(%filter, "checking entry");
        let matches = session
            .search(
                self.config.base_dn().as_str(),
                SearchScope::Subtree,
                &filter,
                NO_ATTRIBUTES,
            )
            .await?;
        Ok(!matches.is_empty())
    }
}

/// Unbinds `session` whatever the outcome; the operation's own error wins over an unbind error.
async fn release<T>(mut session: Box<dyn LdapSession>, outcome: Result<T>) -> Result<T> {
    let unbound = session.unbind().await;
    match outcome {
        Ok(value) => unbound.map(|()| value),
        Err(err) => {
            if let Err(unbind_err) = unbound {
                warn!(error = %unbind_err, "unbind failed after error");
            }
            Err(err)
        }
    }
}

/// Real LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<DirectoryConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<DirectoryConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(&self.config)?;
        debug!(url = self.config.url(), "connecting");
        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(map_ldap_error)?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = timeout(self.operation_timeout, self.inner.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout("LDAP bind timed out".to_string()))?
            .map_err(map_ldap_error)?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let SearchResult(entries, status) = timeout(
            self.operation_timeout,
            self.inner
                .search(base_dn, scope.into(), filter, attributes.to_vec()),
        )
        .await
        .map_err(|_| Error::Timeout("LDAP search timed out".to_string()))?
        .map_err(map_ldap_error)?;

        if status.rc == NO_SUCH_OBJECT {
            debug!(base_dn, "search base does not exist");
            return Ok(Vec::new());
        }
        status.success().map_err(map_ldap_error)?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(LdapEntry::from)
            .collect())
    }

    async fn add(&mut self, dn: &str, attributes: &[(String, Vec<String>)]) -> Result<()> {
        let attrs = attributes
            .iter()
            .map(|(name, values)| (name.clone(), values.iter().cloned().collect::<HashSet<_>>()))
            .collect::<Vec<_>>();

        let result = timeout(self.operation_timeout, self.inner.add(dn, attrs))
            .await
            .map_err(|_| Error::Timeout("LDAP add timed out".to_string()))?
            .map_err(map_ldap_error)?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<()> {
        let result = timeout(self.operation_timeout, self.inner.delete(dn))
            .await
            .map_err(|_| Error::Timeout("LDAP delete timed out".to_string()))?
            .map_err(map_ldap_error)?;
        result.success().map_err(map_ldap_error)?;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        timeout(self.operation_timeout, self.inner.unbind())
            .await
            .map_err(|_| Error::Timeout("LDAP unbind timed out".to_string()))?
            .map_err(map_ldap_error)?;
        Ok(())
    }
}

fn build_ldap_settings(config: &DirectoryConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connection_timeout());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::ConfigError(format!("failed to load CA certificate: {err}")))?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn map_ldap_error(err: ldap3::LdapError) -> Error {
    Error::ExternalServiceError {
        service: "ldap".to_string(),
        message: err.to_string(),
    }
}

fn numeric_values<'a>(
    entries: &'a [LdapEntry],
    attribute: &'a str,
) -> impl Iterator<Item = u32> + 'a {
    entries.iter().flat_map(move |entry| {
        entry
            .values(attribute)
            .unwrap_or_default()
            .iter()
            .filter_map(move |value| match value.trim().parse::<u32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(dn = %entry.dn, attribute, value = %value, "ignoring non-numeric id");
                    None
                }
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::DistinguishedName;
    use crate::entry::{EntryDescriptor, EntryLookup};
    use provision_core::credentials::BindCredentials;
    use std::sync::Mutex;

    fn base_config() -> DirectoryConfig {
        let base_dn = DistinguishedName::parse("dc=example,dc=org").unwrap();
        DirectoryConfig::new("ldap://ldap.example.org", base_dn).unwrap()
    }

    fn admin_config() -> DirectoryConfig {
        base_config().with_credentials(BindCredentials::new("cn=admin,dc=example,dc=org", "secret"))
    }

    fn entry(dn: &str, attributes: &[(&str, &str)]) -> LdapEntry {
        LdapEntry {
            dn: dn.to_string(),
            attributes: attributes
                .iter()
                .map(|(name, value)| ((*name).to_string(), vec![(*value).to_string()]))
                .collect(),
        }
    }

    fn user_with_group() -> EntryDescriptor {
        let config = base_config();
        let group = EntryDescriptor::builder(
            config.group_base_dn().child("cn", "aruiz"),
            EntryLookup::new("posixGroup", "cn", "aruiz"),
        )
        .object_classes(&["top", "posixGroup"])
        .attribute("cn", "aruiz")
        .attribute("gidNumber", "2000")
        .build();
        EntryDescriptor::builder(
            config.people_base_dn().child("uid", "aruiz"),
            EntryLookup::new("person", "uid", "aruiz"),
        )
        .object_classes(&["top", "person"])
        .attribute("cn", "Ana Ruiz")
        .attribute("uid", "aruiz")
        .child(group)
        .build()
    }

    fn computer() -> EntryDescriptor {
        EntryDescriptor::builder(
            base_config().computer_base_dn().child("cn", "web01"),
            EntryLookup::new("device", "cn", "web01"),
        )
        .object_classes(&["top", "device"])
        .attribute("cn", "web01")
        .build()
    }

    fn admin_session() -> MockLdapSession {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .withf(|dn, password| dn == "cn=admin,dc=example,dc=org" && password == "secret")
            .times(1)
            .returning(|_, _| Ok(()));
        session.expect_unbind().times(1).returning(|| Ok(()));
        session
    }

    fn connector_for(session: MockLdapSession) -> MockLdapConnector {
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move || Ok(Box::new(session)));
        connector
    }

    #[tokio::test]
    async fn insert_adds_missing_entries_and_dependents() {
        let added = Arc::new(Mutex::new(Vec::new()));
        let mut session = admin_session();
        // The user already exists; its group and the computer do not.
        session
            .expect_search()
            .withf(|base, scope, _, attributes| {
                base == "dc=example,dc=org"
                    && *scope == SearchScope::Subtree
                    && *attributes == ["1.1"]
            })
            .returning(|_, _, filter, _| {
                if filter == "(&(objectClass=person)(uid=aruiz))" {
                    Ok(vec![entry("uid=aruiz,ou=People,dc=example,dc=org", &[])])
                } else {
                    Ok(Vec::new())
                }
            });
        let recorder = added.clone();
        session.expect_add().times(2).returning(move |dn, attributes| {
            assert_eq!(attributes[0].0, "objectClass");
            recorder.lock().unwrap().push(dn.to_string());
            Ok(())
        });

        let client = DirectoryClient::with_connector(admin_config(), Box::new(connector_for(session)));
        let report = client
            .insert_all(&[user_with_group(), computer()])
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                added: 2,
                deleted: 0,
                skipped: 1
            }
        );
        assert_eq!(
            *added.lock().unwrap(),
            vec![
                "cn=aruiz,ou=Group,dc=example,dc=org".to_string(),
                "cn=web01,ou=computers,dc=example,dc=org".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn delete_removes_dependents_first_and_skips_missing() {
        let deleted = Arc::new(Mutex::new(Vec::new()));
        let mut session = admin_session();
        session.expect_search().returning(|_, _, filter, _| {
            if filter.contains("web01") {
                Ok(Vec::new())
            } else {
                Ok(vec![entry("cn=match,dc=example,dc=org", &[])])
            }
        });
        let recorder = deleted.clone();
        session.expect_delete().times(2).returning(move |dn| {
            recorder.lock().unwrap().push(dn.to_string());
            Ok(())
        });

        let client = DirectoryClient::with_connector(admin_config(), Box::new(connector_for(session)));
        let report = client
            .delete_all(&[user_with_group(), computer()])
            .await
            .unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            *deleted.lock().unwrap(),
            vec![
                "cn=aruiz,ou=Group,dc=example,dc=org".to_string(),
                "uid=aruiz,ou=People,dc=example,dc=org".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn admin_operation_without_credentials_fails_before_connecting() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().never();

        let client = DirectoryClient::with_connector(base_config(), Box::new(connector));
        let result = client.insert_all(&[computer()]).await;
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn connection_failure_propagates() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().returning(|| {
            Err(Error::ExternalServiceError {
                service: "ldap".to_string(),
                message: "connection refused".to_string(),
            })
        });

        let client = DirectoryClient::with_connector(admin_config(), Box::new(connector));
        let err = client.load_id_pool().await.unwrap_err();
        assert!(matches!(err, Error::ExternalServiceError { .. }));
    }

    fn ldap_failure(message: &str) -> Error {
        Error::ExternalServiceError {
            service: "ldap".to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn failed_add_still_unbinds() {
        let mut session = admin_session();
        session.expect_search().returning(|_, _, _, _| Ok(Vec::new()));
        session
            .expect_add()
            .times(1)
            .returning(|_, _| Err(ldap_failure("insufficient access")));

        let client = DirectoryClient::with_connector(admin_config(), Box::new(connector_for(session)));
        let err = client.insert_all(&[computer()]).await.unwrap_err();
        assert!(err.to_string().contains("insufficient access"));
    }

    #[tokio::test]
    async fn failed_bind_still_unbinds() {
        let mut session = MockLdapSession::new();
        session
            .expect_simple_bind()
            .times(1)
            .returning(|_, _| Err(ldap_failure("invalid credentials")));
        session.expect_search().never();
        session.expect_unbind().times(1).returning(|| Ok(()));

        let client = DirectoryClient::with_connector(admin_config(), Box::new(connector_for(session)));
        let err = client.delete_all(&[computer()]).await.unwrap_err();
        assert!(err.to_string().contains("invalid credentials"));
    }

    #[tokio::test]
    async fn failed_search_keeps_its_error_over_unbind_error() {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().times(1).returning(|_, _| Ok(()));
        session
            .expect_search()
            .times(1)
            .returning(|_, _, _, _| Err(Error::Timeout("LDAP search timed out".to_string())));
        session
            .expect_unbind()
            .times(1)
            .returning(|| Err(ldap_failure("connection closed")));

        let client = DirectoryClient::with_connector(admin_config(), Box::new(connector_for(session)));
        let err = client.load_id_pool().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn load_id_pool_reads_people_and_groups() {
        let mut session = admin_session();
        session
            .expect_search()
            .withf(|base, _, filter, _| {
                base == "ou=People,dc=example,dc=org" && filter == "(objectClass=person)"
            })
            .times(1)
            .returning(|_, _, _, _| {
                Ok(vec![
                    entry(
                        "uid=a,ou=People,dc=example,dc=org",
                        &[("uidNumber", "2000"), ("gidNumber", "2000")],
                    ),
                    entry(
                        "uid=b,ou=People,dc=example,dc=org",
                        &[("uidNumber", "2001"), ("gidNumber", "100")],
                    ),
                    entry("uid=c,ou=People,dc=example,dc=org", &[("uidNumber", "n/a")]),
                ])
            });
        session
            .expect_search()
            .withf(|base, _, filter, _| {
                base == "ou=Group,dc=example,dc=org" && filter == "(objectClass=posixGroup)"
            })
            .times(1)
            .returning(|_, _, _, _| {
                Ok(vec![entry(
                    "cn=staff,ou=Group,dc=example,dc=org",
                    &[("gidNumber", "2002")],
                )])
            });

        let client = DirectoryClient::with_connector(admin_config(), Box::new(connector_for(session)));
        let mut pool = client.load_id_pool().await.unwrap();

        assert_eq!(pool.uids().iter().copied().collect::<Vec<_>>(), vec![2000, 2001]);
        assert_eq!(pool.gids().iter().copied().collect::<Vec<_>>(), vec![100, 2000, 2002]);
        assert_eq!(pool.allocate(2000).unwrap(), 2003);
    }

    #[tokio::test]
    async fn fetch_public_key_binds_anonymously() {
        let mut session = MockLdapSession::new();
        session.expect_simple_bind().never();
        session
            .expect_search()
            .withf(|base, scope, _, attributes| {
                base == "uid=aruiz,ou=People,dc=example,dc=org"
                    && *scope == SearchScope::Base
                    && *attributes == ["sshPublicKey"]
            })
            .returning(|_, _, _, _| {
                Ok(vec![entry(
                    "uid=aruiz,ou=People,dc=example,dc=org",
                    &[("sshPublicKey", "ssh-ed25519 AAAA ana")],
                )])
            });
        session.expect_unbind().returning(|| Ok(()));

        let client = DirectoryClient::with_connector(base_config(), Box::new(connector_for(session)));
        let key = client.fetch_public_key("aruiz").await.unwrap();
        assert_eq!(key, "ssh-ed25519 AAAA ana");
    }

    #[tokio::test]
    async fn fetch_public_key_unknown_user() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .returning(|_, _, _, _| Ok(Vec::new()));
        session.expect_unbind().returning(|| Ok(()));

        let client = DirectoryClient::with_connector(base_config(), Box::new(connector_for(session)));
        let result = client.fetch_public_key("ghost").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn known_hosts_skips_incomplete_entries() {
        let mut session = MockLdapSession::new();
        session
            .expect_search()
            .withf(|base, _, filter, _| {
                base == "ou=computers,dc=example,dc=org" && filter == "(objectClass=device)"
            })
            .returning(|_, _, _, _| {
                Ok(vec![
                    entry(
                        "cn=web01,ou=computers,dc=example,dc=org",
                        &[
                            ("cn", "web01"),
                            ("ipHostNumber", "10.0.0.4"),
                            ("sshPublicKey", "ssh-ed25519 AAAA1"),
                        ],
                    ),
                    entry(
                        "cn=printer,ou=computers,dc=example,dc=org",
                        &[("cn", "printer"), ("ipHostNumber", "10.0.0.9")],
                    ),
                ])
            });
        session.expect_unbind().returning(|| Ok(()));

        let client = DirectoryClient::with_connector(base_config(), Box::new(connector_for(session)));
        let hosts = client.known_hosts().await.unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].line(), "web01,10.0.0.4 ssh-ed25519 AAAA1");
    }

    #[test]
    fn entry_attribute_lookup_ignores_case() {
        let entry = entry("cn=web01,dc=example,dc=org", &[("sshpublickey", "ssh-rsa AAAA")]);
        assert_eq!(entry.first("sshPublicKey"), Some("ssh-rsa AAAA"));
        assert!(entry.values("mail").is_none());
    }

    #[test]
    fn report_display() {
        let report = SyncReport {
            added: 3,
            deleted: 0,
            skipped: 1,
        };
        assert_eq!(report.to_string(), "3 added, 0 deleted, 1 skipped");
    }
}
