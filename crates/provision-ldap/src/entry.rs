//! Entry descriptors: what to add to or remove from the directory.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::dn::DistinguishedName;

/// How to tell whether an entry already exists: an object class plus its naming attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryLookup {
    object_class: String,
    attribute: String,
    value: String,
}

impl EntryLookup {
    /// Creates a lookup for `(&(objectClass=<object_class>)(<attribute>=<value>))`.
    #[must_use]
    pub fn new(
        object_class: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            object_class: object_class.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Renders the search filter, escaping the value.
    #[must_use]
    pub fn filter(&self) -> String {
        format!(
            "(&(objectClass={})({}={}))",
            self.object_class,
            self.attribute,
            escape_filter_value(&self.value)
        )
    }
}

/// One directory entry together with the entries that depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDescriptor {
    /// Distinguished name of the entry.
    pub dn: DistinguishedName,
    /// Object classes in declaration order.
    pub object_classes: Vec<String>,
    /// Attribute values keyed by attribute name (without `objectClass`).
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Existence check.
    pub lookup: EntryLookup,
    /// Entries created after this one and removed before it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntryDescriptor>,
}

impl EntryDescriptor {
    /// Creates a new builder with the required fields.
    #[must_use]
    pub fn builder(dn: DistinguishedName, lookup: EntryLookup) -> EntryDescriptorBuilder {
        EntryDescriptorBuilder {
            dn,
            lookup,
            object_classes: Vec::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// First value of an attribute.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Name used in progress messages: the `cn`, or the DN when there is none.
    #[must_use]
    pub fn label(&self) -> &str {
        self.first("cn").unwrap_or_else(|| self.dn.as_str())
    }

    /// This entry followed by its dependents, depth first: the order entries must be added in.
    #[must_use]
    pub fn creation_order(&self) -> Vec<&EntryDescriptor> {
        let mut order = vec![self];
        for child in &self.children {
            order.extend(child.creation_order());
        }
        order
    }

    /// Dependents before the entry itself: the order entries must be deleted in.
    #[must_use]
    pub fn removal_order(&self) -> Vec<&EntryDescriptor> {
        let mut order: Vec<&EntryDescriptor> = self
            .children
            .iter()
            .rev()
            .flat_map(EntryDescriptor::removal_order)
            .collect();
        order.push(self);
        order
    }

    /// Attribute list for an LDAP add request, `objectClass` first.
    #[must_use]
    pub fn add_request(&self) -> Vec<(String, Vec<String>)> {
        std::iter::once(("objectClass".to_string(), self.object_classes.clone()))
            .chain(
                self.attributes
                    .iter()
                    .map(|(name, values)| (name.clone(), values.clone())),
            )
            .collect()
    }
}

impl fmt::Display for EntryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Builder for [`EntryDescriptor`].
#[derive(Debug)]
pub struct EntryDescriptorBuilder {
    dn: DistinguishedName,
    lookup: EntryLookup,
    object_classes: Vec<String>,
    attributes: BTreeMap<String, Vec<String>>,
    children: Vec<EntryDescriptor>,
}

impl EntryDescriptorBuilder {
    /// Sets the object classes.
    #[must_use]
    pub fn object_classes(mut self, classes: &[&str]) -> Self {
        self.object_classes = classes.iter().map(|class| (*class).to_string()).collect();
        self
    }

    /// Sets a single-valued attribute, replacing any previous value.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), vec![value.into()]);
        self
    }

    /// Copies every attribute from `attributes`.
    #[must_use]
    pub fn attributes<'a, I>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in attributes {
            self.attributes.insert(name.clone(), vec![value.clone()]);
        }
        self
    }

    /// Appends a dependent entry.
    #[must_use]
    pub fn child(mut self, child: EntryDescriptor) -> Self {
        self.children.push(child);
        self
    }

    /// Builds the [`EntryDescriptor`].
    #[must_use]
    pub fn build(self) -> EntryDescriptor {
        EntryDescriptor {
            dn: self.dn,
            object_classes: self.object_classes,
            attributes: self.attributes,
            lookup: self.lookup,
            children: self.children,
        }
    }
}

/// Escapes a value for use inside an LDAP search filter (RFC 4515).
pub(crate) fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntryDescriptor {
        let dn = DistinguishedName::parse("cn=web01,ou=computers,dc=example,dc=org").unwrap();
        EntryDescriptor::builder(dn, EntryLookup::new("device", "cn", "web01"))
            .object_classes(&["top", "device"])
            .attribute("cn", "web01")
            .attribute("ipHostNumber", "10.0.0.4")
            .build()
    }

    #[test]
    fn lookup_filter_escapes_value() {
        let lookup = EntryLookup::new("person", "uid", "j*doe(admin)");
        assert_eq!(
            lookup.filter(),
            "(&(objectClass=person)(uid=j\\2adoe\\28admin\\29))"
        );
    }

    #[test]
    fn add_request_lists_object_classes_first() {
        let request = sample().add_request();
        assert_eq!(request[0].0, "objectClass");
        assert_eq!(request[0].1, vec!["top".to_string(), "device".to_string()]);
        assert_eq!(request.len(), 3);
        assert!(request
            .iter()
            .any(|(name, values)| name == "ipHostNumber" && values == &vec!["10.0.0.4".to_string()]));
    }

    #[test]
    fn label_prefers_common_name() {
        let entry = sample();
        assert_eq!(entry.to_string(), "web01");

        let dn = DistinguishedName::parse("uid=x,dc=example,dc=org").unwrap();
        let unnamed = EntryDescriptor::builder(dn, EntryLookup::new("person", "uid", "x")).build();
        assert_eq!(unnamed.label(), "uid=x,dc=example,dc=org");
    }

    #[test]
    fn dependents_are_created_after_and_removed_before() {
        let base = DistinguishedName::parse("dc=example,dc=org").unwrap();
        let leaf = |name: &str| {
            EntryDescriptor::builder(base.child("cn", name), EntryLookup::new("top", "cn", name))
                .attribute("cn", name)
                .build()
        };
        let parent = EntryDescriptor::builder(
            base.child("uid", "jdoe"),
            EntryLookup::new("person", "uid", "jdoe"),
        )
        .attribute("cn", "parent")
        .child(leaf("first"))
        .child(leaf("second"))
        .build();

        let created: Vec<&str> = parent.creation_order().into_iter().map(EntryDescriptor::label).collect();
        assert_eq!(created, vec!["parent", "first", "second"]);

        let removed: Vec<&str> = parent.removal_order().into_iter().map(EntryDescriptor::label).collect();
        assert_eq!(removed, vec!["second", "first", "parent"]);
    }

    #[test]
    fn escape_backslash_and_nul() {
        assert_eq!(escape_filter_value("a\\b\0"), "a\\5cb\\00");
        assert_eq!(escape_filter_value("plain"), "plain");
    }
}
