//! Read-only lookup structures built once per query from caller-owned data.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
  model::{Entity, Model, Person},
  relationship::{Label, Relationship},
};

/// People by lowercased email and by exact name.
#[derive(Debug, Default)]
pub struct PersonIndex<'a> {
  by_email: BTreeMap<String, &'a Person>,
  by_name:  BTreeMap<&'a str, Vec<&'a Person>>,
}

impl<'a> PersonIndex<'a> {
  pub fn build(people: &'a [Person]) -> Self {
    let mut index = Self::default();
    for person in people {
      if !person.email.is_empty() {
        index
          .by_email
          .entry(person.email.to_lowercase())
          .or_insert(person);
      }
      if !person.name.is_empty() {
        index.by_name.entry(person.name.as_str()).or_default().push(person);
      }
    }
    index
  }

  /// The first person indexed with this email, ignoring case.
  pub fn by_email(&self, email: &str) -> Option<&'a Person> {
    self.by_email.get(&email.trim().to_lowercase()).copied()
  }

  pub fn by_name(&self, name: &str) -> &[&'a Person] {
    self.by_name.get(name).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn len(&self) -> usize { self.by_email.len() }

  pub fn is_empty(&self) -> bool {
    self.by_email.is_empty() && self.by_name.is_empty()
  }
}

/// Organisation membership, from `WORKS_FOR` edges (person → organisation).
#[derive(Debug, Default)]
pub struct OrganizationIndex {
  members:       BTreeMap<String, BTreeSet<String>>,
  organizations: BTreeMap<String, BTreeSet<String>>,
}

impl OrganizationIndex {
  /// Edges with any other label, or whose endpoints are not a person and an
  /// organisation, are ignored.
  pub fn build<'r>(
    relationships: impl IntoIterator<Item = &'r Relationship>,
  ) -> Self {
    let mut index = Self::default();
    for relationship in relationships {
      if relationship.label != Label::WorksFor {
        continue;
      }
      let (Entity::Person(person), Entity::Organization(org)) =
        relationship.nodes()
      else {
        tracing::debug!(
          key = relationship.key(),
          "skipping WORKS_FOR edge with unexpected endpoints"
        );
        continue;
      };
      index
        .members
        .entry(org.key().to_owned())
        .or_default()
        .insert(person.key().to_owned());
      index
        .organizations
        .entry(person.key().to_owned())
        .or_default()
        .insert(org.key().to_owned());
    }
    index
  }

  /// Keys of the people working for `organization_key`, sorted.
  pub fn members(&self, organization_key: &str) -> impl Iterator<Item = &str> {
    self
      .members
      .get(organization_key)
      .into_iter()
      .flatten()
      .map(String::as_str)
  }

  /// Keys of the organisations `person_key` works for, sorted.
  pub fn organizations_of(
    &self,
    person_key: &str,
  ) -> impl Iterator<Item = &str> {
    self
      .organizations
      .get(person_key)
      .into_iter()
      .flatten()
      .map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    hook::prepare,
    model::Organization,
  };

  fn person(name: &str, email: &str) -> Person {
    prepare(Person::new(name, email)).unwrap()
  }

  #[test]
  fn person_lookup_by_email_ignores_case() {
    let people = vec![
      person("Alice", "alice@example.com"),
      person("Bob", "bob@example.com"),
    ];
    let index = PersonIndex::build(&people);
    assert_eq!(index.by_email("ALICE@example.com").unwrap().name, "Alice");
    assert!(index.by_email("carol@example.com").is_none());
    assert_eq!(index.len(), 2);
  }

  #[test]
  fn person_lookup_by_name_is_exact() {
    let people = vec![
      person("Alice", "alice@example.com"),
      person("Alice", "alice@corp.example"),
    ];
    let index = PersonIndex::build(&people);
    assert_eq!(index.by_name("Alice").len(), 2);
    assert!(index.by_name("alice").is_empty());
  }

  #[test]
  fn organization_membership_both_ways() {
    let alice = person("Alice", "alice@example.com");
    let bob = person("Bob", "bob@example.com");
    let acme = prepare(Organization::new("Acme")).unwrap();
    let edges = vec![
      prepare(Relationship::new(alice.clone(), Label::WorksFor, acme.clone()))
        .unwrap(),
      prepare(Relationship::new(bob.clone(), Label::WorksFor, acme.clone()))
        .unwrap(),
      prepare(Relationship::new(alice.clone(), Label::HasAttribute, acme.clone()))
        .unwrap(),
    ];

    let index = OrganizationIndex::build(&edges);
    let mut members: Vec<_> = index.members(acme.key()).collect();
    members.sort();
    assert_eq!(members, vec![alice.key(), bob.key()]);
    assert_eq!(
      index.organizations_of(alice.key()).collect::<Vec<_>>(),
      vec![acme.key()]
    );
    assert_eq!(index.members("#organization#nobody").count(), 0);
  }

  #[test]
  fn reversed_works_for_edges_are_ignored() {
    let alice = person("Alice", "alice@example.com");
    let acme = prepare(Organization::new("Acme")).unwrap();
    let edges =
      vec![prepare(Relationship::new(acme, Label::WorksFor, alice)).unwrap()];
    let index = OrganizationIndex::build(&edges);
    assert_eq!(index.organizations_of("#person#alice@example.com#alice").count(), 0);
  }
}
