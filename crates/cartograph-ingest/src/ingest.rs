//! Line-by-line reconciliation of NDJSON observations.

use anyhow::Context as _;
use cartograph_core::{
  Entity, Error, Relationship, hook,
  reconcile::{Mode, Outcome, Reconciler, Write},
  store::GraphStore,
};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _};

/// One input line. Exactly one of `entity` and `relationship` is set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Line {
  #[serde(default)]
  entity:       Option<Entity>,
  #[serde(default)]
  mode:         Option<Mode>,
  #[serde(default)]
  relationship: Option<Relationship>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
  pub inserted:  u64,
  pub updated:   u64,
  pub unchanged: u64,
  /// Malformed lines, failed hooks, and invalid keys.
  pub rejected:  u64,
}

impl Summary {
  fn count<T>(&mut self, outcome: &Outcome<T>) {
    match outcome.write {
      Write::Insert => self.inserted += 1,
      Write::Update => self.updated += 1,
      Write::None => self.unchanged += 1,
    }
  }
}

/// Reconcile every line of `reader`. Bad lines are logged and skipped;
/// only store failures abort the run.
pub async fn run<R, S>(
  reader: R,
  reconciler: &Reconciler<'_, S>,
  default_mode: Mode,
) -> anyhow::Result<Summary>
where
  R: AsyncBufRead + Unpin,
  S: GraphStore,
{
  let mut summary = Summary::default();
  let mut lines = reader.lines();
  let mut number = 0_usize;

  while let Some(raw) = lines.next_line().await.context("failed to read input")? {
    number += 1;
    if raw.trim().is_empty() {
      continue;
    }

    let line: Line = match serde_json::from_str(&raw) {
      Ok(line) => line,
      Err(error) => {
        tracing::warn!(line = number, %error, "skipping malformed line");
        summary.rejected += 1;
        continue;
      }
    };

    let result = match line {
      Line { entity: Some(entity), relationship: None, mode } => {
        ingest_entity(reconciler, entity, mode.unwrap_or(default_mode), &mut summary)
          .await
      }
      Line { entity: None, relationship: Some(relationship), .. } => {
        ingest_relationship(reconciler, relationship, &mut summary).await
      }
      _ => {
        tracing::warn!(
          line = number,
          "skipping line without exactly one of `entity` and `relationship`"
        );
        summary.rejected += 1;
        continue;
      }
    };

    match result {
      Ok(()) => {}
      Err(error @ (Error::Store(_) | Error::RetriesExhausted { .. })) => {
        return Err(error).with_context(|| format!("line {number}"));
      }
      Err(error) => {
        tracing::warn!(line = number, %error, "rejected");
        summary.rejected += 1;
      }
    }
  }

  Ok(summary)
}

async fn ingest_entity<S: GraphStore>(
  reconciler: &Reconciler<'_, S>,
  mut entity: Entity,
  mode: Mode,
  summary: &mut Summary,
) -> cartograph_core::Result<()> {
  entity.prepare()?;
  let outcome = reconciler.reconcile_entity(entity, mode).await?;
  tracing::debug!(key = outcome.value.key(), write = %outcome.write, "entity");
  summary.count(&outcome);
  Ok(())
}

/// Endpoints are visited into the graph before the edge itself.
async fn ingest_relationship<S: GraphStore>(
  reconciler: &Reconciler<'_, S>,
  relationship: Relationship,
  summary: &mut Summary,
) -> cartograph_core::Result<()> {
  let relationship = hook::prepare(relationship)?;
  for endpoint in [&relationship.source, &relationship.target] {
    let outcome = reconciler
      .reconcile_entity(endpoint.as_ref().clone(), Mode::Visit)
      .await?;
    summary.count(&outcome);
  }
  let outcome = reconciler.reconcile_relationship(relationship).await?;
  tracing::debug!(key = outcome.value.key(), write = %outcome.write, "relationship");
  summary.count(&outcome);
  Ok(())
}

#[cfg(test)]
mod tests {
  use cartograph_core::source::Source;
  use cartograph_store_sqlite::SqliteStore;

  use super::*;

  async fn ingest(input: &str) -> (Summary, SqliteStore) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let summary = {
      let reconciler = Reconciler::new(&store);
      run(input.as_bytes(), &reconciler, Mode::Merge).await.unwrap()
    };
    (summary, store)
  }

  const ASSET: &str =
    r#"{"entity": {"type": "asset", "dns": "example.com", "name": "www.example.com"}}"#;

  #[tokio::test]
  async fn repeated_entity_lines_insert_once() {
    let input = format!("{ASSET}\n{ASSET}\n");
    let (summary, store) = ingest(&input).await;
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.inserted + summary.updated + summary.unchanged, 2);
    assert_eq!(store.counts().await.unwrap(), (1, 0));
  }

  #[tokio::test]
  async fn malformed_and_invalid_lines_are_skipped() {
    let input = [
      "not json",
      r#"{"entity": {"type": "asset", "dns": "", "name": ""}}"#,
      r#"{"mode": "visit"}"#,
      "",
      ASSET,
    ]
    .join("\n");
    let (summary, store) = ingest(&input).await;
    assert_eq!(summary.rejected, 3);
    assert_eq!(summary.inserted, 1);
    assert_eq!(store.counts().await.unwrap(), (1, 0));
  }

  #[tokio::test]
  async fn relationship_lines_store_endpoints_and_one_edge() {
    let edge = r#"{"relationship": {
      "label": "HAS_WEBPAGE",
      "source": {"type": "web_application", "primary_url": "https://example.com"},
      "target": {"type": "webpage", "url": "https://example.com/login"}
    }}"#
      .replace('\n', " ");
    let input = format!("{edge}\n{edge}\n");
    let (summary, store) = ingest(&input).await;

    assert_eq!(summary.rejected, 0);
    assert_eq!(store.counts().await.unwrap(), (2, 1));
    let from = store
      .relationships_from("#webapplication#https://example.com/")
      .await
      .unwrap();
    assert_eq!(from.len(), 1);
    assert!(from[0].key().contains("#HAS_WEBPAGE#"));
  }

  #[tokio::test]
  async fn line_mode_overrides_the_default() {
    let seed = r#"{"entity": {"type": "asset", "dns": "example.com", "name": "www.example.com", "source": "seed"}, "mode": "visit"}"#;
    let input = format!("{ASSET}\n{seed}\n");
    let (_, store) = ingest(&input).await;
    let stored = store
      .fetch_entity("#asset#example.com#www.example.com")
      .await
      .unwrap()
      .unwrap()
      .value;
    // Visit never promotes a source.
    assert_eq!(stored.lifecycle().unwrap().source, Source::Discovered);
  }
}
