use crate::store::Store;
use crate::types::{Connection, ConnectionKind, CuratorError, Item, Result};
use tracing::{debug, info};
use uuid::Uuid;

/// Cosine similarity at or above this creates a semantic connection.
pub const SEMANTIC_THRESHOLD: f64 = 0.7;

/// Non-semantic connections below this strength are dropped; keeps
/// single-token coincidental matches out of the graph.
pub const MIN_STRENGTH: f64 = 0.3;

/// A connected counterpart as returned by [`find_related`].
#[derive(Debug, Clone)]
pub struct RelatedItem {
    pub item: Item,
    pub kind: ConnectionKind,
    pub strength: f64,
    pub shared_elements: Vec<String>,
}

/// Cosine similarity of two vectors; 0 for mismatched dimensions or
/// zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Decide whether two items are related: semantic similarity first, then
/// shared topics, then shared entities. Returns kind, strength, and the
/// shared elements, or None when no connection should exist.
pub fn evaluate_pair(a: &Item, b: &Item) -> Option<(ConnectionKind, f64, Vec<String>)> {
    let shared_topics = shared_elements(&a.topics, &b.topics);
    let shared_entities = shared_elements(&a.entities, &b.entities);

    if let (Some(embedding_a), Some(embedding_b)) = (&a.embedding, &b.embedding) {
        let similarity = cosine_similarity(embedding_a, embedding_b);
        if similarity >= SEMANTIC_THRESHOLD {
            let mut shared = shared_topics;
            shared.extend(shared_entities);
            shared.sort();
            shared.dedup();
            return Some((ConnectionKind::Semantic, similarity, shared));
        }
    }

    let candidate = if !shared_topics.is_empty() {
        let strength =
            shared_topics.len() as f64 / a.topics.len().max(b.topics.len()) as f64;
        Some((ConnectionKind::Topic, strength, shared_topics))
    } else if !shared_entities.is_empty() {
        let strength =
            shared_entities.len() as f64 / a.entities.len().max(b.entities.len()) as f64;
        Some((ConnectionKind::Entity, strength, shared_entities))
    } else {
        None
    };

    match candidate {
        Some((_, strength, _)) if strength < MIN_STRENGTH => None,
        other => other,
    }
}

/// Case-insensitive set intersection, lowercased and sorted.
fn shared_elements(a: &[String], b: &[String]) -> Vec<String> {
    let b_lower: Vec<String> = b.iter().map(|v| v.to_lowercase()).collect();
    let mut shared: Vec<String> = a
        .iter()
        .map(|v| v.to_lowercase())
        .filter(|v| b_lower.contains(v))
        .collect();
    shared.sort();
    shared.dedup();
    shared
}

/// Evaluate one item against every other stored item, creating any
/// missing connections. Returns the number created.
pub async fn connect_item(store: &Store, item_id: Uuid) -> Result<usize> {
    let item = store.item(item_id).await?;
    let others = store.all_items().await?;
    let mut created = 0;
    for other in others.iter().filter(|o| o.id != item.id) {
        if store.connection_exists(item.id, other.id).await? {
            continue;
        }
        if let Some((kind, strength, shared)) = evaluate_pair(&item, other) {
            store
                .insert_connection(&Connection {
                    id: Uuid::new_v4(),
                    item_a_id: item.id,
                    item_b_id: other.id,
                    kind,
                    strength,
                    shared_elements: shared,
                })
                .await?;
            created += 1;
        }
    }
    debug!("item {}: {} new connections", item_id, created);
    Ok(created)
}

/// Drop the whole graph and evaluate every pair once.
pub async fn rebuild_all(store: &Store) -> Result<usize> {
    let removed = store.delete_all_connections().await?;
    let items = store.all_items().await?;
    let mut created = 0;
    for (index, a) in items.iter().enumerate() {
        for b in items.iter().skip(index + 1) {
            if let Some((kind, strength, shared)) = evaluate_pair(a, b) {
                store
                    .insert_connection(&Connection {
                        id: Uuid::new_v4(),
                        item_a_id: a.id,
                        item_b_id: b.id,
                        kind,
                        strength,
                        shared_elements: shared,
                    })
                    .await?;
                created += 1;
            }
        }
    }
    info!("rebuilt connection graph: {removed} removed, {created} created");
    Ok(created)
}

/// Up to `limit` items connected to `item_id`, strongest first. A
/// connection whose counterpart item is gone is skipped, not an error.
pub async fn find_related(store: &Store, item_id: Uuid, limit: usize) -> Result<Vec<RelatedItem>> {
    let mut related = Vec::new();
    for connection in store.connections_for_item(item_id).await? {
        if related.len() >= limit {
            break;
        }
        let counterpart_id = if connection.item_a_id == item_id {
            connection.item_b_id
        } else {
            connection.item_a_id
        };
        match store.item(counterpart_id).await {
            Ok(item) => related.push(RelatedItem {
                item,
                kind: connection.kind,
                strength: connection.strength,
                shared_elements: connection.shared_elements,
            }),
            Err(CuratorError::ItemNotFound { .. }) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(related)
}
