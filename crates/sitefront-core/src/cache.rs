//! Normalized GraphQL result cache.
//!
//! Query results are split into entities keyed by identity
//! (`Typename:sys.id`) and a per-query tree that references them. Two
//! queries that select the same entry share one stored copy, so a refetch
//! through either query is visible to both, and invalidating an entry
//! evicts every query result that depends on it.
//!
//! Types without an identity (Contentful's `Sys` and `ContentfulMetadata`)
//! are embedded inline in whatever object contains them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::Schema;

/// Field name used to mark a reference to a stored entity.
pub const REF_FIELD: &str = "__ref";

/// Maximum nesting followed when resolving references.
const MAX_DEPTH: usize = 64;

/// Identifies one query document + variables combination.
pub type QueryKey = u64;

/// Compute the cache key of a query.
pub fn query_key(document: &str, variables: &Value) -> QueryKey {
    let mut input = String::with_capacity(document.len() + 32);
    input.push_str(document);
    input.push('\0');
    input.push_str(&variables.to_string());
    xxhash_rust::xxh3::xxh3_64(input.as_bytes())
}

/// How objects of one GraphQL type are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRule {
    /// Keyed by `sys.id`; stored once and referenced.
    Identity,
    /// Never keyed; embedded in the parent object.
    Embedded,
}

/// Per-typename key rules.
#[derive(Debug, Clone, Default)]
pub struct KeyRules {
    rules: HashMap<String, KeyRule>,
}

impl KeyRules {
    /// Empty rule set. Unknown types fall back to an `id` field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the same rule to every listed typename.
    pub fn with(mut self, typenames: &[&str], rule: KeyRule) -> Self {
        for typename in typenames {
            self.rules.insert((*typename).to_string(), rule);
        }
        self
    }

    /// Rules for the page content model.
    pub fn contentful() -> Self {
        Self::new()
            .with(&["ContentfulMetadata", "Sys"], KeyRule::Embedded)
            .with(
                &[
                    "PageCollection",
                    "Page",
                    "Seo",
                    "PageContentCollection",
                    "PageContent",
                    "PageContentContentCollection",
                ],
                KeyRule::Identity,
            )
    }

    /// Typenames with an explicit rule.
    pub fn typenames(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Rule for a typename, if one was configured.
    pub fn rule(&self, typename: &str) -> Option<KeyRule> {
        self.rules.get(typename).copied()
    }
}

/// Serializable view of part of the cache, for embedding in rendered pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Normalized query trees by hex query key.
    pub queries: BTreeMap<String, Value>,
    /// Entities reachable from those queries.
    pub entities: BTreeMap<String, Map<String, Value>>,
}

#[derive(Debug)]
struct QueryEntry {
    tree: Value,
    refs: HashSet<String>,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct Store {
    entities: HashMap<String, Map<String, Value>>,
    queries: HashMap<QueryKey, QueryEntry>,
}

/// A normalized, schema-aware GraphQL result cache.
#[derive(Debug)]
pub struct NormalizedCache {
    rules: KeyRules,
    schema: Option<Schema>,
    ttl: Option<Duration>,
    store: RwLock<Store>,
}

impl NormalizedCache {
    /// Create a cache with the given key rules and optional schema.
    ///
    /// Rules naming a type the schema does not know are logged, since they
    /// can never match a response.
    pub fn new(rules: KeyRules, schema: Option<Schema>) -> Self {
        if let Some(schema) = &schema {
            for typename in rules.typenames() {
                if !schema.has_type(typename) {
                    tracing::warn!(typename = %typename, "cache key rule names a type missing from the schema");
                }
            }
        }

        Self {
            rules,
            schema,
            ttl: None,
            store: RwLock::new(Store::default()),
        }
    }

    /// Treat query results older than `ttl` as missing.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Schema used for key inference, if loaded.
    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Compute the entity key of an object, or `None` if it is embedded.
    pub fn key_for(&self, object: &Map<String, Value>) -> Option<String> {
        let typename = object.get("__typename")?.as_str()?;

        let rule = self.rules.rule(typename).or_else(|| {
            self.schema
                .as_ref()
                .filter(|schema| schema.has_field(typename, "sys"))
                .map(|_| KeyRule::Identity)
        });

        let id = match rule {
            Some(KeyRule::Embedded) => return None,
            Some(KeyRule::Identity) => object.get("sys")?.get("id")?.as_str()?,
            None => object.get("id")?.as_str()?,
        };

        if id.is_empty() {
            return None;
        }
        Some(format!("{typename}:{id}"))
    }

    /// Store a query result, merging its entities into the entity table.
    pub fn write(&self, key: QueryKey, data: &Value) {
        let mut store = self.store.write();
        let mut refs = HashSet::new();
        let tree = self.normalize(data, &mut store.entities, &mut refs);
        tracing::trace!(query = key, entities = refs.len(), "cache write");
        store.queries.insert(
            key,
            QueryEntry {
                tree,
                refs,
                stored_at: Instant::now(),
            },
        );
    }

    /// Read a query result.
    ///
    /// Returns `None` when the query was never stored, has expired, or
    /// references an entity that has since been invalidated.
    pub fn read(&self, key: QueryKey) -> Option<Value> {
        let store = self.store.read();
        let entry = store.queries.get(&key)?;
        if let Some(ttl) = self.ttl
            && entry.stored_at.elapsed() > ttl
        {
            return None;
        }
        denormalize(&entry.tree, &store.entities, 0)
    }

    /// Read a query result only if it was written at or after `since`.
    ///
    /// Lets a caller that waited on an identical in-flight request pick up
    /// that request's result instead of issuing its own.
    pub fn read_since(&self, key: QueryKey, since: Instant) -> Option<Value> {
        let store = self.store.read();
        let entry = store.queries.get(&key)?;
        if entry.stored_at < since {
            return None;
        }
        denormalize(&entry.tree, &store.entities, 0)
    }

    /// Read a single entity with its references resolved.
    pub fn entity(&self, typename: &str, id: &str) -> Option<Value> {
        let store = self.store.read();
        let object = store.entities.get(&format!("{typename}:{id}"))?;
        denormalize(&Value::Object(object.clone()), &store.entities, 0)
    }

    /// Drop an entity and every query result that references it, directly
    /// or through another entity.
    ///
    /// Returns the number of query results evicted.
    pub fn invalidate_entity(&self, typename: &str, id: &str) -> usize {
        let key = format!("{typename}:{id}");
        let mut store = self.store.write();
        let Store { entities, queries } = &mut *store;
        entities.remove(&key);
        let entities = &*entities;

        let before = queries.len();
        queries.retain(|_, entry| {
            !entry.refs.contains(&key) && denormalize(&entry.tree, entities, 0).is_some()
        });
        let evicted = before - queries.len();

        tracing::debug!(entity = %key, evicted, "cache entity invalidated");
        evicted
    }

    /// Drop one query result, leaving its entities in place.
    pub fn invalidate_query(&self, key: QueryKey) -> bool {
        self.store.write().queries.remove(&key).is_some()
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut store = self.store.write();
        store.entities.clear();
        store.queries.clear();
    }

    /// Number of stored entities.
    pub fn entity_count(&self) -> usize {
        self.store.read().entities.len()
    }

    /// Number of stored query results.
    pub fn query_count(&self) -> usize {
        self.store.read().queries.len()
    }

    /// Snapshot the given queries and every entity they reach.
    pub fn extract(&self, keys: &[QueryKey]) -> CacheSnapshot {
        let store = self.store.read();
        let mut snapshot = CacheSnapshot::default();
        let mut pending: Vec<String> = Vec::new();

        for key in keys {
            if let Some(entry) = store.queries.get(key) {
                snapshot.queries.insert(format!("{key:016x}"), entry.tree.clone());
                pending.extend(entry.refs.iter().cloned());
            }
        }

        while let Some(entity_key) = pending.pop() {
            if snapshot.entities.contains_key(&entity_key) {
                continue;
            }
            if let Some(object) = store.entities.get(&entity_key) {
                collect_refs(&Value::Object(object.clone()), &mut pending);
                snapshot.entities.insert(entity_key, object.clone());
            }
        }

        snapshot
    }

    /// Load a snapshot produced by [`NormalizedCache::extract`].
    pub fn restore(&self, snapshot: &CacheSnapshot) {
        let mut store = self.store.write();
        for (key, object) in &snapshot.entities {
            let entity = store.entities.entry(key.clone()).or_default();
            for (field, value) in object {
                entity.insert(field.clone(), value.clone());
            }
        }
        for (hex_key, tree) in &snapshot.queries {
            let Ok(key) = QueryKey::from_str_radix(hex_key, 16) else {
                tracing::warn!(key = %hex_key, "skipping snapshot query with malformed key");
                continue;
            };
            let mut refs = Vec::new();
            collect_refs(tree, &mut refs);
            store.queries.insert(
                key,
                QueryEntry {
                    tree: tree.clone(),
                    refs: refs.into_iter().collect(),
                    stored_at: Instant::now(),
                },
            );
        }
    }

    fn normalize(
        &self,
        value: &Value,
        entities: &mut HashMap<String, Map<String, Value>>,
        refs: &mut HashSet<String>,
    ) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.normalize(item, entities, refs))
                    .collect(),
            ),
            Value::Object(object) => {
                let mut normalized = Map::with_capacity(object.len());
                for (field, child) in object {
                    normalized.insert(field.clone(), self.normalize(child, entities, refs));
                }

                match self.key_for(object) {
                    Some(key) => {
                        let entity = entities.entry(key.clone()).or_default();
                        for (field, child) in normalized {
                            entity.insert(field, child);
                        }
                        refs.insert(key.clone());
                        make_ref(key)
                    }
                    None => Value::Object(normalized),
                }
            }
            other => other.clone(),
        }
    }
}

fn make_ref(key: String) -> Value {
    let mut object = Map::with_capacity(1);
    object.insert(REF_FIELD.to_string(), Value::String(key));
    Value::Object(object)
}

fn ref_key(object: &Map<String, Value>) -> Option<&str> {
    if object.len() != 1 {
        return None;
    }
    object.get(REF_FIELD)?.as_str()
}

fn denormalize(
    value: &Value,
    entities: &HashMap<String, Map<String, Value>>,
    depth: usize,
) -> Option<Value> {
    if depth > MAX_DEPTH {
        return None;
    }

    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| denormalize(item, entities, depth + 1))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Value::Object(object) => {
            if let Some(key) = ref_key(object) {
                let entity = entities.get(key)?;
                return denormalize(&Value::Object(entity.clone()), entities, depth + 1);
            }

            let mut resolved = Map::with_capacity(object.len());
            for (field, child) in object {
                resolved.insert(field.clone(), denormalize(child, entities, depth + 1)?);
            }
            Some(Value::Object(resolved))
        }
        other => Some(other.clone()),
    }
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        Value::Object(object) => {
            if let Some(key) = ref_key(object) {
                out.push(key.to_string());
            } else {
                object.values().for_each(|child| collect_refs(child, out));
            }
        }
        _ => {}
    }
}
