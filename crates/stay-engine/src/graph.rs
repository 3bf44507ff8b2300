//! The knowledge base contract and an in-memory graph store implementing it.
//!
//! A knowledge base holds `Unit` nodes linked by `hasAvailability` edges to
//! `AvailabilityPeriod` nodes. The search core only ever reads it, through a
//! [`KbSession`] opened once per search and released when dropped.
//!
//! [`GraphStore`] is the bundled implementation. Its native result order is edge
//! insertion order, which is the order units and their periods appear in the
//! source document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::predicate::{Attribute, Comparison, Literal, LiteralKind, PreparedQuery};

/// A rentable unit. Read-only from the search's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    pub address: String,
    pub image: String,
    pub nearest_city: String,
    pub capacity: u32,
    pub bedrooms: u32,
    pub lake_distance: f64,
    pub city_distance: f64,
}

/// A span during which a unit is (or is not) free. Both ends are dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPeriod {
    pub is_free: bool,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One result row: a unit's attributes bound together with the period that matched.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitBinding {
    pub unit_id: String,
    pub address: String,
    pub image: String,
    pub nearest_city: String,
    pub capacity: u32,
    pub bedrooms: u32,
    pub lake_distance: f64,
    pub city_distance: f64,
    pub period: AvailabilityPeriod,
}

impl UnitBinding {
    fn bind(unit: &Unit, period: &AvailabilityPeriod) -> Self {
        Self {
            unit_id: unit.id.clone(),
            address: unit.address.clone(),
            image: unit.image.clone(),
            nearest_city: unit.nearest_city.clone(),
            capacity: unit.capacity,
            bedrooms: unit.bedrooms,
            lake_distance: unit.lake_distance,
            city_distance: unit.city_distance,
            period: *period,
        }
    }
}

/// Anything that can answer unit/availability pattern queries.
pub trait KnowledgeBase: Send + Sync {
    /// Acquire a read-only session. Dropping the session releases it.
    fn open(&self) -> StoreResult<Box<dyn KbSession + '_>>;
}

/// A live, read-only connection to a knowledge base.
pub trait KbSession: Send + Sync {
    /// Evaluate `query`, honoring its `ORDER BY`, giving up at `deadline`.
    fn select(&self, query: &PreparedQuery, deadline: Instant) -> StoreResult<Vec<UnitBinding>>;
}

/// Opaque handle to a unit node inside a [`GraphStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(usize);

#[derive(Debug, Clone, Copy)]
struct Edge {
    unit: usize,
    period: usize,
}

/// Node and edge counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub units: usize,
    pub periods: usize,
    pub free_periods: usize,
    pub edges: usize,
}

/// In-memory knowledge base.
#[derive(Debug, Default)]
pub struct GraphStore {
    units: Vec<Unit>,
    periods: Vec<AvailabilityPeriod>,
    edges: Vec<Edge>,
    by_id: HashMap<String, usize>,
    offline: bool,
    open_sessions: AtomicUsize,
}

#[derive(Deserialize)]
struct Document {
    units: Vec<UnitRecord>,
}

#[derive(Deserialize)]
struct UnitRecord {
    #[serde(flatten)]
    unit: Unit,
    #[serde(default)]
    availability: Vec<AvailabilityPeriod>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses every session, standing in for an unreachable backend.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Parse a `{"units": [...]}` document.
    ///
    /// # Errors
    /// Returns `StoreError::Load` on malformed JSON, duplicate unit ids, or a
    /// period that ends before it starts.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let doc: Document =
            serde_json::from_str(json).map_err(|e| StoreError::Load(e.to_string()))?;
        let mut store = Self::new();
        for record in doc.units {
            let id = store.insert_unit(record.unit)?;
            for period in record.availability {
                store.link_period(id, period)?;
            }
        }
        debug!(units = store.units.len(), edges = store.edges.len(), "graph store loaded");
        Ok(store)
    }

    /// Read and parse a document from disk.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Add a unit node.
    ///
    /// # Errors
    /// Returns `StoreError::Load` if a unit with the same id already exists.
    pub fn insert_unit(&mut self, unit: Unit) -> StoreResult<UnitId> {
        if self.by_id.contains_key(&unit.id) {
            return Err(StoreError::Load(format!("duplicate unit id '{}'", unit.id)));
        }
        let idx = self.units.len();
        self.by_id.insert(unit.id.clone(), idx);
        self.units.push(unit);
        Ok(UnitId(idx))
    }

    /// Add a period node and a `hasAvailability` edge from `unit` to it.
    pub fn link_period(&mut self, unit: UnitId, period: AvailabilityPeriod) -> StoreResult<()> {
        let owner = self
            .units
            .get(unit.0)
            .ok_or_else(|| StoreError::Load(format!("no unit node #{}", unit.0)))?;
        if period.end < period.start {
            return Err(StoreError::Load(format!(
                "unit '{}': period ends ({}) before it starts ({})",
                owner.id, period.end, period.start
            )));
        }
        self.periods.push(period);
        self.edges.push(Edge {
            unit: unit.0,
            period: self.periods.len() - 1,
        });
        Ok(())
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.by_id.get(id).map(|&idx| &self.units[idx])
    }

    /// Periods linked to unit `id`, in edge order. Empty for unknown ids.
    pub fn periods_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a AvailabilityPeriod> + 'a {
        let owner = self.by_id.get(id).copied();
        self.edges
            .iter()
            .filter(move |e| Some(e.unit) == owner)
            .map(move |e| &self.periods[e.period])
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            units: self.units.len(),
            periods: self.periods.len(),
            free_periods: self.periods.iter().filter(|p| p.is_free).count(),
            edges: self.edges.len(),
        }
    }

    /// Sessions currently held open against this store.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

impl KnowledgeBase for GraphStore {
    fn open(&self) -> StoreResult<Box<dyn KbSession + '_>> {
        if self.offline {
            return Err(StoreError::Unavailable("graph store is offline".to_string()));
        }
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StoreSession { store: self }))
    }
}

struct StoreSession<'a> {
    store: &'a GraphStore,
}

impl Drop for StoreSession<'_> {
    fn drop(&mut self) {
        self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
        debug!("graph store session closed");
    }
}

/// A filter with its parameter already resolved.
struct BoundFilter<'q> {
    attribute: Attribute,
    op: Comparison,
    value: &'q Literal,
}

/// A borrowed attribute value read off a `(unit, period)` pair.
enum Cell<'a> {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(&'a str),
    Date(NaiveDate),
}

fn read<'a>(attribute: Attribute, unit: &'a Unit, period: &AvailabilityPeriod) -> Cell<'a> {
    match attribute {
        Attribute::Capacity => Cell::Int(i64::from(unit.capacity)),
        Attribute::Bedrooms => Cell::Int(i64::from(unit.bedrooms)),
        Attribute::LakeDistance => Cell::Float(unit.lake_distance),
        Attribute::CityDistance => Cell::Float(unit.city_distance),
        Attribute::NearestCity => Cell::Text(&unit.nearest_city),
        Attribute::PeriodFree => Cell::Bool(period.is_free),
        Attribute::PeriodStart => Cell::Date(period.start),
        Attribute::PeriodEnd => Cell::Date(period.end),
    }
}

fn holds(op: Comparison, cell: Cell<'_>, value: &Literal) -> bool {
    use std::cmp::Ordering::{Equal, Greater, Less};

    if op == Comparison::EqIgnoreCase {
        return match (cell, value) {
            (Cell::Text(a), Literal::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => false,
        };
    }
    let ordering = match (cell, value) {
        (Cell::Bool(a), Literal::Bool(b)) => a.cmp(b),
        (Cell::Int(a), Literal::Int(b)) => a.cmp(b),
        // -0.0 and 0.0 compare equal; a NaN cell matches nothing.
        (Cell::Float(a), Literal::Float(b)) => match a.partial_cmp(b) {
            Some(ordering) => ordering,
            None => return false,
        },
        (Cell::Text(a), Literal::Text(b)) => a.cmp(b.as_str()),
        (Cell::Date(a), Literal::Date(b)) => a.cmp(b),
        _ => return false,
    };
    match op {
        Comparison::Eq => ordering == Equal,
        Comparison::Ge => ordering != Less,
        Comparison::Le => ordering != Greater,
        Comparison::EqIgnoreCase => unreachable!("handled above"),
    }
}

/// Resolve every `$param` in the pattern, checking kinds before any row is touched.
fn bind_params(query: &PreparedQuery) -> StoreResult<Vec<BoundFilter<'_>>> {
    query
        .pattern
        .filters
        .iter()
        .map(|filter| {
            let value = query.params.get(filter.param).ok_or_else(|| {
                StoreError::Execution(format!("unbound parameter ${}", filter.param))
            })?;
            let expected = filter.attribute.kind();
            if value.kind() != expected {
                return Err(StoreError::Execution(format!(
                    "parameter ${} for {}: expected {}, got {}",
                    filter.param,
                    filter.attribute.name(),
                    expected,
                    value.kind()
                )));
            }
            if let Literal::Float(x) = value {
                if !x.is_finite() {
                    return Err(StoreError::Execution(format!(
                        "parameter ${} is not a finite number",
                        filter.param
                    )));
                }
            }
            if filter.op == Comparison::EqIgnoreCase && !matches!(value, Literal::Text(_)) {
                return Err(StoreError::Execution(format!(
                    "case-insensitive comparison on non-text parameter ${}",
                    filter.param
                )));
            }
            Ok(BoundFilter {
                attribute: filter.attribute,
                op: filter.op,
                value,
            })
        })
        .collect()
}

impl KbSession for StoreSession<'_> {
    fn select(&self, query: &PreparedQuery, deadline: Instant) -> StoreResult<Vec<UnitBinding>> {
        let filters = bind_params(query)?;
        let order_by = query.pattern.order_by;
        if !matches!(order_by.kind(), LiteralKind::Float | LiteralKind::Int) {
            return Err(StoreError::Execution(format!(
                "cannot order by non-numeric {}",
                order_by.name()
            )));
        }

        let mut rows: Vec<(f64, UnitBinding)> = Vec::new();
        for edge in &self.store.edges {
            if Instant::now() >= deadline {
                return Err(StoreError::DeadlineExceeded);
            }
            let unit = &self.store.units[edge.unit];
            let period = &self.store.periods[edge.period];
            let admitted = filters
                .iter()
                .all(|f| holds(f.op, read(f.attribute, unit, period), f.value));
            if admitted {
                let key = match read(order_by, unit, period) {
                    Cell::Float(x) => x,
                    Cell::Int(n) => n as f64,
                    _ => 0.0,
                };
                rows.push((key, UnitBinding::bind(unit, period)));
            }
        }

        // Stable: equal keys keep edge order.
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Filter, GraphPattern, Params};
    use std::time::Duration;

    fn store_with_one_unit() -> GraphStore {
        GraphStore::from_json(
            r#"{"units":[{"id":"u1","address":"Rantatie 1","image":"u1.jpg","nearestCity":"Tampere",
                "capacity":4,"bedrooms":2,"lakeDistance":120.0,"cityDistance":15.5,
                "availability":[{"isFree":true,"start":"2025-07-09","end":"2025-07-15"}]}]}"#,
        )
        .unwrap()
    }

    fn far_future() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn unbound_parameter_is_an_execution_error() {
        let store = store_with_one_unit();
        let session = store.open().unwrap();
        let query = PreparedQuery {
            pattern: GraphPattern {
                filters: vec![Filter::new(Attribute::Capacity, Comparison::Ge, "minCapacity")],
                order_by: Attribute::LakeDistance,
            },
            params: Params::new(),
        };
        let err = session.select(&query, far_future()).unwrap_err();
        assert!(matches!(err, StoreError::Execution(msg) if msg.contains("$minCapacity")));
    }

    #[test]
    fn mistyped_parameter_is_an_execution_error() {
        let store = store_with_one_unit();
        let session = store.open().unwrap();
        let mut params = Params::new();
        params.bind("minCapacity", Literal::Text("2 OR 1=1".to_string()));
        let query = PreparedQuery {
            pattern: GraphPattern {
                filters: vec![Filter::new(Attribute::Capacity, Comparison::Ge, "minCapacity")],
                order_by: Attribute::LakeDistance,
            },
            params,
        };
        assert!(matches!(
            session.select(&query, far_future()),
            Err(StoreError::Execution(_))
        ));
    }

    #[test]
    fn expired_deadline_stops_evaluation() {
        let store = store_with_one_unit();
        let session = store.open().unwrap();
        let query = PreparedQuery {
            pattern: GraphPattern {
                filters: vec![],
                order_by: Attribute::LakeDistance,
            },
            params: Params::new(),
        };
        let err = session.select(&query, Instant::now()).unwrap_err();
        assert!(matches!(err, StoreError::DeadlineExceeded));
    }

    #[test]
    fn sessions_are_counted_until_dropped() {
        let store = store_with_one_unit();
        {
            let _a = store.open().unwrap();
            let _b = store.open().unwrap();
            assert_eq!(store.open_sessions(), 2);
        }
        assert_eq!(store.open_sessions(), 0);
    }

    #[test]
    fn duplicate_ids_and_inverted_periods_are_rejected() {
        let dup = r#"{"units":[
            {"id":"a","address":"","image":"","nearestCity":"X","capacity":1,"bedrooms":1,"lakeDistance":1,"cityDistance":1},
            {"id":"a","address":"","image":"","nearestCity":"X","capacity":1,"bedrooms":1,"lakeDistance":1,"cityDistance":1}]}"#;
        assert!(matches!(GraphStore::from_json(dup), Err(StoreError::Load(_))));

        let inverted = r#"{"units":[
            {"id":"a","address":"","image":"","nearestCity":"X","capacity":1,"bedrooms":1,"lakeDistance":1,"cityDistance":1,
             "availability":[{"isFree":true,"start":"2025-07-10","end":"2025-07-01"}]}]}"#;
        assert!(matches!(GraphStore::from_json(inverted), Err(StoreError::Load(_))));
    }

    #[test]
    fn offline_store_refuses_sessions() {
        assert!(matches!(
            GraphStore::offline().open().err(),
            Some(StoreError::Unavailable(_))
        ));
    }
}
