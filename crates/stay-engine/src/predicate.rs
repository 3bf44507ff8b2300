//! Predicate building -- one request plus one window into a parameterized graph query.
//!
//! A [`PredicateSet`] is the store-agnostic filter for a single window. It is
//! turned into a [`PreparedQuery`]: a fixed [`GraphPattern`] whose filters refer
//! to named `$parameters`, plus a [`Params`] map binding those names to typed
//! [`Literal`] values. Request values never become part of the pattern itself.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::criteria::SearchCriteria;
use crate::graph::{AvailabilityPeriod, Unit};
use crate::window::DateWindow;

/// Normalized constraints for one candidate window.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSet {
    pub min_capacity: u32,
    pub min_bedrooms: u32,
    pub max_lake_distance: f64,
    pub max_city_distance: f64,
    /// Lowercased city name; `None` matches any city.
    pub city_filter: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

/// Build the predicate set for `window`. Never fails: `criteria` is already normalized.
pub fn build_predicates(criteria: &SearchCriteria, window: &DateWindow) -> PredicateSet {
    PredicateSet {
        min_capacity: criteria.num_people,
        min_bedrooms: criteria.num_bedrooms,
        max_lake_distance: criteria.max_lake_distance,
        max_city_distance: criteria.max_city_distance,
        city_filter: criteria.city.as_deref().map(str::to_lowercase),
        period_start: window.start,
        period_end: window.end,
    }
}

impl PredicateSet {
    /// Whether `unit` with availability `period` satisfies every constraint.
    ///
    /// The period must be free and fully contain `[period_start, period_end)`;
    /// partial overlap is not enough.
    pub fn admits(&self, unit: &Unit, period: &AvailabilityPeriod) -> bool {
        period.is_free
            && period.start <= self.period_start
            && period.end >= self.period_end
            && unit.capacity >= self.min_capacity
            && unit.bedrooms >= self.min_bedrooms
            && unit.lake_distance <= self.max_lake_distance
            && unit.city_distance <= self.max_city_distance
            && self
                .city_filter
                .as_deref()
                .is_none_or(|city| unit.nearest_city.to_lowercase() == city)
    }

    /// Translate into a parameterized query.
    ///
    /// Unbounded distances produce no filter at all rather than an infinite bound.
    pub fn to_query(&self) -> PreparedQuery {
        let mut filters = vec![
            Filter::new(Attribute::PeriodFree, Comparison::Eq, "isFree"),
            Filter::new(Attribute::Capacity, Comparison::Ge, "minCapacity"),
            Filter::new(Attribute::Bedrooms, Comparison::Ge, "minBedrooms"),
        ];
        let mut params = Params::new();
        params.bind("isFree", Literal::Bool(true));
        params.bind("minCapacity", Literal::Int(i64::from(self.min_capacity)));
        params.bind("minBedrooms", Literal::Int(i64::from(self.min_bedrooms)));

        if self.max_lake_distance.is_finite() {
            filters.push(Filter::new(Attribute::LakeDistance, Comparison::Le, "maxLakeDistance"));
            params.bind("maxLakeDistance", Literal::Float(self.max_lake_distance));
        }
        if self.max_city_distance.is_finite() {
            filters.push(Filter::new(Attribute::CityDistance, Comparison::Le, "maxCityDistance"));
            params.bind("maxCityDistance", Literal::Float(self.max_city_distance));
        }
        if let Some(city) = &self.city_filter {
            filters.push(Filter::new(Attribute::NearestCity, Comparison::EqIgnoreCase, "city"));
            params.bind("city", Literal::Text(city.clone()));
        }

        filters.push(Filter::new(Attribute::PeriodStart, Comparison::Le, "windowStart"));
        filters.push(Filter::new(Attribute::PeriodEnd, Comparison::Ge, "windowEnd"));
        params.bind("windowStart", Literal::Date(self.period_start));
        params.bind("windowEnd", Literal::Date(self.period_end));

        PreparedQuery {
            pattern: GraphPattern {
                filters,
                order_by: Attribute::LakeDistance,
            },
            params,
        }
    }
}

/// An attribute reachable from a `(Unit)-[hasAvailability]->(AvailabilityPeriod)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Capacity,
    Bedrooms,
    LakeDistance,
    CityDistance,
    NearestCity,
    PeriodFree,
    PeriodStart,
    PeriodEnd,
}

impl Attribute {
    /// Qualified name used when rendering a pattern.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Capacity => "unit.capacity",
            Attribute::Bedrooms => "unit.bedrooms",
            Attribute::LakeDistance => "unit.lakeDistance",
            Attribute::CityDistance => "unit.cityDistance",
            Attribute::NearestCity => "unit.nearestCity",
            Attribute::PeriodFree => "period.isFree",
            Attribute::PeriodStart => "period.start",
            Attribute::PeriodEnd => "period.end",
        }
    }

    /// The literal kind a parameter compared against this attribute must have.
    pub fn kind(self) -> LiteralKind {
        match self {
            Attribute::Capacity | Attribute::Bedrooms => LiteralKind::Int,
            Attribute::LakeDistance | Attribute::CityDistance => LiteralKind::Float,
            Attribute::NearestCity => LiteralKind::Text,
            Attribute::PeriodFree => LiteralKind::Bool,
            Attribute::PeriodStart | Attribute::PeriodEnd => LiteralKind::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    EqIgnoreCase,
    Ge,
    Le,
}

impl Comparison {
    fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::EqIgnoreCase => "=~",
            Comparison::Ge => ">=",
            Comparison::Le => "<=",
        }
    }
}

/// `attribute op $param`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attribute: Attribute,
    pub op: Comparison,
    pub param: &'static str,
}

impl Filter {
    pub fn new(attribute: Attribute, op: Comparison, param: &'static str) -> Self {
        Self { attribute, op, param }
    }
}

/// The structural half of a query. Contains parameter names, never values.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPattern {
    pub filters: Vec<Filter>,
    /// Ascending sort key applied by the store.
    pub order_by: Attribute,
}

impl fmt::Display for GraphPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MATCH (unit:Unit)-[:hasAvailability]->(period:AvailabilityPeriod)")?;
        for (i, filter) in self.filters.iter().enumerate() {
            let keyword = if i == 0 { "WHERE" } else { "AND" };
            write!(
                f,
                " {} {} {} ${}",
                keyword,
                filter.attribute.name(),
                filter.op.symbol(),
                filter.param
            )?;
        }
        write!(f, " ORDER BY {} ASC", self.order_by.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Bool,
    Int,
    Float,
    Text,
    Date,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LiteralKind::Bool => "bool",
            LiteralKind::Int => "int",
            LiteralKind::Float => "float",
            LiteralKind::Text => "text",
            LiteralKind::Date => "date",
        };
        f.write_str(name)
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Literal {
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Bool(_) => LiteralKind::Bool,
            Literal::Int(_) => LiteralKind::Int,
            Literal::Float(_) => LiteralKind::Float,
            Literal::Text(_) => LiteralKind::Text,
            Literal::Date(_) => LiteralKind::Date,
        }
    }
}

/// Named parameter bindings for a [`GraphPattern`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<&'static str, Literal>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous value.
    pub fn bind(&mut self, name: &'static str, value: Literal) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pattern plus bindings, ready for [`crate::graph::KbSession::select`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub pattern: GraphPattern,
    pub params: Params,
}
