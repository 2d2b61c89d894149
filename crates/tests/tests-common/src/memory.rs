//! A backend answering searches from records held in memory.
//!
//! Plans are evaluated the way the SQL they lower to behaves in PostgreSQL: relationship paths
//! are left joined, a comparison with NULL is unknown, and `DISTINCT ON` keeps the first row of
//! each group in `ORDER BY` order and refuses an ordering that does not start with its fields.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::Deserialize;

use query_engine_execution::backend::{summarize_stats, Backend, Row, SearchResults, StatsValue};
use query_engine_execution::Error;
use query_engine_metadata::metadata::{
    join_tokens, path_tokens, Metadata, Relationship, ScalarType, PRIMARY_KEY_FIELD,
};
use query_engine_models::tree::split_field_path;
use query_engine_translation::translation::helpers::Env;
use query_engine_translation::translation::lowering::prefetch_steps;
use query_engine_translation::translation::query::{
    ComparisonOperator, OrderDirection, Predicate, SearchPlan,
};

pub type Record = serde_json::Map<String, serde_json::Value>;

/// The rows of every table, keyed by table name. Records are keyed by column name, as
/// `row_to_json` would produce them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Dataset {
    pub tables: BTreeMap<String, Vec<Record>>,
}

impl Dataset {
    fn table(&self, table_name: &str) -> &[Record] {
        self.tables
            .get(table_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A [`Backend`] over a [`Dataset`].
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    dataset: Dataset,
}

impl InMemoryBackend {
    pub fn new(dataset: Dataset) -> InMemoryBackend {
        InMemoryBackend { dataset }
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn search(&self, metadata: &Metadata, plan: &SearchPlan) -> Result<SearchResults, Error> {
        let env = Env::new(metadata);
        let evaluator = Evaluator {
            env,
            dataset: &self.dataset,
            root_entity: &plan.root_entity,
        };
        check_distinct_order(plan)?;

        let predicate_paths: Vec<&str> = plan
            .predicate
            .iter()
            .flat_map(Predicate::paths)
            .collect();
        let distinct_paths = plan.distinct_fields.iter().map(String::as_str);

        let counted = evaluator.matching(
            plan,
            predicate_paths.iter().copied().chain(distinct_paths.clone()),
        )?;
        let total_count =
            u64::try_from(evaluator.distinct(plan, counted)?.len()).unwrap_or_default();

        let joined = evaluator.matching(
            plan,
            predicate_paths
                .iter()
                .copied()
                .chain(distinct_paths)
                .chain(plan.order_by.iter().map(|element| element.path.as_str()))
                .chain(plan.annotations.iter().map(|annotation| annotation.path.as_str())),
        )?;
        let offset = plan.offset.map_or(0, |offset| offset as usize);
        let limit = plan.limit.map_or(usize::MAX, |limit| limit as usize);
        let page: Vec<JoinRow> = evaluator
            .distinct(plan, joined)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();

        let mut rows = vec![];
        for join_row in &page {
            let Some(root) = root_of(join_row) else {
                continue;
            };
            let mut annotations = BTreeMap::new();
            for annotation in &plan.annotations {
                let (value, _) = evaluator.value(join_row, &annotation.path)?;
                annotations.insert(annotation.name.clone(), value.and_then(as_text));
            }
            rows.push(Row {
                key: evaluator.key(&plan.root_entity, root)?,
                record: serde_json::Value::Object(root.clone()),
                annotations,
                related: BTreeMap::new(),
            });
        }

        let roots: Vec<&Record> = page
            .iter()
            .filter_map(root_of)
            .collect();
        for step in prefetch_steps(&env, plan)? {
            let restriction = match &step.filter {
                None => None,
                Some(filter) => {
                    let subquery = Evaluator {
                        env,
                        dataset: &self.dataset,
                        root_entity: &filter.entity,
                    };
                    Some(Restriction {
                        path: &filter.path,
                        entity: &filter.entity,
                        keys: subquery.matching_keys(&filter.predicate)?,
                    })
                }
            };
            let mut related_by_key: BTreeMap<String, Vec<serde_json::Value>> = BTreeMap::new();
            for root in &roots {
                let root_key = evaluator.key(&plan.root_entity, root)?;
                let records = evaluator
                    .related_at(root, &step.path, &step.entity, restriction.as_ref())?
                    .into_iter()
                    .map(|(_, record)| serde_json::Value::Object(record.clone()))
                    .collect();
                related_by_key.insert(root_key, records);
            }
            for row in &mut rows {
                let records = related_by_key.get(&row.key).cloned().unwrap_or_default();
                row.related.insert(step.path.clone(), records);
            }
        }

        let stats = if plan.stats.is_empty() {
            None
        } else {
            let mut all_stats = vec![];
            for stats in &plan.stats {
                let joined = evaluator.matching(
                    plan,
                    predicate_paths
                        .iter()
                        .copied()
                        .chain(stats.fields.iter().map(String::as_str)),
                )?;
                let mut roots_by_value: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
                for join_row in &joined {
                    let mut texts = vec![];
                    for field in &stats.fields {
                        if let (Some(text), _) = evaluator.text(join_row, field)? {
                            texts.push(text);
                        }
                    }
                    let Some(root) = root_of(join_row) else {
                        continue;
                    };
                    roots_by_value
                        .entry(texts.join(&stats.delimiter))
                        .or_default()
                        .insert(evaluator.key(&plan.root_entity, root)?);
                }
                all_stats.push(summarize_stats(
                    &stats.name,
                    &stats.display_name,
                    stats.top_n,
                    roots_by_value.into_iter().map(|(value, roots)| StatsValue {
                        value,
                        count: u64::try_from(roots.len()).unwrap_or_default(),
                    }),
                ));
            }
            Some(all_stats)
        };

        tracing::debug!(rows = rows.len(), total_count, "searched in memory");
        Ok(SearchResults {
            rows,
            total_count,
            stats,
        })
    }
}

/// The record bound to every joined relationship path, `None` where a left join found nothing.
/// The root record is bound to the empty path.
type JoinRow<'d> = BTreeMap<String, Option<&'d Record>>;

fn root_of<'d>(row: &JoinRow<'d>) -> Option<&'d Record> {
    row.get("").copied().flatten()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn of(value: bool) -> Truth {
        if value {
            Truth::True
        } else {
            Truth::False
        }
    }

    fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

/// Related records must be reached through an `entity` record at `path` whose key is in `keys`.
struct Restriction<'p> {
    path: &'p str,
    entity: &'p str,
    keys: BTreeSet<String>,
}

struct Evaluator<'a> {
    env: Env<'a>,
    dataset: &'a Dataset,
    root_entity: &'a str,
}

impl<'a> Evaluator<'a> {
    fn records(&self, entity_name: &str) -> Result<&'a [Record], Error> {
        let entity = self.env.lookup_entity(entity_name)?;
        Ok(self.dataset.table(&entity.table_name))
    }

    fn column_name(&self, entity_name: &str, field: &str) -> Result<&'a str, Error> {
        Ok(self.env.lookup_column(entity_name, field)?.name.as_str())
    }

    /// The primary key of a record, as text.
    fn key(&self, entity_name: &str, record: &Record) -> Result<String, Error> {
        let column = self.column_name(entity_name, PRIMARY_KEY_FIELD)?;
        Ok(record.get(column).and_then(as_text).unwrap_or_default())
    }

    /// The records one hop away from `source`, an `entity_name` record.
    fn follow(
        &self,
        entity_name: &str,
        relationship: &Relationship,
        source: &Record,
    ) -> Result<Vec<&'a Record>, Error> {
        let targets = self.records(&relationship.target)?;
        let mut found = vec![];
        match &relationship.through {
            None => {
                let mut pairs = vec![];
                for (source_key, target_key) in &relationship.column_mapping {
                    pairs.push((
                        self.column_name(entity_name, source_key)?,
                        self.column_name(&relationship.target, target_key)?,
                    ));
                }
                found.extend(targets.iter().filter(|target| joined_on(source, target, &pairs)));
            }
            Some(through) => {
                let mut source_pairs = vec![];
                for (source_key, link_column) in &through.source_mapping {
                    source_pairs.push((
                        self.column_name(entity_name, source_key)?,
                        link_column.as_str(),
                    ));
                }
                let mut target_pairs = vec![];
                for (link_column, target_key) in &through.target_mapping {
                    target_pairs.push((
                        link_column.as_str(),
                        self.column_name(&relationship.target, target_key)?,
                    ));
                }
                for link in self.dataset.table(&through.table_name) {
                    if joined_on(source, link, &source_pairs) {
                        found.extend(
                            targets
                                .iter()
                                .filter(|target| joined_on(link, target, &target_pairs)),
                        );
                    }
                }
            }
        }
        Ok(found)
    }

    /// Join `root` along every relationship path. With `left`, a hop finding nothing binds `None`
    /// instead of dropping the row.
    fn expand(
        &self,
        root: &'a Record,
        relationship_paths: &BTreeSet<String>,
        left: bool,
    ) -> Result<Vec<JoinRow<'a>>, Error> {
        let mut rows: Vec<JoinRow<'a>> = vec![BTreeMap::from([(String::new(), Some(root))])];
        // parents sort before their extensions
        for path in relationship_paths {
            let (parent_path, hop) = split_field_path(path);
            let parent_entity = self.env.walk(self.root_entity, parent_path)?;
            let relationship = self.env.lookup_relationship(parent_entity, hop)?;
            let mut expanded = vec![];
            for row in rows {
                let targets = match row.get(parent_path).copied().flatten() {
                    Some(parent) => self.follow(parent_entity, relationship, parent)?,
                    None => vec![],
                };
                if targets.is_empty() {
                    if left {
                        let mut row = row;
                        row.insert(path.clone(), None);
                        expanded.push(row);
                    }
                } else {
                    for target in targets {
                        let mut joined = row.clone();
                        joined.insert(path.clone(), Some(target));
                        expanded.push(joined);
                    }
                }
            }
            rows = expanded;
        }
        Ok(rows)
    }

    /// Every join row of every root record, left joined along the paths used by `field_paths`,
    /// that the plan's predicate holds for.
    fn matching<'p>(
        &self,
        plan: &SearchPlan,
        field_paths: impl IntoIterator<Item = &'p str>,
    ) -> Result<Vec<JoinRow<'a>>, Error> {
        let relationship_paths = relationship_paths(field_paths);
        let mut matching = vec![];
        for root in self.records(self.root_entity)? {
            for row in self.expand(root, &relationship_paths, true)? {
                let keep = match &plan.predicate {
                    None => true,
                    Some(predicate) => self.test(&row, predicate)? == Truth::True,
                };
                if keep {
                    matching.push(row);
                }
            }
        }
        Ok(matching)
    }

    /// The keys of the root records the predicate holds for through at least one join row.
    fn matching_keys(&self, predicate: &Predicate) -> Result<BTreeSet<String>, Error> {
        let relationship_paths = relationship_paths(predicate.paths());
        let mut keys = BTreeSet::new();
        for root in self.records(self.root_entity)? {
            for row in self.expand(root, &relationship_paths, true)? {
                if self.test(&row, predicate)? == Truth::True {
                    keys.insert(self.key(self.root_entity, root)?);
                    break;
                }
            }
        }
        Ok(keys)
    }

    /// The `entity_name` records at `relationship_path` from `root`, by ascending key. With a
    /// restriction, only those reached through its allowed records.
    fn related_at(
        &self,
        root: &'a Record,
        relationship_path: &str,
        entity_name: &str,
        restriction: Option<&Restriction<'_>>,
    ) -> Result<Vec<(String, &'a Record)>, Error> {
        let hops = path_tokens(relationship_path);
        let prefixes: BTreeSet<String> = (1..=hops.len())
            .map(|depth| join_tokens(hops[..depth].iter().copied()))
            .collect();
        let key_type = self.env.lookup_column(entity_name, PRIMARY_KEY_FIELD)?.r#type;
        let mut related: Vec<(String, &'a Record)> = vec![];
        for row in self.expand(root, &prefixes, false)? {
            if let Some(restriction) = restriction {
                let Some(through) = row.get(restriction.path).copied().flatten() else {
                    continue;
                };
                if !restriction.keys.contains(&self.key(restriction.entity, through)?) {
                    continue;
                }
            }
            if let Some(record) = row.get(relationship_path).copied().flatten() {
                let key = self.key(entity_name, record)?;
                if !related.iter().any(|(seen, _)| *seen == key) {
                    related.push((key, record));
                }
            }
        }
        let key_column = self.column_name(entity_name, PRIMARY_KEY_FIELD)?;
        related.sort_by(|(_, left), (_, right)| {
            order_values(left.get(key_column), right.get(key_column), key_type)
        });
        Ok(related)
    }

    /// The value of a field in a join row, `None` for NULL.
    fn value(
        &self,
        row: &JoinRow<'a>,
        field_path: &str,
    ) -> Result<(Option<&'a serde_json::Value>, ScalarType), Error> {
        let (relationship_path, field) = split_field_path(field_path);
        let entity = self.env.walk(self.root_entity, relationship_path)?;
        let column = self.env.lookup_column(entity, field)?;
        let value = row
            .get(relationship_path)
            .copied()
            .flatten()
            .and_then(|record| record.get(&column.name))
            .filter(|value| !value.is_null());
        Ok((value, column.r#type))
    }

    fn text(
        &self,
        row: &JoinRow<'a>,
        field_path: &str,
    ) -> Result<(Option<String>, ScalarType), Error> {
        let (value, scalar_type) = self.value(row, field_path)?;
        Ok((value.and_then(as_text), scalar_type))
    }

    fn test(&self, row: &JoinRow<'a>, predicate: &Predicate) -> Result<Truth, Error> {
        Ok(match predicate {
            Predicate::And { left, right } => self.test(row, left)?.and(self.test(row, right)?),
            Predicate::Or { left, right } => self.test(row, left)?.or(self.test(row, right)?),
            Predicate::Not(predicate) => self.test(row, predicate)?.not(),
            Predicate::IsNull { path } => Truth::of(self.value(row, path)?.0.is_none()),
            Predicate::Compare {
                path,
                operator,
                value,
            } => {
                let (actual, scalar_type) = self.value(row, path)?;
                let Some(actual) = actual else {
                    return Ok(Truth::Unknown);
                };
                let text = as_text(actual).unwrap_or_default().to_lowercase();
                let expected = value.to_string();
                let pattern = expected.to_lowercase();
                match operator {
                    ComparisonOperator::Equals if scalar_type.is_textual() => {
                        Truth::of(text == pattern)
                    }
                    ComparisonOperator::Contains => Truth::of(text.contains(&pattern)),
                    ComparisonOperator::StartsWith => Truth::of(text.starts_with(&pattern)),
                    ComparisonOperator::EndsWith => Truth::of(text.ends_with(&pattern)),
                    ComparisonOperator::Equals => {
                        Truth::of(compare_typed(actual, scalar_type, &expected)? == Ordering::Equal)
                    }
                    ComparisonOperator::LessThan => {
                        Truth::of(compare_typed(actual, scalar_type, &expected)? == Ordering::Less)
                    }
                    ComparisonOperator::LessThanOrEqualTo => Truth::of(
                        compare_typed(actual, scalar_type, &expected)? != Ordering::Greater,
                    ),
                    ComparisonOperator::GreaterThan => Truth::of(
                        compare_typed(actual, scalar_type, &expected)? == Ordering::Greater,
                    ),
                    ComparisonOperator::GreaterThanOrEqualTo => {
                        Truth::of(compare_typed(actual, scalar_type, &expected)? != Ordering::Less)
                    }
                }
            }
        })
    }

    /// Sort join rows in plan order, then keep the first row of every distinct group.
    fn distinct(
        &self,
        plan: &SearchPlan,
        rows: Vec<JoinRow<'a>>,
    ) -> Result<Vec<JoinRow<'a>>, Error> {
        let mut keyed = vec![];
        for row in rows {
            let mut sort_key = vec![];
            for element in &plan.order_by {
                let (value, scalar_type) = self.value(&row, &element.path)?;
                sort_key.push((value, scalar_type, element.direction));
            }
            for field in &plan.distinct_fields {
                let (value, scalar_type) = self.value(&row, field)?;
                sort_key.push((value, scalar_type, OrderDirection::Asc));
            }
            let distinct_key = plan
                .distinct_fields
                .iter()
                .map(|field| self.value(&row, field).map(|(value, _)| value.cloned()))
                .collect::<Result<Vec<_>, Error>>()?;
            keyed.push((sort_key, distinct_key, row));
        }

        keyed.sort_by(|(left, _, _), (right, _, _)| {
            left.iter()
                .zip(right)
                .map(|((left, scalar_type, direction), (right, _, _))| {
                    let ordering = order_values(*left, *right, *scalar_type);
                    match direction {
                        OrderDirection::Asc => ordering,
                        OrderDirection::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let mut seen = BTreeSet::new();
        let mut distinct = vec![];
        for (_, distinct_key, row) in keyed {
            if plan.distinct_fields.is_empty()
                || seen.insert(serde_json::to_string(&distinct_key).unwrap_or_default())
            {
                distinct.push(row);
            }
        }
        Ok(distinct)
    }
}

/// PostgreSQL rejects `DISTINCT ON` fields that do not lead the `ORDER BY` list.
fn check_distinct_order(plan: &SearchPlan) -> Result<(), Error> {
    let mut remaining: BTreeSet<&str> = plan.distinct_fields.iter().map(String::as_str).collect();
    for element in &plan.order_by {
        if remaining.is_empty() {
            break;
        }
        if !remaining.remove(element.path.as_str()) {
            return Err(Error::UnsupportedDistinctCombination {
                fields: plan.distinct_fields.clone(),
            });
        }
    }
    Ok(())
}

/// Every relationship path, with its prefixes, that the field paths go through.
fn relationship_paths<'p>(field_paths: impl IntoIterator<Item = &'p str>) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    for field_path in field_paths {
        let (relationship_path, _) = split_field_path(field_path);
        let hops = path_tokens(relationship_path);
        for depth in 1..=hops.len() {
            paths.insert(join_tokens(hops[..depth].iter().copied()));
        }
    }
    paths
}

fn joined_on(left: &Record, right: &Record, pairs: &[(&str, &str)]) -> bool {
    !pairs.is_empty()
        && pairs.iter().all(|(left_column, right_column)| {
            match (left.get(*left_column), right.get(*right_column)) {
                (Some(left), Some(right)) => !left.is_null() && left == right,
                _ => false,
            }
        })
}

/// A value cast to text.
fn as_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn is_numeric(scalar_type: ScalarType) -> bool {
    matches!(
        scalar_type,
        ScalarType::Smallint
            | ScalarType::Integer
            | ScalarType::Bigint
            | ScalarType::Real
            | ScalarType::DoublePrecision
            | ScalarType::Numeric
    )
}

/// Compare a column value with a literal cast to the column's type.
fn compare_typed(
    actual: &serde_json::Value,
    scalar_type: ScalarType,
    literal: &str,
) -> Result<Ordering, Error> {
    let invalid = || {
        Error::Decode(format!(
            "invalid input syntax for type {scalar_type}: \"{literal}\""
        ))
    };
    let actual_text = as_text(actual).unwrap_or_default();
    if is_numeric(scalar_type) {
        let expected: f64 = literal.trim().parse().map_err(|_| invalid())?;
        let actual: f64 = actual
            .as_f64()
            .or_else(|| actual_text.parse().ok())
            .ok_or_else(invalid)?;
        Ok(actual.partial_cmp(&expected).unwrap_or(Ordering::Equal))
    } else if scalar_type == ScalarType::Interval {
        let expected = interval_microseconds(literal).ok_or_else(invalid)?;
        let actual = interval_microseconds(&actual_text).ok_or_else(invalid)?;
        Ok(actual.cmp(&expected))
    } else {
        Ok(actual_text.as_str().cmp(literal))
    }
}

/// Ascending order, NULLs last.
fn order_values(
    left: Option<&serde_json::Value>,
    right: Option<&serde_json::Value>,
    scalar_type: ScalarType,
) -> Ordering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => {
            let right_text = as_text(right).unwrap_or_default();
            compare_typed(left, scalar_type, &right_text)
                .unwrap_or_else(|_| as_text(left).unwrap_or_default().cmp(&right_text))
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
/// The length of an interval written the way PostgreSQL reads or prints it, e.g. `14 days`,
/// `1 mon 2 days 03:00:00` or `0 mons 14 days 0 microseconds`. A month counts as 30 days.
fn interval_microseconds(text: &str) -> Option<i128> {
    const MICROSECONDS_PER_DAY: f64 = 86_400_000_000.0;
    let mut total: f64 = 0.0;
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        if token.contains(':') {
            let negative = token.starts_with('-');
            let mut parts = token.trim_start_matches(['-', '+']).split(':');
            let hours: f64 = parts.next()?.parse().ok()?;
            let minutes: f64 = parts.next()?.parse().ok()?;
            let seconds: f64 = parts.next().unwrap_or("0").parse().ok()?;
            let microseconds = ((hours * 60.0 + minutes) * 60.0 + seconds) * 1_000_000.0;
            total += if negative { -microseconds } else { microseconds };
            continue;
        }
        let amount: f64 = token.parse().ok()?;
        let per_unit = match tokens.next()?.trim_end_matches('s') {
            "year" => 360.0 * MICROSECONDS_PER_DAY,
            "mon" | "month" => 30.0 * MICROSECONDS_PER_DAY,
            "week" => 7.0 * MICROSECONDS_PER_DAY,
            "day" => MICROSECONDS_PER_DAY,
            "hour" => 3_600_000_000.0,
            "minute" | "min" => 60_000_000.0,
            "second" | "sec" => 1_000_000.0,
            "microsecond" => 1.0,
            _ => return None,
        };
        total += amount * per_unit;
    }
    Some(total.round() as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_forms_agree() {
        assert_eq!(
            interval_microseconds("14 days"),
            interval_microseconds("0 mons 14 days 0 microseconds")
        );
        assert_eq!(
            interval_microseconds("1 mon"),
            interval_microseconds("30 days")
        );
        assert_eq!(
            interval_microseconds("1 day 12:00:00"),
            interval_microseconds("36 hours")
        );
        assert_eq!(interval_microseconds("soon"), None);
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(Truth::Unknown.and(Truth::False), Truth::False);
        assert_eq!(Truth::Unknown.or(Truth::True), Truth::True);
        assert_eq!(Truth::Unknown.not(), Truth::Unknown);
    }

    #[test]
    fn test_nulls_sort_last() {
        let one = serde_json::json!(1);
        let two = serde_json::json!(2);
        assert_eq!(
            order_values(Some(&one), None, ScalarType::Integer),
            Ordering::Less
        );
        assert_eq!(
            order_values(Some(&two), Some(&one), ScalarType::Integer),
            Ordering::Greater
        );
    }
}
