use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::aggregation::{AggregateSpec, AggregationEngine};
use crate::executor::{
    BatchFault, BatchOutcome, ConnectorFault, DataConnector, Helpers, JobHandle, MutationBatch, MutationRequest,
    RetrieveResponse, Row,
};
use crate::memory::Eval;
use crate::query::{FetchItem, FetchLink, FetchQuery, ItemContainer, LinkType, SortTarget};

/// Records the platform allows an aggregate query to read by default.
pub const DEFAULT_AGGREGATE_LIMIT: usize = 50_000;

type Record = Map<String, Value>;

struct EntityStore {
    primary_id: String,
    records: IndexMap<Uuid, Record>,
}

/// In-process [`DataConnector`] over JSON records.
///
/// Query documents are evaluated the way the platform does: links join by
/// their `from`/`to` attributes, root sorts apply before link sorts, nulls sort
/// last, and an aggregate over more than the configured number of records
/// fails with the aggregate-limit fault.
pub struct MemoryConnector {
    entities: RwLock<HashMap<String, EntityStore>>,
    aggregate_limit: usize,
    jobs: RwLock<Vec<JobHandle>>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> ConnectorFault {
    ConnectorFault::new("memory store lock poisoned")
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            aggregate_limit: DEFAULT_AGGREGATE_LIMIT,
            jobs: RwLock::new(Vec::new()),
        }
    }

    pub fn with_aggregate_limit(mut self, limit: usize) -> Self {
        self.aggregate_limit = limit;
        self
    }

    /// Declares an entity and the attribute holding its record ids.
    pub fn with_entity(self, name: &str, primary_id: &str) -> Self {
        if let Ok(mut entities) = self.entities.write() {
            entities.entry(name.to_ascii_lowercase()).or_insert_with(|| EntityStore {
                primary_id: primary_id.to_ascii_lowercase(),
                records: IndexMap::new(),
            });
        }
        self
    }

    /// Loads a JSON array of records. Records without an id get a new one.
    pub fn load(&self, entity: &str, rows: Value) -> Result<usize, ConnectorFault> {
        let Value::Array(items) = rows else {
            return Err(ConnectorFault::new("expected a JSON array of records"));
        };
        let mut entities = self.entities.write().map_err(poisoned)?;
        let store = Self::store_mut(&mut entities, entity);
        let mut loaded = 0;
        for item in items {
            let Value::Object(mut record) = item else {
                return Err(ConnectorFault::new("records must be JSON objects"));
            };
            let id = match record.get(&store.primary_id).and_then(Value::as_str) {
                Some(text) => Uuid::parse_str(text)
                    .map_err(|_| ConnectorFault::new(format!("{} is not a valid id", text)))?,
                None => Uuid::new_v4(),
            };
            record.insert(store.primary_id.clone(), Value::String(id.to_string()));
            store.records.insert(id, record);
            loaded += 1;
        }
        debug!(entity, loaded, "records loaded");
        Ok(loaded)
    }

    /// Snapshot of the stored records of `entity`, in insertion order.
    pub fn records(&self, entity: &str) -> Vec<Row> {
        let Ok(entities) = self.entities.read() else {
            return vec![];
        };
        entities
            .get(&entity.to_ascii_lowercase())
            .map(|s| s.records.values().cloned().map(Row::from).collect())
            .unwrap_or_default()
    }

    /// Bulk-delete jobs run so far.
    pub fn jobs(&self) -> Vec<JobHandle> {
        self.jobs.read().map(|j| j.clone()).unwrap_or_default()
    }

    fn store_mut<'s>(entities: &'s mut HashMap<String, EntityStore>, entity: &str) -> &'s mut EntityStore {
        let name = entity.to_ascii_lowercase();
        let primary_id = format!("{}id", name);
        entities.entry(name).or_insert_with(|| EntityStore { primary_id, records: IndexMap::new() })
    }

    fn store<'s>(entities: &'s HashMap<String, EntityStore>, entity: &str) -> Result<&'s EntityStore, ConnectorFault> {
        entities
            .get(&entity.to_ascii_lowercase())
            .ok_or_else(|| ConnectorFault::new(format!("entity '{}' does not exist", entity)))
    }

    /// Root records joined with their links and filtered, one flattened
    /// record per combination.
    fn matching(entities: &HashMap<String, EntityStore>, query: &FetchQuery) -> Result<Vec<Record>, ConnectorFault> {
        let root = Self::store(entities, query.entity_name())?;
        let tuples: Vec<Record> = root.records.values().cloned().collect();
        let joined = Self::join_links(entities, query.entity.items(), None, tuples)?;

        let Some(filter) = query.filter() else {
            return Ok(joined);
        };
        let mut out = Vec::with_capacity(joined.len());
        for t in joined {
            if Eval::eval_filter(filter, &t)?.is_true() {
                out.push(t);
            }
        }
        Ok(out)
    }

    fn join_links(
        entities: &HashMap<String, EntityStore>,
        items: &[FetchItem],
        owner: Option<&str>,
        mut tuples: Vec<Record>,
    ) -> Result<Vec<Record>, ConnectorFault> {
        for item in items {
            let FetchItem::Link(link) = item else { continue };
            let candidates = Self::link_candidates(entities, link)?;
            let parent_key = source_key(owner, &link.to);
            let mut joined = Vec::with_capacity(tuples.len());
            for t in tuples {
                let parent = t.get(&parent_key).cloned().unwrap_or(Value::Null);
                let matches: Vec<&Record> = candidates.iter()
                    .filter(|c| !parent.is_null() && same_value(c.get(&link.from).unwrap_or(&Value::Null), &parent))
                    .collect();
                if matches.is_empty() {
                    if link.link_type == LinkType::Outer {
                        joined.push(t);
                    }
                    continue;
                }
                for m in matches {
                    let mut wide = t.clone();
                    for (k, v) in m {
                        wide.insert(format!("{}.{}", link.alias, k), v.clone());
                    }
                    joined.extend(Self::join_links(entities, &link.items, Some(&link.alias), vec![wide])?);
                }
            }
            tuples = joined;
        }
        Ok(tuples)
    }

    /// Records of the linked entity that pass the link's own filter.
    fn link_candidates(entities: &HashMap<String, EntityStore>, link: &FetchLink) -> Result<Vec<Record>, ConnectorFault> {
        let store = Self::store(entities, &link.name)?;
        let mut out = Vec::new();
        for record in store.records.values() {
            let keep = match link.filter() {
                Some(f) => Eval::eval_filter(f, record)?.is_true(),
                None => true,
            };
            if keep {
                out.push(record.clone());
            }
        }
        Ok(out)
    }

    /// Attribute sorts, root first, then links depth-first.
    fn attribute_sorts(query: &FetchQuery) -> Vec<(String, bool)> {
        let mut keys: Vec<(String, bool)> = query.entity.sorts()
            .filter_map(|s| match &s.target {
                SortTarget::Attribute(name) => Some((name.clone(), s.descending)),
                SortTarget::Alias(_) => None,
            })
            .collect();
        for link in query.all_links() {
            keys.extend(link.sorts().filter_map(|s| match &s.target {
                SortTarget::Attribute(name) => Some((source_key(Some(&link.alias), name), s.descending)),
                SortTarget::Alias(_) => None,
            }));
        }
        keys
    }

    fn alias_sorts(query: &FetchQuery) -> Vec<(String, bool)> {
        let mut items: Vec<&FetchItem> = query.entity.items().iter().collect();
        for link in query.all_links() {
            items.extend(link.items().iter());
        }
        items.into_iter()
            .filter_map(|i| match i {
                FetchItem::Order(s) => match &s.target {
                    SortTarget::Alias(alias) => Some((alias.clone(), s.descending)),
                    SortTarget::Attribute(_) => None,
                },
                _ => None,
            })
            .collect()
    }

    fn project(query: &FetchQuery, tuple: &Record) -> Row {
        let mut out = Row::new();
        Self::project_items(query.entity.items(), None, tuple, &mut out);
        out
    }

    fn project_items(items: &[FetchItem], owner: Option<&str>, tuple: &Record, out: &mut Row) {
        for item in items {
            match item {
                FetchItem::AllAttributes => {
                    for (k, v) in tuple {
                        let belongs = match owner {
                            None => !k.contains('.'),
                            Some(alias) => k.strip_prefix(alias).is_some_and(|rest| rest.starts_with('.')),
                        };
                        if belongs {
                            out.insert(k, v.clone());
                        }
                    }
                }
                FetchItem::Attribute(a) => {
                    let value = tuple.get(&source_key(owner, &a.name)).cloned().unwrap_or(Value::Null);
                    out.insert(&a.row_key(owner), value);
                }
                FetchItem::Link(link) => Self::project_items(&link.items, Some(&link.alias), tuple, out),
                FetchItem::Order(_) | FetchItem::Filter(_) => {}
            }
        }
    }

    fn aggregate(&self, query: &FetchQuery, tuples: Vec<Record>) -> Result<Vec<Row>, ConnectorFault> {
        if tuples.len() > self.aggregate_limit {
            debug!(records = tuples.len(), limit = self.aggregate_limit, "aggregate limit exceeded");
            return Err(ConnectorFault::aggregate_limit());
        }
        let attributes = query.all_attributes();
        let mut group_keys = Vec::new();
        let mut sources = Vec::new();
        let mut specs = Vec::new();
        for a in &attributes {
            let alias = a.row_key();
            let source = source_key(a.owner, &a.attribute.name);
            if a.attribute.group_by {
                group_keys.push(alias.clone());
            } else if let Some(kind) = a.attribute.aggregate {
                specs.push(AggregateSpec::new(&alias, kind));
            } else {
                continue;
            }
            sources.push((alias, source));
        }

        let mut rows: Vec<Row> = tuples.iter()
            .map(|t| {
                let mut row = Row::new();
                for (alias, source) in &sources {
                    row.insert(alias, t.get(source).cloned().unwrap_or(Value::Null));
                }
                row
            })
            .collect();
        let key_order: Vec<(String, bool)> = group_keys.iter().map(|k| (k.clone(), false)).collect();
        Helpers::sort_rows(&mut rows, &key_order);

        let mut grouped = AggregationEngine::aggregate(rows, group_keys, specs)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConnectorFault::new(e.to_string()))?;
        Helpers::sort_rows(&mut grouped, &Self::alias_sorts(query));
        Ok(grouped)
    }

    fn window(query: &FetchQuery, mut rows: Vec<Row>) -> RetrieveResponse {
        if let Some(top) = query.top {
            rows.truncate(top as usize);
        }
        let (Some(page), Some(count)) = (query.page, query.count) else {
            return RetrieveResponse { rows, more_records: false, paging_cookie: None };
        };
        let total = rows.len();
        let start = (page.max(1) as usize - 1) * count as usize;
        let more_records = total > start + count as usize;
        RetrieveResponse {
            rows: Helpers::page_window(rows, page, count),
            more_records,
            paging_cookie: more_records.then(|| format!("<cookie page=\"{}\" />", page)),
        }
    }

    fn apply(entities: &mut HashMap<String, EntityStore>, request: &MutationRequest) -> Result<(), ConnectorFault> {
        match request {
            MutationRequest::Create { entity, attributes } => {
                let store = Self::store_mut(entities, entity);
                let id = match attributes.get(&store.primary_id).and_then(|v| v.to_json().as_str().map(str::to_string)) {
                    Some(text) => Uuid::parse_str(&text).map_err(|_| ConnectorFault::new(format!("{} is not a valid id", text)))?,
                    None => Uuid::new_v4(),
                };
                if store.records.contains_key(&id) {
                    return Err(ConnectorFault::new(format!("{} with id {} already exists", entity, id)));
                }
                let mut record: Record = attributes.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                record.insert(store.primary_id.clone(), Value::String(id.to_string()));
                store.records.insert(id, record);
            }
            MutationRequest::Update { entity, id, attributes } => {
                let store = entities.get_mut(&entity.to_ascii_lowercase())
                    .ok_or_else(|| ConnectorFault::new(format!("entity '{}' does not exist", entity)))?;
                let record = store.records.get_mut(id)
                    .ok_or_else(|| ConnectorFault::new(format!("{} with id {} does not exist", entity, id)))?;
                for (k, v) in attributes {
                    record.insert(k.clone(), v.to_json());
                }
            }
            MutationRequest::Delete { entity, id } => {
                let store = entities.get_mut(&entity.to_ascii_lowercase())
                    .ok_or_else(|| ConnectorFault::new(format!("entity '{}' does not exist", entity)))?;
                if store.records.shift_remove(id).is_none() {
                    return Err(ConnectorFault::new(format!("{} with id {} does not exist", entity, id)));
                }
            }
        }
        Ok(())
    }
}

impl DataConnector for MemoryConnector {
    fn retrieve(&self, query: &FetchQuery) -> Result<RetrieveResponse, ConnectorFault> {
        let entities = self.entities.read().map_err(poisoned)?;
        let tuples = Self::matching(&entities, query)?;

        let rows = if query.aggregate {
            self.aggregate(query, tuples)?
        } else {
            let mut sorted: Vec<Row> = tuples.into_iter().map(Row::from).collect();
            Helpers::sort_rows(&mut sorted, &Self::attribute_sorts(query));
            let mut rows: Vec<Row> = sorted.iter().map(|t| Self::project(query, &t.0)).collect();
            if query.distinct {
                let mut seen = HashSet::new();
                rows.retain(|r| seen.insert(Value::Object(r.0.clone()).to_string()));
            }
            rows
        };

        let response = Self::window(query, rows);
        trace!(entity = query.entity_name(), rows = response.rows.len(), more = response.more_records, "memory retrieve");
        Ok(response)
    }

    fn retrieve_total_count(&self, entity: &str) -> Result<u64, ConnectorFault> {
        let entities = self.entities.read().map_err(poisoned)?;
        Ok(Self::store(&entities, entity)?.records.len() as u64)
    }

    fn execute_batch(&self, batch: &MutationBatch) -> Result<BatchOutcome, ConnectorFault> {
        let mut entities = self.entities.write().map_err(poisoned)?;
        let mut outcome = BatchOutcome::ok();
        for (index, request) in batch.requests.iter().enumerate() {
            if let Err(fault) = Self::apply(&mut entities, request) {
                outcome.faults.push(BatchFault { index, fault });
                break;
            }
        }
        debug!(size = batch.len(), faults = outcome.faults.len(), "memory batch applied");
        Ok(outcome)
    }

    fn submit_bulk_delete_job(&self, query: &FetchQuery) -> Result<JobHandle, ConnectorFault> {
        let mut entities = self.entities.write().map_err(poisoned)?;
        let tuples = Self::matching(&entities, query)?;
        let store = Self::store(&entities, query.entity_name())?;
        let ids: HashSet<Uuid> = tuples.iter()
            .filter_map(|t| t.get(&store.primary_id).and_then(Value::as_str))
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect();
        let store = Self::store_mut(&mut entities, query.entity_name());
        store.records.retain(|id, _| !ids.contains(id));

        let job = JobHandle { id: Uuid::new_v4() };
        self.jobs.write().map_err(poisoned)?.push(job);
        debug!(%job, deleted = ids.len(), "bulk delete job ran");
        Ok(job)
    }
}

/// Key of `attribute` in a flattened record.
fn source_key(owner: Option<&str>, attribute: &str) -> String {
    match owner {
        Some(alias) => format!("{}.{}", alias, attribute),
        None => attribute.to_string(),
    }
}

/// Ids compare case-insensitively.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.eq_ignore_ascii_case(y),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::executor::_tests::fixtures::{memory, CONTOSO, FABRIKAM};
    use crate::query::{AggregateKind, Condition, ConditionOperator, ConditionValue, FetchAttribute, FilterNode, SortSpec};

    fn attr(name: &str) -> FetchItem {
        FetchItem::Attribute(FetchAttribute::new(name, None))
    }

    fn condition(entity: Option<&str>, attribute: &str, operator: ConditionOperator, value: &str) -> FetchItem {
        FetchItem::Filter(FilterNode::and(vec![FilterNode::Condition(Condition::new(
            entity,
            attribute,
            operator,
            ConditionValue::Single(value.into()),
        ))]))
    }

    fn accounts_by_name() -> FetchQuery {
        let mut q = FetchQuery::new("account");
        q.entity.push(attr("name"));
        q.entity.push(FetchItem::Order(SortSpec::attribute("name", false)));
        q
    }

    fn names(rows: &[Row], key: &str) -> Vec<Value> {
        rows.iter().map(|r| r.value(key)).collect()
    }

    #[test]
    fn filters_and_sorts_root_records() {
        let m = memory();
        let mut q = accounts_by_name();
        q.entity.push(condition(None, "revenue", ConditionOperator::Gt, "50"));
        let rows = m.retrieve(&q).unwrap().rows;
        assert_eq!(names(&rows, "name"), vec![json!("Contoso"), json!("Fabrikam")]);
        assert_eq!(rows[0].0.len(), 1);
    }

    #[test]
    fn like_is_case_insensitive() {
        let m = memory();
        let mut q = accounts_by_name();
        q.entity.push(condition(None, "name", ConditionOperator::Like, "%WIND"));
        assert_eq!(names(&m.retrieve(&q).unwrap().rows, "name"), vec![json!("Northwind")]);
    }

    #[test]
    fn inner_and_outer_links() {
        let m = memory();
        let mut q = FetchQuery::new("contact");
        q.entity.push(attr("fullname"));
        q.entity.push(FetchItem::Order(SortSpec::attribute("fullname", false)));
        let mut link = FetchLink::new("account", "a", "accountid", "parentcustomerid", LinkType::Inner);
        link.push(attr("name"));
        q.entity.push(FetchItem::Link(link.clone()));

        let inner = m.retrieve(&q).unwrap().rows;
        assert_eq!(names(&inner, "fullname"), vec![json!("Ann"), json!("Bob"), json!("Cid")]);
        assert_eq!(names(&inner, "a.name"), vec![json!("Contoso"), json!("Contoso"), json!("Fabrikam")]);

        link.link_type = LinkType::Outer;
        q.entity.items_mut().retain(|i| !matches!(i, FetchItem::Link(_)));
        q.entity.push(FetchItem::Link(link));
        let outer = m.retrieve(&q).unwrap().rows;
        assert_eq!(outer.len(), 4);
        assert_eq!(outer[3].value("a.name"), Value::Null);
    }

    #[test]
    fn link_filters_narrow_the_join() {
        let m = memory();
        let mut q = FetchQuery::new("account");
        q.entity.push(attr("name"));
        let mut link = FetchLink::new("contact", "c", "parentcustomerid", "accountid", LinkType::Inner);
        link.push(condition(None, "jobtitle", ConditionOperator::Eq, "ceo"));
        q.entity.push(FetchItem::Link(link));
        q.entity.push(FetchItem::Order(SortSpec::attribute("name", false)));
        assert_eq!(names(&m.retrieve(&q).unwrap().rows, "name"), vec![json!("Contoso"), json!("Fabrikam")]);
    }

    #[test]
    fn pages_carry_a_cookie_until_the_end() {
        let m = memory();
        let first = m.retrieve(&accounts_by_name().for_page(1, 2, None)).unwrap();
        assert_eq!(first.rows.len(), 2);
        assert!(first.more_records);
        assert_eq!(first.paging_cookie.as_deref(), Some("<cookie page=\"1\" />"));

        let second = m.retrieve(&accounts_by_name().for_page(2, 2, first.paging_cookie.as_deref())).unwrap();
        assert_eq!(names(&second.rows, "name"), vec![json!("Northwind")]);
        assert!(!second.more_records);
        assert_eq!(second.paging_cookie, None);
    }

    fn industry_totals() -> FetchQuery {
        let mut q = FetchQuery::new("account");
        q.aggregate = true;
        q.entity.push(FetchItem::Attribute(FetchAttribute::group_key("industrycode", "industry")));
        q.entity.push(FetchItem::Attribute(FetchAttribute::aggregate("accountid", "n", AggregateKind::Count)));
        q.entity.push(FetchItem::Attribute(FetchAttribute::aggregate("numberofemployees", "staff", AggregateKind::Avg)));
        q.entity.push(FetchItem::Order(SortSpec::alias("industry", true)));
        q
    }

    #[test]
    fn aggregates_by_group_key() {
        let rows = memory().retrieve(&industry_totals()).unwrap().rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, json!({ "industry": 2, "n": 2, "staff": 27.5 }).as_object().cloned().unwrap());
        assert_eq!(rows[1].0, json!({ "industry": 1, "n": 1, "staff": 10 }).as_object().cloned().unwrap());
    }

    #[test]
    fn aggregate_over_the_limit_faults() {
        let err = memory().with_aggregate_limit(2).retrieve(&industry_totals()).unwrap_err();
        assert!(err.is_aggregate_limit());
    }

    #[test]
    fn total_count_counts_every_record() {
        assert_eq!(memory().retrieve_total_count("contact").unwrap(), 4);
        assert!(memory().retrieve_total_count("lead").is_err());
    }

    #[test]
    fn batches_stop_at_the_first_fault() {
        let m = memory();
        let missing = Uuid::new_v4();
        let batch = MutationBatch {
            requests: vec![
                MutationRequest::Delete { entity: "account".into(), id: Uuid::parse_str(CONTOSO).unwrap() },
                MutationRequest::Delete { entity: "account".into(), id: missing },
                MutationRequest::Delete { entity: "account".into(), id: Uuid::parse_str(FABRIKAM).unwrap() },
            ],
            bypass_custom_plugins: false,
        };
        let outcome = m.execute_batch(&batch).unwrap();
        assert_eq!(outcome.first_fault().map(|f| f.index), Some(1));
        assert_eq!(m.records("account").len(), 2);
    }

    #[test]
    fn bulk_delete_removes_matching_root_records() {
        let m = memory();
        let mut q = FetchQuery::new("contact");
        q.entity.push(attr("contactid"));
        q.entity.push(condition(None, "jobtitle", ConditionOperator::Eq, "CEO"));
        let job = m.submit_bulk_delete_job(&q).unwrap();
        assert_eq!(m.jobs(), vec![job]);
        let left: Vec<_> = m.records("contact").iter().map(|r| r.value("fullname")).collect();
        assert_eq!(left, vec![json!("Bob"), json!("Dee")]);
    }

    #[test]
    fn load_rejects_non_arrays() {
        assert!(memory().load("account", json!({ "name": "x" })).is_err());
    }
}
