//! Reference evaluator over in-memory process instances.
//!
//! Supports frequency and duration views of process instances and flow
//! nodes, grouped by nothing, start/end/running date, duration, a variable
//! or flow node. Everything else is reported as unsupported.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::evaluation::{
    EvaluationError, EvaluationResult, FilterApplicability, SingleReportEvaluator,
};
use crate::model::{
    AggregationType, BucketedResult, DateUnit, DistributedBy, GroupBy, InstanceStateFilter,
    MapEntry, MembershipOperator, RawDataRow, ReportDefinition, ReportFilter, ReportKind,
    ResultData, SingleReportData, SingleReportResult, UserTaskDurationTime, VariableFilterData,
    VariableOperator, VariableType, ViewEntity, ViewProperty,
};
use crate::reconcile::{
    advance_date, floor_power_of_ten, format_date_key, truncate_date, DATE_KEY_FORMAT,
    DEFAULT_BUCKET_LIMIT,
};

/// Default number of buckets an automatic date grouping aims for.
pub const DEFAULT_AUTOMATIC_DATE_BUCKETS: usize = 80;

/// Definitions and instances the evaluator reads from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDataSet {
    #[serde(default)]
    pub definitions: Vec<ProcessDefinitionSchema>,
    #[serde(default)]
    pub instances: Vec<ProcessInstance>,
}

/// What a process definition declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinitionSchema {
    pub key: String,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableType>,
    #[serde(default)]
    pub flow_nodes: Vec<String>,
}

impl ProcessDefinitionSchema {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            versions: vec!["1".to_string()],
            variables: BTreeMap::new(),
            flow_nodes: Vec::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, variable_type: VariableType) -> Self {
        self.variables.insert(name.into(), variable_type);
        self
    }

    pub fn with_flow_nodes<I, S>(mut self, flow_nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flow_nodes = flow_nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Highest version, numerically when versions are numbers.
    pub fn latest_version(&self) -> Option<&str> {
        self.versions
            .iter()
            .max_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            })
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstanceState {
    Active,
    Suspended,
    Completed,
    Canceled,
}

/// One executed process instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    pub id: String,
    pub definition_key: String,
    #[serde(default = "first_version")]
    pub definition_version: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub start_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub end_date: Option<DateTime<FixedOffset>>,
    pub state: InstanceState,
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub flow_nodes: Vec<FlowNodeInstance>,
}

fn first_version() -> String {
    "1".to_string()
}

impl ProcessInstance {
    pub fn duration_ms(&self) -> Option<f64> {
        self.end_date
            .map(|end| (end - self.start_date).num_milliseconds() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNodeInstance {
    pub id: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Where a measured item falls on the grouping.
enum Position {
    Whole,
    Date(DateTime<FixedOffset>),
    /// Running from the first date until the second, or until the end of
    /// the data when still active.
    Span(DateTime<FixedOffset>, Option<DateTime<FixedOffset>>),
    Number(f64),
    Category(String),
}

/// One measured item: an instance or a flow node instance.
struct Sample {
    position: Position,
    measure: f64,
}

/// Evaluates single process reports over a [`ProcessDataSet`].
#[derive(Debug, Clone)]
pub struct InMemoryEvaluator {
    data: ProcessDataSet,
    automatic_date_buckets: usize,
    bucket_limit: usize,
}

impl InMemoryEvaluator {
    pub fn new(data: ProcessDataSet) -> Self {
        Self {
            data,
            automatic_date_buckets: DEFAULT_AUTOMATIC_DATE_BUCKETS,
            bucket_limit: DEFAULT_BUCKET_LIMIT,
        }
    }

    pub fn with_automatic_date_buckets(mut self, buckets: usize) -> Self {
        self.automatic_date_buckets = buckets.max(1);
        self
    }

    pub fn with_bucket_limit(mut self, bucket_limit: usize) -> Self {
        self.bucket_limit = bucket_limit.max(1);
        self
    }

    pub fn data(&self) -> &ProcessDataSet {
        &self.data
    }

    fn schema(&self, key: &str) -> Option<&ProcessDefinitionSchema> {
        self.data.definitions.iter().find(|d| d.key == key)
    }

    fn matching_instances<'a>(
        &'a self,
        schema: &ProcessDefinitionSchema,
        data: &SingleReportData,
        filters: &[ReportFilter],
    ) -> Vec<&'a ProcessInstance> {
        let latest = schema.latest_version();
        self.data
            .instances
            .iter()
            .filter(|i| i.definition_key == schema.key)
            .filter(|i| data.definition.selects_version(&i.definition_version, latest))
            .filter(|i| data.definition.selects_tenant(i.tenant_id.as_deref()))
            .filter(|i| filters.iter().all(|f| matches_filter(i, f)))
            .collect()
    }

    fn samples(
        &self,
        data: &SingleReportData,
        instances: &[&ProcessInstance],
    ) -> EvaluationResult<Vec<Sample>> {
        let duration_time = data.configuration.user_task_duration_time;
        if data.view.entity == ViewEntity::UserTask
            && data.view.property == ViewProperty::Duration
            && duration_time != UserTaskDurationTime::Total
        {
            // Flow node records only carry the total duration.
            return Err(EvaluationError::Unsupported(format!(
                "{:?} user task duration is not recorded",
                duration_time
            )));
        }

        let mut samples = Vec::new();
        match data.view.entity {
            ViewEntity::ProcessInstance => {
                for instance in instances {
                    let Some(measure) = measure_of(data.view.property, instance.duration_ms())? else {
                        continue;
                    };
                    if let Some(position) = instance_position(&data.group_by, instance)? {
                        samples.push(Sample { position, measure });
                    }
                }
            }
            ViewEntity::FlowNode | ViewEntity::UserTask => {
                for instance in instances {
                    for node in &instance.flow_nodes {
                        let duration = node.duration_ms.map(|ms| ms as f64);
                        let Some(measure) = measure_of(data.view.property, duration)? else {
                            continue;
                        };
                        let position = match &data.group_by {
                            GroupBy::None => Position::Whole,
                            GroupBy::FlowNodes | GroupBy::UserTasks => {
                                Position::Category(node.id.clone())
                            }
                            other => match instance_position(other, instance)? {
                                Some(position) => position,
                                None => continue,
                            },
                        };
                        samples.push(Sample { position, measure });
                    }
                }
            }
            entity => {
                return Err(EvaluationError::Unsupported(format!(
                    "{:?} view is not supported",
                    entity
                )))
            }
        }
        Ok(samples)
    }

    fn date_buckets(
        &self,
        samples: &[Sample],
        unit: DateUnit,
        aggregation: Aggregation,
    ) -> BucketedResult {
        let Some(offset) = samples.iter().find_map(|s| match &s.position {
            Position::Date(d) | Position::Span(d, _) => Some(*d.offset()),
            _ => None,
        }) else {
            return BucketedResult::default();
        };
        let local = |d: &DateTime<FixedOffset>| d.with_timezone(&offset).naive_local();

        let mut bounds: Vec<NaiveDateTime> = Vec::new();
        for sample in samples {
            match &sample.position {
                Position::Date(d) => bounds.push(local(d)),
                Position::Span(from, to) => {
                    bounds.push(local(from));
                    if let Some(to) = to {
                        bounds.push(local(to));
                    }
                }
                _ => {}
            }
        }
        let (Some(min), Some(max)) = (bounds.iter().min().copied(), bounds.iter().max().copied())
        else {
            return BucketedResult::default();
        };

        let unit = match unit {
            DateUnit::Automatic => self.automatic_unit(min, max),
            fixed => fixed,
        };
        let (slots, is_complete) = date_slots(min, max, unit, self.bucket_limit);
        let index: BTreeMap<NaiveDateTime, usize> =
            slots.iter().enumerate().map(|(i, s)| (*s, i)).collect();

        let mut values: Vec<Vec<f64>> = vec![Vec::new(); slots.len()];
        for sample in samples {
            match &sample.position {
                Position::Date(d) => {
                    if let Some(slot) = truncate_date(local(d), unit).and_then(|s| index.get(&s)) {
                        values[*slot].push(sample.measure);
                    }
                }
                Position::Span(from, to) => {
                    let first = truncate_date(local(from), unit);
                    let last = to.as_ref().map(local).unwrap_or(max);
                    let last = truncate_date(last, unit);
                    if let (Some(first), Some(last)) = (first, last) {
                        if first <= last {
                            for slot in index.range(first..=last).map(|(_, slot)| *slot) {
                                values[slot].push(sample.measure);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let entries: Vec<MapEntry> = slots
            .iter()
            .zip(values)
            .map_while(|(slot, bucket)| {
                let key = format_date_key(*slot, offset)?;
                Some(MapEntry::new(key, aggregation.apply(&bucket)))
            })
            .collect();
        let is_complete = is_complete && entries.len() == slots.len();

        BucketedResult {
            entries,
            is_complete,
        }
    }

    /// Finest unit that keeps the span within the automatic bucket target.
    fn automatic_unit(&self, min: NaiveDateTime, max: NaiveDateTime) -> DateUnit {
        DateUnit::FIXED
            .iter()
            .copied()
            .find(|unit| {
                let (slots, complete) = date_slots(min, max, *unit, self.automatic_date_buckets);
                complete && !slots.is_empty()
            })
            .unwrap_or(DateUnit::Year)
    }

    fn numeric_buckets(
        &self,
        samples: &[Sample],
        data: &SingleReportData,
        aggregation: Aggregation,
    ) -> BucketedResult {
        let numbers: Vec<f64> = samples
            .iter()
            .filter_map(|s| match s.position {
                Position::Number(v) => Some(v),
                _ => None,
            })
            .collect();
        if numbers.is_empty() {
            return BucketedResult::default();
        }
        let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let custom = match data.group_by {
            GroupBy::Variable { .. } => data.configuration.custom_bucket.effective(),
            _ => None,
        };
        let baseline = match custom {
            Some((_, Some(baseline))) if baseline <= min => baseline,
            _ => floor_power_of_ten(min),
        };
        let size = match custom {
            Some((Some(size), _)) if size > 0.0 => size,
            _ => floor_power_of_ten((max - baseline) / 10.0).max(1.0),
        };

        let span = ((max - baseline) / size).floor() as usize + 1;
        let count = span.min(self.bucket_limit);
        let mut values: Vec<Vec<f64>> = vec![Vec::new(); count];
        for sample in samples {
            if let Position::Number(v) = sample.position {
                let slot = ((v - baseline) / size).floor() as usize;
                if let Some(bucket) = values.get_mut(slot) {
                    bucket.push(sample.measure);
                }
            }
        }

        let entries = values
            .into_iter()
            .enumerate()
            .map(|(slot, bucket)| {
                let start = baseline + slot as f64 * size;
                let key = if start.fract() == 0.0 {
                    format!("{}", start as i64)
                } else {
                    ryu::Buffer::new().format(start).to_string()
                };
                MapEntry::new(key, aggregation.apply(&bucket))
            })
            .collect();

        BucketedResult {
            entries,
            is_complete: span <= self.bucket_limit,
        }
    }

    fn category_buckets(
        &self,
        samples: &[Sample],
        schema: &ProcessDefinitionSchema,
        data: &SingleReportData,
        aggregation: Aggregation,
    ) -> BucketedResult {
        let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for sample in samples {
            if let Position::Category(key) = &sample.position {
                buckets.entry(key.clone()).or_default().push(sample.measure);
            }
        }

        // flow node groupings list every declared node, in model order
        let mut keys: Vec<String> = match data.group_by {
            GroupBy::FlowNodes | GroupBy::UserTasks => schema.flow_nodes.clone(),
            _ => Vec::new(),
        };
        for key in buckets.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }

        let is_complete = keys.len() <= self.bucket_limit;
        keys.truncate(self.bucket_limit);
        let entries = keys
            .into_iter()
            .map(|key| {
                let value = aggregation.apply(buckets.get(&key).map(Vec::as_slice).unwrap_or(&[]));
                MapEntry::new(key, value)
            })
            .collect();

        BucketedResult {
            entries,
            is_complete,
        }
    }
}

impl SingleReportEvaluator for InMemoryEvaluator {
    fn evaluate(
        &self,
        report: &ReportDefinition,
        filters: &[ReportFilter],
    ) -> EvaluationResult<SingleReportResult> {
        if report.kind() != ReportKind::SingleProcess {
            return Err(EvaluationError::Unsupported(format!(
                "{} cannot be evaluated over process instances",
                report.kind()
            )));
        }
        let data = report
            .single()
            .ok_or_else(|| EvaluationError::Unsupported("missing report data".to_string()))?;
        if data.distributed_by != DistributedBy::None {
            return Err(EvaluationError::Unsupported(
                "second-level groupings are not supported".to_string(),
            ));
        }

        let schema =
            self.schema(&data.definition.key)
                .ok_or_else(|| EvaluationError::DefinitionUnavailable {
                    key: data.definition.key.clone(),
                })?;

        let instances = self.matching_instances(schema, data, filters);
        let instance_ids: BTreeSet<String> = instances.iter().map(|i| i.id.clone()).collect();
        debug!(
            report_id = %report.id,
            definition = %schema.key,
            instances = instances.len(),
            "evaluating single report"
        );

        if data.view.property == ViewProperty::RawData {
            let rows = instances.iter().map(|i| raw_row(i)).collect();
            return Ok(SingleReportResult {
                data: ResultData::Raw(rows),
                instance_ids,
            });
        }

        let aggregation = Aggregation::for_view(data.view.property, data.configuration.aggregation_type);
        let samples = self.samples(data, &instances)?;

        let result = match &data.group_by {
            GroupBy::None => {
                let measures: Vec<f64> = samples.iter().map(|s| s.measure).collect();
                ResultData::Number(aggregation.apply(&measures))
            }
            GroupBy::StartDate { unit } | GroupBy::EndDate { unit } | GroupBy::RunningDate { unit } => {
                ResultData::Map(self.date_buckets(&samples, *unit, aggregation))
            }
            GroupBy::Variable { variable_type, .. } if *variable_type == VariableType::Date => {
                ResultData::Map(self.date_buckets(
                    &samples,
                    data.configuration.group_by_date_variable_unit,
                    aggregation,
                ))
            }
            GroupBy::Duration => ResultData::Map(self.numeric_buckets(&samples, data, aggregation)),
            GroupBy::Variable { variable_type, .. } if variable_type.is_numeric() => {
                ResultData::Map(self.numeric_buckets(&samples, data, aggregation))
            }
            GroupBy::Variable { .. } | GroupBy::FlowNodes | GroupBy::UserTasks => {
                ResultData::Map(self.category_buckets(&samples, schema, data, aggregation))
            }
            other => {
                return Err(EvaluationError::Unsupported(format!(
                    "grouping {:?} is not supported",
                    other
                )))
            }
        };

        Ok(SingleReportResult {
            data: result,
            instance_ids,
        })
    }

    fn applicability(&self, report: &ReportDefinition, filter: &ReportFilter) -> FilterApplicability {
        let Some(schema) = report.single().and_then(|d| self.schema(&d.definition.key)) else {
            return FilterApplicability::Applicable;
        };

        match filter {
            ReportFilter::Variable {
                name, variable_type, ..
            } => match schema.variables.get(name) {
                None => FilterApplicability::NotApplicable(format!(
                    "variable '{}' is not declared by '{}'",
                    name, schema.key
                )),
                Some(declared) if declared != variable_type => {
                    FilterApplicability::NotApplicable(format!(
                        "variable '{}' is {:?} in '{}', not {:?}",
                        name, declared, schema.key, variable_type
                    ))
                }
                Some(_) => FilterApplicability::Applicable,
            },
            ReportFilter::ExecutedFlowNodes { values, .. } => {
                match values.iter().find(|v| !schema.flow_nodes.contains(*v)) {
                    Some(unknown) => FilterApplicability::NotApplicable(format!(
                        "flow node '{}' is not part of '{}'",
                        unknown, schema.key
                    )),
                    None => FilterApplicability::Applicable,
                }
            }
            _ => FilterApplicability::Applicable,
        }
    }
}

/// How bucket values are computed from measures.
#[derive(Debug, Clone, Copy)]
enum Aggregation {
    /// Frequency views count; empty buckets are zero.
    Count,
    /// Duration views aggregate; empty buckets have no value.
    Duration(AggregationType),
}

impl Aggregation {
    fn for_view(property: ViewProperty, aggregation: AggregationType) -> Self {
        match property {
            ViewProperty::Duration => Aggregation::Duration(aggregation),
            _ => Aggregation::Count,
        }
    }

    fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            Aggregation::Count => Some(values.len() as f64),
            Aggregation::Duration(aggregation) => aggregate(values, *aggregation),
        }
    }
}

fn aggregate(values: &[f64], aggregation: AggregationType) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let value = match aggregation {
        AggregationType::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggregationType::Sum => values.iter().sum(),
        AggregationType::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        AggregationType::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregationType::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
    };
    Some(value)
}

/// Measure of one item under the view, `None` when the item has none.
fn measure_of(property: ViewProperty, duration: Option<f64>) -> EvaluationResult<Option<f64>> {
    match property {
        ViewProperty::Frequency => Ok(Some(1.0)),
        ViewProperty::Duration => Ok(duration),
        other => Err(EvaluationError::Unsupported(format!(
            "{:?} view is not supported",
            other
        ))),
    }
}

fn instance_position(
    group_by: &GroupBy,
    instance: &ProcessInstance,
) -> EvaluationResult<Option<Position>> {
    let position = match group_by {
        GroupBy::None => Some(Position::Whole),
        GroupBy::StartDate { .. } => Some(Position::Date(instance.start_date)),
        GroupBy::EndDate { .. } => instance.end_date.map(Position::Date),
        GroupBy::RunningDate { .. } => Some(Position::Span(instance.start_date, instance.end_date)),
        GroupBy::Duration => instance.duration_ms().map(Position::Number),
        GroupBy::Variable {
            name,
            variable_type,
        } => instance
            .variables
            .get(name)
            .and_then(|value| variable_position(value, *variable_type)),
        other => {
            return Err(EvaluationError::Unsupported(format!(
                "grouping {:?} is not supported for this view",
                other
            )))
        }
    };
    Ok(position)
}

fn variable_position(value: &serde_json::Value, variable_type: VariableType) -> Option<Position> {
    if value.is_null() {
        return None;
    }
    if variable_type.is_numeric() {
        return as_number(value).map(Position::Number);
    }
    if variable_type == VariableType::Date {
        return value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(Position::Date);
    }
    Some(Position::Category(value_text(value)))
}

fn as_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn matches_filter(instance: &ProcessInstance, filter: &ReportFilter) -> bool {
    match filter {
        ReportFilter::Variable {
            name,
            variable_type,
            data,
        } => match instance.variables.get(name).filter(|v| !v.is_null()) {
            None => data.include_undefined,
            Some(value) => matches_variable(value, *variable_type, data),
        },
        ReportFilter::InstanceState { state } => match state {
            InstanceStateFilter::Running => {
                matches!(instance.state, InstanceState::Active | InstanceState::Suspended)
            }
            InstanceStateFilter::Completed => instance.state == InstanceState::Completed,
            InstanceStateFilter::Canceled => instance.state == InstanceState::Canceled,
            InstanceStateFilter::Suspended => instance.state == InstanceState::Suspended,
            InstanceStateFilter::NonSuspended => instance.state != InstanceState::Suspended,
        },
        ReportFilter::StartDate { range } => range.contains(&instance.start_date),
        ReportFilter::EndDate { range } => instance.end_date.is_some_and(|end| range.contains(&end)),
        ReportFilter::Duration { operator, value_ms } => instance
            .duration_ms()
            .is_some_and(|ms| operator.holds(ms, *value_ms as f64)),
        ReportFilter::ExecutedFlowNodes { operator, values } => {
            let executed = instance.flow_nodes.iter().any(|n| values.contains(&n.id));
            match operator {
                MembershipOperator::In => executed,
                MembershipOperator::NotIn => !executed,
            }
        }
    }
}

fn matches_variable(
    value: &serde_json::Value,
    variable_type: VariableType,
    data: &VariableFilterData,
) -> bool {
    let equals = |expected: &String| {
        if variable_type.is_numeric() {
            match (as_number(value), expected.trim().parse::<f64>()) {
                (Some(actual), Ok(expected)) => actual == expected,
                _ => false,
            }
        } else {
            value_text(value) == *expected
        }
    };
    let compare = |expected: &String| -> Option<std::cmp::Ordering> {
        if variable_type == VariableType::Date {
            let actual = value.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok())?;
            let expected = DateTime::parse_from_rfc3339(expected).ok()?;
            Some(actual.cmp(&expected))
        } else {
            let actual = as_number(value)?;
            let expected = expected.trim().parse::<f64>().ok()?;
            actual.partial_cmp(&expected)
        }
    };

    match data.operator {
        VariableOperator::In => data.values.iter().any(equals),
        VariableOperator::NotIn => !data.values.iter().any(equals),
        VariableOperator::GreaterThan => data
            .values
            .first()
            .and_then(compare)
            .is_some_and(|o| o == std::cmp::Ordering::Greater),
        VariableOperator::LessThan => data
            .values
            .first()
            .and_then(compare)
            .is_some_and(|o| o == std::cmp::Ordering::Less),
    }
}

/// Bucket starts from `min` to `max`, capped at `limit`.
fn date_slots(
    min: NaiveDateTime,
    max: NaiveDateTime,
    unit: DateUnit,
    limit: usize,
) -> (Vec<NaiveDateTime>, bool) {
    let (Some(first), Some(last)) = (truncate_date(min, unit), truncate_date(max, unit)) else {
        return (Vec::new(), true);
    };
    let mut slots = Vec::new();
    let mut index = 0u32;
    while let Some(slot) = advance_date(first, unit, index) {
        if slot > last {
            return (slots, true);
        }
        if slots.len() == limit {
            return (slots, false);
        }
        slots.push(slot);
        index += 1;
    }
    (slots, true)
}

fn raw_row(instance: &ProcessInstance) -> RawDataRow {
    RawDataRow {
        instance_id: instance.id.clone(),
        definition_key: instance.definition_key.clone(),
        start_date: instance.start_date.format(DATE_KEY_FORMAT).to_string(),
        end_date: instance
            .end_date
            .map(|d| d.format(DATE_KEY_FORMAT).to_string()),
        variables: instance.variables.clone(),
    }
}
