//! Report, result and dependent-entity types.

pub mod entity;
pub mod filter;
pub mod report;
pub mod result;

pub use entity::{Alert, Collection, ConflictSet, ConflictedItem, ConflictedItemType, Dashboard};
pub use filter::{
    ComparisonOperator, DateRange, InstanceStateFilter, MembershipOperator, ReportFilter,
    VariableFilterData, VariableOperator,
};
pub use report::{
    AggregationType, CombinedReportConfiguration, CombinedReportData, CombinedReportItem,
    CustomBucket, DateUnit, DefinitionRef, DistributedBy, GroupBy, ReportConfiguration,
    ReportData, ReportDefinition, ReportKind, ReportView, SingleReportData, UserTaskDurationTime,
    VariableType, ViewEntity, ViewProperty, Visualization,
};
pub use result::{
    BucketedResult, CombinedResult, ExcludedMember, FilterOutcome, MapEntry, MemberResult,
    RawDataRow, ResultData, SingleReportResult, SkippedFilter,
};
