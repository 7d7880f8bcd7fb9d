//! Property-history synthesis: translates a TwinMaker history request into
//! per-property telemetry reads and reshapes the results into the
//! `propertyValues` schema the TwinMaker client expects.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::web::error::AppError;

/// Inbound POST body of the history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub component_name: String,
    pub end_time: String,
    pub entity_id: String,
    pub order_by_time: String,
    pub selected_properties: Vec<String>,
    pub start_time: String,
}

/// Per-property context handed to a [`TelemetryReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectAccessParameter {
    pub workspace_id: String,
    pub component_name: String,
    pub entity_id: String,
    pub property_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub property_values: Vec<PropertyValues>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyValues {
    pub entity_property_reference: EntityPropertyReference,
    pub values: Vec<Sample>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityPropertyReference {
    pub component_name: String,
    pub entity_id: String,
    pub property_name: String,
}

/// A single timestamped reading.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Sample {
    /// ISO-8601 timestamp.
    pub time: String,
    pub value: SampleValue,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleValue {
    pub double_value: f64,
}

/// A source of historical samples for one entity property.
#[async_trait]
pub trait TelemetryReader: Send + Sync {
    async fn read_samples(
        &self,
        parameter: &DirectAccessParameter,
    ) -> Result<Vec<Sample>, AppError>;
}

/// Builds a [`HistoryRecord`] by reading each selected property in turn.
///
/// Output order matches `selectedProperties` exactly; downstream consumers
/// index into it positionally. An empty selection yields an empty record.
/// The first reader failure aborts the whole operation; no partial record
/// is returned.
pub async fn create_history_record(
    workspace_id: &str,
    request: &HistoryRequest,
    reader: &dyn TelemetryReader,
) -> Result<HistoryRecord, AppError> {
    let mut property_values = Vec::with_capacity(request.selected_properties.len());

    for property_name in &request.selected_properties {
        let parameter = DirectAccessParameter {
            workspace_id: workspace_id.to_string(),
            component_name: request.component_name.clone(),
            entity_id: request.entity_id.clone(),
            property_name: property_name.clone(),
        };
        let values = reader.read_samples(&parameter).await?;

        property_values.push(PropertyValues {
            entity_property_reference: EntityPropertyReference {
                component_name: request.component_name.clone(),
                entity_id: request.entity_id.clone(),
                property_name: property_name.clone(),
            },
            values,
        });
    }

    Ok(HistoryRecord { property_values })
}
