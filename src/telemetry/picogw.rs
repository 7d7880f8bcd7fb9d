//! Telemetry reader backed by a local PicoGW gateway.
//!
//! Development stand-in for real historical data: every read queries the
//! same hardcoded ECHONET temperature sensor and returns a single sample
//! stamped "now", whatever property or time range was asked for.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::history::{DirectAccessParameter, Sample, SampleValue, TelemetryReader};
use crate::web::error::AppError;

const DEVICE_NAME: &str = "temperaturesensor_1";
const PROPERTY_NAME: &str = "temperaturemeasurementvalue";

pub struct PicoGwReader {
    client: reqwest::Client,
    base_url: String,
}

impl PicoGwReader {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/echonet/{DEVICE_NAME}/{PROPERTY_NAME}",
            self.base_url.trim_end_matches('/'),
        )
    }
}

#[async_trait]
impl TelemetryReader for PicoGwReader {
    async fn read_samples(
        &self,
        _parameter: &DirectAccessParameter,
    ) -> Result<Vec<Sample>, AppError> {
        let response = self.client.get(self.endpoint()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::MalformedResponse(e.to_string()))?;

        Ok(vec![Sample {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            value: SampleValue {
                double_value: first_reported_value(&body)?,
            },
        }])
    }
}

/// Extracts the first reading from a PicoGW `{<key>: {"value": n, ...}, ...}`
/// body. A reading without a `value` key counts as 0.0.
fn first_reported_value(body: &Value) -> Result<f64, AppError> {
    let readings = body
        .as_object()
        .ok_or_else(|| AppError::MalformedResponse("expected a JSON object from PicoGW".to_string()))?;
    let first = readings
        .values()
        .next()
        .ok_or_else(|| AppError::MalformedResponse("PicoGW returned no readings".to_string()))?;
    Ok(first.get("value").and_then(Value::as_f64).unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_reported_value() {
        let body = json!({ "epc_0xE0": { "value": 21.5, "unit": "C" } });
        assert_eq!(first_reported_value(&body).unwrap(), 21.5);
    }

    #[test]
    fn test_missing_value_key_defaults_to_zero() {
        let body = json!({ "epc_0xE0": { "unit": "C" } });
        assert_eq!(first_reported_value(&body).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let err = first_reported_value(&json!({})).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));

        let err = first_reported_value(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[test]
    fn test_endpoint_path() {
        let reader = PicoGwReader::new(
            reqwest::Client::new(),
            "http://localhost:8080/".to_string(),
        );
        assert_eq!(
            reader.endpoint(),
            "http://localhost:8080/v1/echonet/temperaturesensor_1/temperaturemeasurementvalue",
        );
    }
}
