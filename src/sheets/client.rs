//! Google Sheets v4 REST client.
//!
//! Implements [`TableReader`] and [`TableWriter`] on top of the
//! `spreadsheets.values` endpoints.

use super::a1::qualified;
use super::auth::TokenProvider;
use super::{SheetsError, TableReader, TableWriter};
use crate::config::{AuthConfig, SheetsConfig};
use crate::models::Table;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Values are interpreted as if typed into the sheet.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

/// A `ValueRange` resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Table,
}

impl ValueRange {
    fn rows(range: String, values: &Table) -> Self {
        Self {
            range: Some(range),
            major_dimension: Some("ROWS".to_string()),
            values: values.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest {
    value_input_option: &'static str,
    data: Vec<ValueRange>,
}

/// Client for one spreadsheet.
#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: Url,
    spreadsheet_id: String,
    auth: TokenProvider,
}

impl SheetsClient {
    /// Create a client with credentials taken from the auth configuration.
    pub fn new(sheets: &SheetsConfig, auth: &AuthConfig) -> Result<Self, SheetsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(sheets.timeout_seconds))
            .build()?;
        let provider = TokenProvider::from_config(auth, http.clone())?;
        Self::with_provider(sheets, http, provider)
    }

    /// Create a client with an explicit token provider.
    pub fn with_provider(
        sheets: &SheetsConfig,
        http: reqwest::Client,
        auth: TokenProvider,
    ) -> Result<Self, SheetsError> {
        let base_url = Url::parse(&sheets.api_base_url)
            .map_err(|e| SheetsError::InvalidUrl(format!("{}: {}", sheets.api_base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetsError::InvalidUrl(sheets.api_base_url.clone()));
        }

        info!(
            "Sheets client for spreadsheet {} at {}",
            sheets.spreadsheet_id, base_url
        );

        Ok(Self {
            http,
            base_url,
            spreadsheet_id: sheets.spreadsheet_id.clone(),
            auth,
        })
    }

    fn endpoint(&self, last: &str) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), last]);
        Ok(url)
    }

    /// URL of the `values` resource for a sheet-qualified range.
    fn values_url(&self, range: &str) -> Result<Url, SheetsError> {
        let mut url = self.endpoint("values")?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.base_url.to_string()))?
            .push(range);
        Ok(url)
    }

    fn batch_update_url(&self) -> Result<Url, SheetsError> {
        self.endpoint("values:batchUpdate")
    }

    /// Attach the bearer token, send, and turn non-2xx replies into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.auth.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SheetsError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl TableReader for SheetsClient {
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Table, SheetsError> {
        let range = qualified(sheet, range);
        debug!("GET values {}", range);

        let url = self.values_url(&range)?;
        let response = self
            .send(self.http.get(url).query(&[("majorDimension", "ROWS")]))
            .await?;
        let value_range: ValueRange = response.json().await?;

        Ok(value_range.values)
    }
}

#[async_trait]
impl TableWriter for SheetsClient {
    async fn write_range(
        &self,
        sheet: &str,
        start_cell: &str,
        table: &Table,
    ) -> Result<(), SheetsError> {
        let range = qualified(sheet, start_cell);
        debug!("PUT values {} ({} rows)", range, table.len());

        let url = self.values_url(&range)?;
        let body = ValueRange::rows(range, table);
        self.send(
            self.http
                .put(url)
                .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
                .json(&body),
        )
        .await?;

        Ok(())
    }

    async fn write_ranges(&self, sheet: &str, writes: &[(String, Table)]) -> Result<(), SheetsError> {
        let request = BatchUpdateRequest {
            value_input_option: VALUE_INPUT_OPTION,
            data: writes
                .iter()
                .map(|(start_cell, table)| ValueRange::rows(qualified(sheet, start_cell), table))
                .collect(),
        };
        debug!("POST values:batchUpdate ({} ranges)", request.data.len());

        let url = self.batch_update_url()?;
        self.send(self.http.post(url).json(&request)).await?;

        Ok(())
    }
}
