//! [`TabularStore`] backed by the Google Sheets v4 REST API.
//!
//! Each page is a sheet (tab) of one spreadsheet. Values are written with
//! `valueInputOption=RAW` so user-supplied text is never evaluated as a
//! formula and timestamps stay plain strings.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use lunchpoll_core::SheetRow;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    StoreError, TabularStore,
    types::{
        AddSheet, AppendValuesResponse, BatchUpdateRequest, BatchUpdateResponse, CellData,
        CellFormat, ClearValuesResponse, GridRange, NewSheetProperties, RepeatCell, Request,
        Spreadsheet, TextFormat, UpdateValuesResponse, ValueRange, ValueRangeInput,
    },
};

/// Default Sheets API base URL.
pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4";

const VALUE_INPUT_OPTION: &str = "RAW";

/// Google Sheets client bound to one spreadsheet.
#[derive(Clone)]
pub struct GoogleSheetsStore {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

impl std::fmt::Debug for GoogleSheetsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsStore")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl GoogleSheetsStore {
    /// Creates a store against the public API endpoint.
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_SHEETS_ENDPOINT.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Points the store at a different API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEndpoint`] if `endpoint` is empty or not
    /// an absolute URL.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, StoreError> {
        self.base_url = normalize_base_url(endpoint)?;
        Ok(self)
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<reqwest::Url, StoreError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| StoreError::InvalidEndpoint(format!("{}: {e}", self.base_url)))?;
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                StoreError::InvalidEndpoint("base_url must be an absolute URL".to_string())
            })?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn values_url(&self, range: &str) -> Result<reqwest::Url, StoreError> {
        self.url_with_segments(&["spreadsheets", &self.spreadsheet_id, "values", range])
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: reqwest::Url,
        query: &[(&str, &str)],
    ) -> Result<T, StoreError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        handle_response(response).await
    }

    async fn put_json<TReq: Serialize, TRes: for<'de> Deserialize<'de>>(
        &self,
        url: reqwest::Url,
        body: &TReq,
        query: &[(&str, &str)],
    ) -> Result<TRes, StoreError> {
        let response = self
            .http
            .put(url)
            .query(query)
            .json(body)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        handle_response(response).await
    }

    async fn post_json<TReq: Serialize, TRes: for<'de> Deserialize<'de>>(
        &self,
        url: reqwest::Url,
        body: &TReq,
        query: &[(&str, &str)],
    ) -> Result<TRes, StoreError> {
        let response = self
            .http
            .post(url)
            .query(query)
            .json(body)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        handle_response(response).await
    }

    async fn fetch_rows(&self, page: &str) -> Result<Vec<SheetRow>, StoreError> {
        let range: ValueRange = self
            .get_json(
                self.values_url(&a1_range(page, None))?,
                &[("majorDimension", "ROWS")],
            )
            .await
            .map_err(|e| page_not_found(e, page))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn fetch_spreadsheet(&self) -> Result<Spreadsheet, StoreError> {
        self.get_json(
            self.url_with_segments(&["spreadsheets", &self.spreadsheet_id])?,
            &[("fields", "sheets.properties(sheetId,title)")],
        )
        .await
    }

    async fn batch_update(
        &self,
        requests: Vec<Request>,
    ) -> Result<BatchUpdateResponse, StoreError> {
        let batch = format!("{}:batchUpdate", self.spreadsheet_id);
        self.post_json(
            self.url_with_segments(&["spreadsheets", &batch])?,
            &BatchUpdateRequest { requests },
            &[],
        )
        .await
    }
}

fn read_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(200))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(3)
        .with_jitter()
}

#[async_trait]
impl TabularStore for GoogleSheetsStore {
    #[instrument(skip(self), fields(page = %page))]
    async fn get_rows(&self, page: &str) -> Result<Vec<SheetRow>, StoreError> {
        (|| self.fetch_rows(page))
            .retry(read_backoff())
            .when(StoreError::is_transient)
            .notify(|err, after| warn!(error = %err, ?after, "Retrying sheet read"))
            .await
    }

    #[instrument(skip(self), fields(page = %page))]
    async fn clear_rows(&self, page: &str) -> Result<(), StoreError> {
        let clear = format!("{}:clear", a1_range(page, None));
        let response: ClearValuesResponse = self
            .post_json(self.values_url(&clear)?, &serde_json::json!({}), &[])
            .await
            .map_err(|e| page_not_found(e, page))?;
        debug!(cleared = ?response.cleared_range, "Cleared page");
        Ok(())
    }

    #[instrument(skip(self, rows), fields(page = %page, rows = rows.len()))]
    async fn write_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError> {
        let range = a1_range(page, Some("A1"));
        let body = ValueRangeInput {
            range: range.clone(),
            major_dimension: "ROWS",
            values: rows,
        };
        let response: UpdateValuesResponse = self
            .put_json(
                self.values_url(&range)?,
                &body,
                &[("valueInputOption", VALUE_INPUT_OPTION)],
            )
            .await
            .map_err(|e| page_not_found(e, page))?;
        debug!(
            updated_range = %response.updated_range,
            updated_rows = response.updated_rows,
            "Wrote page"
        );
        Ok(())
    }

    #[instrument(skip(self, rows), fields(page = %page, rows = rows.len()))]
    async fn append_rows(&self, page: &str, rows: &[SheetRow]) -> Result<(), StoreError> {
        let range = a1_range(page, None);
        let append = format!("{range}:append");
        let body = ValueRangeInput {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let response: AppendValuesResponse = self
            .post_json(
                self.values_url(&append)?,
                &body,
                &[
                    ("valueInputOption", VALUE_INPUT_OPTION),
                    ("insertDataOption", "INSERT_ROWS"),
                ],
            )
            .await
            .map_err(|e| page_not_found(e, page))?;
        debug!(updated_range = %response.updates.updated_range, "Appended rows");
        Ok(())
    }

    #[instrument(skip(self), fields(page = %page))]
    async fn page_exists(&self, page: &str) -> Result<bool, StoreError> {
        let spreadsheet = (|| self.fetch_spreadsheet())
            .retry(read_backoff())
            .when(StoreError::is_transient)
            .notify(|err, after| warn!(error = %err, ?after, "Retrying sheet listing"))
            .await?;
        Ok(spreadsheet
            .sheets
            .iter()
            .any(|sheet| sheet.properties.title == page))
    }

    #[instrument(skip(self, header), fields(page = %page))]
    async fn create_page(&self, page: &str, header: &[String]) -> Result<(), StoreError> {
        let response = self
            .batch_update(vec![Request::AddSheet(AddSheet {
                properties: NewSheetProperties {
                    title: page.to_string(),
                },
            })])
            .await?;

        let sheet_id = response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet)
            .map(|added| added.properties.sheet_id)
            .ok_or_else(|| StoreError::Api {
                status: 200,
                body: "no sheet was added in the batchUpdate response".to_string(),
            })?;

        if header.is_empty() {
            return Ok(());
        }
        self.write_rows(page, &[header.to_vec()]).await?;

        self.batch_update(vec![Request::RepeatCell(RepeatCell {
            range: GridRange {
                sheet_id,
                start_row_index: 0,
                end_row_index: 1,
            },
            cell: CellData {
                user_entered_format: CellFormat {
                    text_format: TextFormat { bold: true },
                },
            },
            fields: "userEnteredFormat.textFormat.bold",
        })])
        .await?;

        debug!(sheet_id, "Created page");
        Ok(())
    }
}

async fn handle_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json::<T>().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

/// The API reports a range on a missing sheet as an unparsable range.
fn page_not_found(err: StoreError, page: &str) -> StoreError {
    match err {
        StoreError::Api { status: 400, body } if body.contains("Unable to parse range") => {
            StoreError::PageNotFound(page.to_string())
        }
        other => other,
    }
}

/// Builds an A1 range on `page`, quoting the sheet name so titles such as
/// `18/10/26` are not read as cell references.
fn a1_range(page: &str, cells: Option<&str>) -> String {
    let quoted = format!("'{}'", page.replace('\'', "''"));
    match cells {
        Some(cells) => format!("{quoted}!{cells}"),
        None => quoted,
    }
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn normalize_base_url(endpoint: &str) -> Result<String, StoreError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidEndpoint(
            "endpoint must not be empty".to_string(),
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{bearer_token, body_json, method, path, path_regex, query_param},
    };

    use super::*;

    async fn store(server: &MockServer) -> GoogleSheetsStore {
        GoogleSheetsStore::new("sheet-1", "token-abc")
            .with_endpoint(&server.uri())
            .unwrap()
    }

    fn row(values: &[&str]) -> SheetRow {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_a1_range_quotes_sheet_names() {
        assert_eq!(a1_range("18/10/26", None), "'18/10/26'");
        assert_eq!(a1_range("Members List", Some("A1")), "'Members List'!A1");
        assert_eq!(a1_range("Bob's", None), "'Bob''s'");
    }

    #[test]
    fn test_normalize_base_url_rejects_blank() {
        assert!(matches!(
            normalize_base_url("  "),
            Err(StoreError::InvalidEndpoint(_))
        ));
        assert_eq!(
            normalize_base_url("http://localhost:1/").unwrap(),
            "http://localhost:1"
        );
    }

    #[test]
    fn test_debug_hides_access_token() {
        let store = GoogleSheetsStore::new("sheet-1", "secret-token");
        assert!(!format!("{store:?}").contains("secret-token"));
    }

    #[tokio::test]
    async fn test_get_rows_converts_cells_to_strings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/.Menu.$"))
            .and(bearer_token("token-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "'Menu'!A1:B3",
                "majorDimension": "ROWS",
                "values": [["Item ID", "Item"], ["dal", "Dal Tadka"], [42, true]]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let rows = store(&server).await.get_rows("Menu").await.unwrap();

        assert_eq!(
            rows,
            vec![
                row(&["Item ID", "Item"]),
                row(&["dal", "Dal Tadka"]),
                row(&["42", "true"])
            ]
        );
    }

    #[tokio::test]
    async fn test_get_rows_on_empty_sheet_returns_no_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "range": "'Menu'!A1:Z1000",
                "majorDimension": "ROWS"
            })))
            .mount(&server)
            .await;

        assert!(store(&server).await.get_rows("Menu").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_range_maps_to_page_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "Unable to parse range: '19/10/26'",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = store(&server).await.get_rows("19/10/26").await.unwrap_err();
        assert!(matches!(err, StoreError::PageNotFound(page) if page == "19/10/26"));
    }

    #[tokio::test]
    async fn test_get_rows_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["User ID"]]
            })))
            .mount(&server)
            .await;

        let rows = store(&server).await.get_rows("p").await.unwrap();
        assert_eq!(rows, vec![row(&["User ID"])]);
    }

    #[tokio::test]
    async fn test_get_rows_does_not_retry_auth_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let err = store(&server).await.get_rows("p").await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 403, body } if body == "forbidden"));
    }

    #[tokio::test]
    async fn test_write_rows_puts_raw_values_at_a1() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/.Menu.!A1$"))
            .and(query_param("valueInputOption", "RAW"))
            .and(body_json(json!({
                "range": "'Menu'!A1",
                "majorDimension": "ROWS",
                "values": [["=SUM(1,2)", "08:00:00"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spreadsheetId": "sheet-1",
                "updatedRange": "'Menu'!A1:B1",
                "updatedRows": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .await
            .write_rows("Menu", &[row(&["=SUM(1,2)", "08:00:00"])])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_rows_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = store(&server)
            .await
            .write_rows("p", &[row(&["a"])])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_clear_rows_posts_clear() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/.Menu.:clear$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spreadsheetId": "sheet-1",
                "clearedRange": "'Menu'!A1:Z1000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).await.clear_rows("Menu").await.unwrap();
    }

    #[tokio::test]
    async fn test_append_rows_inserts_rows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/.Members%20List.:append$"))
            .and(query_param("valueInputOption", "RAW"))
            .and(query_param("insertDataOption", "INSERT_ROWS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spreadsheetId": "sheet-1",
                "updates": {
                    "updatedRange": "'Members List'!A5:B5",
                    "updatedRows": 1
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .await
            .append_rows("Members List", &[row(&["U9", "Zoe"])])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_page_exists_lists_sheet_titles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sheet-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sheets": [
                    {"properties": {"sheetId": 0, "title": "Sheet1"}},
                    {"properties": {"sheetId": 7, "title": "18/10/26"}}
                ]
            })))
            .mount(&server)
            .await;

        let store = store(&server).await;
        assert!(store.page_exists("18/10/26").await.unwrap());
        assert!(!store.page_exists("19/10/26").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_page_adds_sheet_writes_and_bolds_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1:batchUpdate"))
            .and(body_json(json!({
                "requests": [{"addSheet": {"properties": {"title": "19/10/26"}}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spreadsheetId": "sheet-1",
                "replies": [{"addSheet": {"properties": {"sheetId": 99, "title": "19/10/26", "index": 3}}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "updatedRange": "'19/10/26'!A1:D1",
                "updatedRows": 1
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1:batchUpdate"))
            .and(body_json(json!({
                "requests": [{"repeatCell": {
                    "range": {"sheetId": 99, "startRowIndex": 0, "endRowIndex": 1},
                    "cell": {"userEnteredFormat": {"textFormat": {"bold": true}}},
                    "fields": "userEnteredFormat.textFormat.bold"
                }}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "spreadsheetId": "sheet-1",
                "replies": [{}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .await
            .create_page("19/10/26", &row(&["User ID", "Timestamp", "Display Name", "Item Voted"]))
            .await
            .unwrap();
    }
}
