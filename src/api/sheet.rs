//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.

use crate::api::{quote_sheet_name, Sheet, SheetRange, TokenProvider};
use crate::error::Res;
use anyhow::Context;
use serde::Deserialize;
use sheets::types::{
    BatchUpdateValuesRequest, DateTimeRenderOption, Dimension, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::trace;

/// Talks to Google. It holds a `TokenProvider` and refreshes the client's token before each call.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    client: sheets::Client,
}

/// The only field we request from the Drive files endpoint.
#[derive(Debug, Deserialize)]
struct DriveFile {
    version: String,
}

impl GoogleSheet {
    pub(super) async fn new(spreadsheet_id: &str, mut token_provider: TokenProvider) -> Res<Self> {
        let client = create_sheets_client(&mut token_provider).await?;
        Ok(Self {
            spreadsheet_id: spreadsheet_id.to_string(),
            token_provider,
            client,
        })
    }

    /// Refreshes the sheets client with a new access token if needed
    async fn refresh_client(&mut self) -> Res<()> {
        self.client = create_sheets_client(&mut self.token_provider).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    async fn get(&mut self, sheet_name: &str) -> Res<Vec<Vec<String>>> {
        trace!("get for {sheet_name}");
        self.refresh_client().await?;
        let range = format!("{}!A:ZZ", quote_sheet_name(sheet_name));
        let response = self
            .client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {sheet_name} sheet data"))?;
        Ok(response.body.values)
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()> {
        self.refresh_client().await?;
        let request = batch_update_request(data);
        self.client
            .spreadsheets()
            .values_batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .context("Failed to write ranges")?;
        Ok(())
    }

    async fn revision(&mut self) -> Res<String> {
        // GET https://www.googleapis.com/drive/v3/files/{fileId}?fields=version
        let url = format!(
            "https://www.googleapis.com/drive/v3/files/{}",
            self.spreadsheet_id
        );
        let token = self.token_provider.token_with_refresh().await?.to_string();

        let response = reqwest::Client::new()
            .get(&url)
            .query(&[("fields", "version")])
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send the revision request to the Google Drive API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Google Drive API revision lookup failed with status {status}: {body}");
        }

        let file: DriveFile = response
            .json()
            .await
            .context("Failed to parse the Google Drive API response")?;
        trace!("Spreadsheet revision is {}", file.version);
        Ok(file.version)
    }
}

/// Builds one batch write of `data`. Values are stored as given, so a description such as
/// "=SUM(A1)" stays text instead of becoming a formula.
fn batch_update_request(data: &[SheetRange]) -> BatchUpdateValuesRequest {
    let value_ranges: Vec<ValueRange> = data
        .iter()
        .map(|sr| {
            trace!("Writing {} rows to {}", sr.values.len(), sr.a1());
            ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: sr.a1(),
                values: sr.values.clone(),
            }
        })
        .collect();

    BatchUpdateValuesRequest {
        data: value_ranges,
        include_values_in_response: Some(false),
        response_date_time_render_option: None,
        response_value_render_option: None,
        value_input_option: Some(ValueInputOption::Raw),
    }
}

/// Creates a new sheets client with a refreshed access token.
async fn create_sheets_client(token_provider: &mut TokenProvider) -> Res<sheets::Client> {
    let access_token = token_provider.token_with_refresh().await?;

    // Only the access token is used. We do the refreshing ourselves.
    Ok(sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token.to_string(),
        String::new(),
    ))
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}
