//! Excel file and processed-data actions.

use serde_json::{json, Value};

use crate::api::client::DashboardClient;
use crate::api::payload::normalize_list;
use crate::api::types::{ExcelFile, FileUpload, ResourceId};
use crate::error::ApiError;
use crate::http::ApiRequest;
use crate::resilience::retry_with_backoff;

impl DashboardClient {
    /// List uploaded files. An unrecognized payload shape yields no files.
    pub async fn list_files(&self) -> Result<Vec<ExcelFile>, ApiError> {
        self.run("Failed to fetch files", async {
            let value: Value = self.fetch_json(ApiRequest::get("excel-files/")).await?;
            let files = normalize_list(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Unexpected files payload, showing none");
                Vec::new()
            });
            self.store.update(|s| s.files = files.clone());
            Ok(files)
        })
        .await
    }

    /// Fetch one file, preferring the detail endpoint.
    pub async fn get_file(&self, id: ResourceId) -> Result<ExcelFile, ApiError> {
        self.run("Failed to fetch file details", async {
            let detail = self
                .fetch_json::<ExcelFile>(ApiRequest::get(format!("excel-files/{id}/detail/")))
                .await;
            let file = match detail {
                Ok(file) => file,
                Err(e) => {
                    tracing::debug!(%id, error = %e, "Detail endpoint failed, using plain endpoint");
                    self.fetch_json(ApiRequest::get(format!("excel-files/{id}/")))
                        .await?
                }
            };
            self.store.update(|s| s.current_file = Some(file.clone()));
            Ok(file)
        })
        .await
    }

    /// Upload a spreadsheet, then reload the file list.
    pub async fn upload_file(&self, upload: &FileUpload) -> Result<ExcelFile, ApiError> {
        let file = self
            .run("Failed to upload file", async {
                let body = upload.to_multipart().await?;
                self.fetch_json::<ExcelFile>(ApiRequest::post("excel-files/").multipart(body))
                    .await
            })
            .await?;

        tracing::info!(id = %file.id, title = %file.title, "File uploaded");
        if let Err(e) = self.list_files().await {
            tracing::debug!(error = %e, "File list reload after upload failed");
        }
        Ok(file)
    }

    /// Ask the backend to process an uploaded file.
    pub async fn process_file(&self, id: ResourceId) -> Result<Value, ApiError> {
        self.run("Failed to process file", async {
            let request = ApiRequest::post(format!("excel-files/{id}/process/"))
                .json(json!({}))
                .timeout(self.api.process_timeout());
            let result: Value = self.fetch_json(request).await?;
            self.store.update(|s| {
                for file in s.files.iter_mut().filter(|f| f.id == id) {
                    file.processed = true;
                }
            });
            Ok(result)
        })
        .await
    }

    /// Fetch a file's processed rows with bounded retry.
    ///
    /// Never fails: once retries are exhausted, or on a permanent failure,
    /// the rows are empty and `last_error` carries the reason.
    pub async fn fetch_processed_data(&self, id: ResourceId) -> Vec<Value> {
        let _loading = self.store.begin();
        self.store.set_error(None);

        let result = retry_with_backoff(
            &self.retry,
            self.delay.as_ref(),
            ApiError::is_retriable,
            move |attempt| async move {
                tracing::debug!(%id, attempt, "Fetching processed data");
                let request = ApiRequest::get("processed-data/by_file/")
                    .query("file_id", id.to_string())
                    .timeout(self.api.data_timeout());
                let value: Value = self.fetch_json(request).await?;
                normalize_list::<Value>(value)
            },
        )
        .await;

        let rows = match result {
            Ok(rows) => rows,
            Err(exhausted) => {
                tracing::warn!(
                    %id,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "Failed to fetch processed data"
                );
                self.store.set_error(Some(
                    exhausted
                        .last_error
                        .user_message("Failed to fetch processed data"),
                ));
                Vec::new()
            }
        };

        self.store.update(|s| s.processed_data = rows.clone());
        rows
    }

    /// Delete a file and drop it from state.
    pub async fn delete_file(&self, id: ResourceId) -> Result<(), ApiError> {
        self.run("Failed to delete file", async {
            self.pipeline
                .execute(ApiRequest::delete(format!("excel-files/{id}/")))
                .await?;
            self.store.update(|s| {
                s.files.retain(|f| f.id != id);
                if s.current_file.as_ref().is_some_and(|f| f.id == id) {
                    s.current_file = None;
                }
            });
            Ok(())
        })
        .await
    }
}
