//! CSV sample sheets, crop images and their metadata.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::client::DashboardClient;
use crate::api::payload::normalize_list;
use crate::api::types::{
    CropImage, CropImageFilter, CropImageUpload, CsvFile, FileUpload, MetadataEntry, ResourceId,
};
use crate::error::ApiError;
use crate::http::ApiRequest;

#[derive(Debug, Deserialize)]
struct UploadedImages {
    #[serde(default)]
    images: Option<Vec<CropImage>>,
}

impl DashboardClient {
    pub async fn list_csv_files(&self) -> Result<Vec<CsvFile>, ApiError> {
        self.run("Failed to fetch CSV files", async {
            let value: Value = self.fetch_json(ApiRequest::get("csv-files/")).await?;
            let files: Vec<CsvFile> = normalize_list(value)?;
            self.store.update(|s| s.csv_files = files.clone());
            Ok(files)
        })
        .await
    }

    pub async fn get_csv_file(&self, id: ResourceId) -> Result<CsvFile, ApiError> {
        self.run("Failed to fetch CSV file", async {
            let file: CsvFile = self
                .fetch_json(ApiRequest::get(format!("csv-files/{id}/")))
                .await?;
            self.store.update(|s| s.current_csv_file = Some(file.clone()));
            Ok(file)
        })
        .await
    }

    /// Upload a CSV sheet; the new file is put first in the list.
    pub async fn upload_csv_file(&self, upload: &FileUpload) -> Result<CsvFile, ApiError> {
        self.run("Failed to upload CSV file", async {
            let body = upload.to_multipart().await?;
            let file: CsvFile = self
                .fetch_json(ApiRequest::post("csv-files/").multipart(body))
                .await?;
            self.store.update(|s| s.csv_files.insert(0, file.clone()));
            Ok(file)
        })
        .await
    }

    pub async fn process_csv_file(&self, id: ResourceId) -> Result<Value, ApiError> {
        self.run("Failed to process CSV file", async {
            let request = ApiRequest::post(format!("csv-files/{id}/process/"))
                .json(json!({}))
                .timeout(self.api.process_timeout());
            self.fetch_json(request).await
        })
        .await
    }

    pub async fn list_crop_images(
        &self,
        filter: &CropImageFilter,
    ) -> Result<Vec<CropImage>, ApiError> {
        self.run("Failed to fetch crop images", async {
            let mut request = ApiRequest::get("crop-images/");
            for (key, value) in filter.to_query() {
                request = request.query(key, value);
            }
            let value: Value = self.fetch_json(request).await?;
            let images: Vec<CropImage> = normalize_list(value)?;
            self.store.update(|s| s.crop_images = images.clone());
            Ok(images)
        })
        .await
    }

    pub async fn get_crop_image(&self, id: ResourceId) -> Result<CropImage, ApiError> {
        self.run("Failed to fetch crop image", async {
            let image: CropImage = self
                .fetch_json(ApiRequest::get(format!("crop-images/{id}/")))
                .await?;
            self.store.update(|s| s.current_crop_image = Some(image.clone()));
            Ok(image)
        })
        .await
    }

    /// Upload a batch of images; returned images are put first in the list.
    pub async fn upload_crop_images(
        &self,
        upload: &CropImageUpload,
    ) -> Result<Vec<CropImage>, ApiError> {
        self.run("Failed to upload images", async {
            let body = upload.to_multipart().await?;
            let uploaded: UploadedImages = self
                .fetch_json(ApiRequest::post("crop-images/upload_images/").multipart(body))
                .await?;
            let images = uploaded.images.unwrap_or_default();
            self.store.update(|s| {
                for image in &images {
                    s.crop_images.insert(0, image.clone());
                }
            });
            tracing::info!(count = images.len(), "Crop images uploaded");
            Ok(images)
        })
        .await
    }

    /// Known metadata labels.
    ///
    /// Non-critical: a failure yields no labels and leaves `last_error` alone.
    pub async fn metadata_labels(&self) -> Vec<String> {
        let _loading = self.store.begin();

        let result: Result<Vec<String>, ApiError> = async {
            let value: Value = self
                .fetch_json(ApiRequest::get("crop-images/metadata_labels/"))
                .await?;
            normalize_list(value)
        }
        .await;

        match result {
            Ok(labels) => {
                self.store.update(|s| s.metadata_labels = labels.clone());
                labels
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch metadata labels");
                Vec::new()
            }
        }
    }

    /// Attach metadata to an image.
    ///
    /// When the backend answers with the image's metadata list, the image is
    /// re-fetched so `current_crop_image` reflects it.
    pub async fn add_metadata(
        &self,
        image_id: ResourceId,
        metadata: &[MetadataEntry],
    ) -> Result<Value, ApiError> {
        let response: Value = self
            .run("Failed to add metadata", async {
                let request = ApiRequest::post(format!("crop-images/{image_id}/add_metadata/"))
                    .json(json!({ "metadata": metadata }));
                self.fetch_json(request).await
            })
            .await?;

        if response.get("metadata").is_some_and(Value::is_array) {
            let image = self.get_crop_image(image_id).await?;
            return serde_json::to_value(image).map_err(|e| ApiError::Decode(e.to_string()));
        }
        Ok(response)
    }
}
