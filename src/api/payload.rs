//! Normalization of list payloads.
//!
//! The backend answers list endpoints in one of three shapes:
//!
//! ```text
//! [ {...}, {...} ]                          bare list
//! { "success": true, "data": [ ... ] }      success envelope
//! { "count": 2, "results": [ ... ] }        paginated page
//! ```
//!
//! All three collapse to a `Vec<T>` here, once, at the response boundary.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListPayload<T> {
    Bare(Vec<T>),
    Envelope {
        success: bool,
        data: Option<Vec<T>>,
    },
    Page {
        results: Vec<T>,
    },
}

impl<T> ListPayload<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) | ListPayload::Page { results: items } => items,
            ListPayload::Envelope {
                success: true,
                data,
            } => data.unwrap_or_default(),
            ListPayload::Envelope { success: false, .. } => Vec::new(),
        }
    }
}

/// Collapse any accepted list shape into its items.
///
/// An envelope reporting `success: false` yields an empty list. A value
/// matching none of the shapes is a [`ApiError::Decode`].
pub fn normalize_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    serde_json::from_value::<ListPayload<T>>(value)
        .map(ListPayload::into_vec)
        .map_err(|e| ApiError::Decode(format!("unrecognized list payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_list() {
        let rows: Vec<Value> = normalize_list(json!([{"crop": "rice"}, {"crop": "maize"}])).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_success_envelope() {
        let rows: Vec<Value> =
            normalize_list(json!({"success": true, "data": [{"crop": "rice"}]})).unwrap();
        assert_eq!(rows, vec![json!({"crop": "rice"})]);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Plot {
        plot_id: String,
    }

    #[test]
    fn test_envelope_of_records_without_default() {
        let plots: Vec<Plot> =
            normalize_list(json!({"success": true, "data": [{"plot_id": "P1"}]})).unwrap();
        assert_eq!(plots, vec![Plot { plot_id: "P1".into() }]);

        let none: Vec<Plot> = normalize_list(json!({"success": true})).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_failed_envelope_is_empty() {
        let rows: Vec<Value> =
            normalize_list(json!({"success": false, "error": "not processed"})).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_paginated_page() {
        let ids: Vec<u64> = normalize_list(json!({"count": 2, "results": [1, 2]})).unwrap();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_unknown_shape_is_decode_error() {
        let result = normalize_list::<Value>(json!({"message": "hello"}));
        assert!(matches!(result, Err(ApiError::Decode(_))));
        assert!(!result.unwrap_err().is_retriable());
    }
}
