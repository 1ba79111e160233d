//! Relay endpoint handlers

use super::AppState;
use crate::{
    error::{RelayError, Result},
    signature::verify_payment_signature,
    types::{CreateOrderRequest, StoredImageRecord, VerifyPaymentRequest, VerifyPaymentResponse},
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use reqwest::multipart::{Form, Part};
use serde_json::json;
use tracing::{error, info, instrument, warn};

const FILE_REQUIRED: &str = "file required";
const AMOUNT_REQUIRED: &str = "Amount (in paise) is required in request body";
const MISSING_FIELDS: &str = "Missing required fields";
const SIGNATURE_MISMATCH: &str = "Signature mismatch";

/// The `file` part of a multipart upload plus the optional `size` field
struct ImageUpload {
    data: Bytes,
    file_name: String,
    content_type: Option<String>,
    size: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Option<ImageUpload>> {
    let mut file = None;
    let mut size = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::invalid_input(format!("Failed to parse multipart data: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| RelayError::invalid_input(format!("Failed to read file: {}", e)))?;
                file = Some((data, file_name, content_type));
            },
            "size" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| RelayError::invalid_input(format!("Failed to read size: {}", e)))?;
                size = Some(value);
            },
            _ => {},
        }
    }

    Ok(file.map(|(data, file_name, content_type)| ImageUpload {
        data,
        file_name,
        content_type,
        size,
    }))
}

/// `POST /remove-bg`: forward the upload to the removal provider with the server-held key
#[instrument(skip_all)]
pub async fn remove_bg(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let Some(upload) = read_upload(multipart).await? else {
        return Err(RelayError::invalid_input(FILE_REQUIRED));
    };
    let api_key = state
        .config
        .remove_bg_api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(RelayError::MissingCredential("REMOVE_BG_API_KEY"))?;

    let size = upload
        .size
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "auto".to_string());
    info!(
        file = %upload.file_name,
        bytes = upload.data.len(),
        size = %size,
        "Forwarding image to removal provider"
    );

    let mut part = Part::bytes(upload.data.to_vec()).file_name(upload.file_name);
    if let Some(content_type) = &upload.content_type {
        part = part
            .mime_str(content_type)
            .map_err(|e| RelayError::invalid_input(format!("Invalid content type: {}", e)))?;
    }
    let form = Form::new()
        .part(state.config.upstream_file_field.clone(), part)
        .text("size", size);

    let response = state
        .http
        .post(&state.config.upstream_url)
        .header(state.config.upstream_key_header.as_str(), api_key)
        .multipart(form)
        .send()
        .await
        .map_err(|e| RelayError::network_error("remove-bg proxy failed", e))?;

    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .bytes()
        .await
        .map_err(|e| RelayError::network_error("Failed to read provider response", e))?;

    if !status.is_success() {
        error!(
            status = status.as_u16(),
            "Removal provider error: {}",
            String::from_utf8_lossy(&body)
        );
    }

    let content_type = match content_type {
        Some(ct) => ct,
        None if status.is_success() => crate::client::DEFAULT_RESULT_CONTENT_TYPE.to_string(),
        None => "text/plain; charset=utf-8".to_string(),
    };
    let mut response = (status, body).into_response();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}

/// Parse an amount the way a lenient form handler would
///
/// Integers are taken as-is, fractional numbers truncate, and strings
/// contribute their leading integer (`"5000abc"` is 5000). Returns `None`
/// unless the result is a positive integer.
#[must_use]
pub fn parse_amount(value: &serde_json::Value) -> Option<u64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => leading_integer(s),
        _ => None,
    }?;
    u64::try_from(parsed).ok().filter(|&amount| amount > 0)
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// `POST /create-order`: create a payment order and return it verbatim
#[instrument(skip_all)]
pub async fn create_order(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: CreateOrderRequest =
        serde_json::from_slice(&body).unwrap_or(CreateOrderRequest { amount: None });
    let Some(amount) = request.amount.as_ref().and_then(parse_amount) else {
        return Err(RelayError::invalid_input(AMOUNT_REQUIRED));
    };

    let Some(orders) = state.orders.as_ref() else {
        return Err(RelayError::MissingCredential("RAZORPAY_KEY_ID/RAZORPAY_KEY_SECRET"));
    };

    let receipt = format!("rcpt_{}", chrono::Utc::now().timestamp_millis());
    match orders.create_order(amount, &state.config.currency, &receipt).await {
        Ok(order) => {
            info!(amount, receipt = %receipt, "Created payment order");
            Ok(Json(order).into_response())
        },
        Err(e) => {
            error!("create-order error: {}", e);
            let message = match e {
                RelayError::Upstream { message, .. } => message,
                other => other.to_string(),
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response())
        },
    }
}

fn verification(status: StatusCode, verified: bool, error: Option<&str>) -> Response {
    (
        status,
        Json(VerifyPaymentResponse {
            verified,
            error: error.map(str::to_string),
        }),
    )
        .into_response()
}

/// `POST /verify-payment`: recompute the checkout signature with the key secret
#[instrument(skip_all)]
pub async fn verify_payment(State(state): State<AppState>, body: Bytes) -> Response {
    let request: VerifyPaymentRequest = serde_json::from_slice(&body).unwrap_or_default();
    let non_empty = |field: &Option<String>| field.clone().filter(|s| !s.is_empty());
    let (Some(payment_id), Some(order_id), Some(signature)) = (
        non_empty(&request.payment_id),
        non_empty(&request.order_id),
        non_empty(&request.signature),
    ) else {
        return verification(StatusCode::BAD_REQUEST, false, Some(MISSING_FIELDS));
    };

    let Some(secret) = state
        .config
        .razorpay_key_secret
        .as_deref()
        .filter(|s| !s.is_empty())
    else {
        error!("verify-payment called without RAZORPAY_KEY_SECRET");
        return verification(
            StatusCode::INTERNAL_SERVER_ERROR,
            false,
            Some("RAZORPAY_KEY_SECRET is not configured"),
        );
    };

    if verify_payment_signature(secret, &order_id, &payment_id, &signature) {
        info!(order_id = %order_id, payment_id = %payment_id, "Payment verified");
        verification(StatusCode::OK, true, None)
    } else {
        warn!(order_id = %order_id, payment_id = %payment_id, "Payment signature mismatch");
        verification(StatusCode::OK, false, Some(SIGNATURE_MISMATCH))
    }
}

/// `POST /save-image`: persist the raw upload as a write-once record
#[instrument(skip_all)]
pub async fn save_image(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let Some(store) = state.store.as_ref() else {
        return Err(RelayError::storage("Image store is not configured"));
    };
    let Some(upload) = read_upload(multipart).await? else {
        return Err(RelayError::invalid_input(FILE_REQUIRED));
    };

    let id = store.save(StoredImageRecord::now(upload.data)).await?;
    info!(record = %id, "Saved image record");
    Ok(Json(json!({ "message": "Image saved successfully" })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_numbers() {
        assert_eq!(parse_amount(&json!(5000)), Some(5000));
        assert_eq!(parse_amount(&json!(49.9)), Some(49));
        assert_eq!(parse_amount(&json!(0)), None);
        assert_eq!(parse_amount(&json!(-100)), None);
        assert_eq!(parse_amount(&json!(0.5)), None);
    }

    #[test]
    fn test_parse_amount_strings() {
        assert_eq!(parse_amount(&json!("5000")), Some(5000));
        assert_eq!(parse_amount(&json!("  250 paise")), Some(250));
        assert_eq!(parse_amount(&json!("abc")), None);
        assert_eq!(parse_amount(&json!("")), None);
        assert_eq!(parse_amount(&json!("-5")), None);
    }

    #[test]
    fn test_parse_amount_other_types() {
        assert_eq!(parse_amount(&json!(true)), None);
        assert_eq!(parse_amount(&json!(null)), None);
        assert_eq!(parse_amount(&json!([5000])), None);
    }
}
