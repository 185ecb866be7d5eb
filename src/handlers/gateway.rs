//! Intermediary routes: `/api/spotify/{auth,token,refresh}`
//!
//! These hold the client credentials on the server side. Each route answers
//! 400 when a required field is missing and 500 when the accounts service
//! call fails, with a JSON `{"error": ..}` body in both cases.

use crate::models::ErrorResponse;
use crate::spotify::types::{AuthUrlRequest, AuthUrlResponse, RefreshRequest, TokenRequest};
use crate::spotify::AccountsClient;
use crate::utils::logging::LoggingHelper;
use actix_web::{web, HttpResponse, Result};
use log::{debug, error};

/// Treat absent and blank fields the same way
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Build the provider authorization URL for a code challenge
///
/// # Errors
/// Never fails; all failures are rendered as JSON error responses
pub async fn request_auth_url(
    body: Option<web::Json<AuthUrlRequest>>,
    accounts: web::Data<AccountsClient>,
) -> Result<HttpResponse> {
    let request = body.map(web::Json::into_inner).unwrap_or_default();
    let Some(code_challenge) = non_empty(request.code_challenge.as_ref()) else {
        LoggingHelper::log_rejected_request("auth", "missing code challenge");
        return Ok(HttpResponse::BadRequest().json(ErrorResponse::new("Code challenge is required")));
    };

    match accounts.build_authorize_url(code_challenge) {
        Ok(url) => {
            LoggingHelper::log_auth_url_built(code_challenge.len());
            Ok(HttpResponse::Ok().json(AuthUrlResponse { url }))
        }
        Err(err) => {
            error!("Invalid authorize URL configuration: {err}");
            Ok(HttpResponse::InternalServerError()
                .json(ErrorResponse::new("Failed to generate auth URL")))
        }
    }
}

/// Exchange an authorization code and verifier for tokens
///
/// # Errors
/// Never fails; all failures are rendered as JSON error responses
pub async fn exchange_token(
    body: Option<web::Json<TokenRequest>>,
    accounts: web::Data<AccountsClient>,
) -> Result<HttpResponse> {
    let request = body.map(web::Json::into_inner).unwrap_or_default();
    let (Some(code), Some(code_verifier)) = (
        non_empty(request.code.as_ref()),
        non_empty(request.code_verifier.as_ref()),
    ) else {
        LoggingHelper::log_rejected_request("token", "missing code or code verifier");
        return Ok(HttpResponse::BadRequest()
            .json(ErrorResponse::new("Code and code verifier are required")));
    };

    match accounts.exchange_code(code, code_verifier).await {
        Ok(tokens) => {
            debug!("Token exchange succeeded");
            Ok(HttpResponse::Ok().json(tokens))
        }
        Err(err) => {
            LoggingHelper::log_upstream_failure("token", &err);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse::new("Token exchange failed")))
        }
    }
}

/// Redeem a refresh token for a new access token
///
/// # Errors
/// Never fails; all failures are rendered as JSON error responses
pub async fn refresh_token(
    body: Option<web::Json<RefreshRequest>>,
    accounts: web::Data<AccountsClient>,
) -> Result<HttpResponse> {
    let request = body.map(web::Json::into_inner).unwrap_or_default();
    let Some(refresh_token) = non_empty(request.refresh_token.as_ref()) else {
        LoggingHelper::log_rejected_request("refresh", "missing refresh token");
        return Ok(HttpResponse::BadRequest().json(ErrorResponse::new("Refresh token is required")));
    };

    match accounts.refresh(refresh_token).await {
        Ok(tokens) => {
            debug!("Token refresh succeeded");
            Ok(HttpResponse::Ok().json(tokens))
        }
        Err(err) => {
            LoggingHelper::log_upstream_failure("refresh", &err);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse::new("Token refresh failed")))
        }
    }
}
