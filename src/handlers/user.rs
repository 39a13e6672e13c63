use actix_web::{get, patch, post, put, web, HttpResponse};

use crate::auth::{AuthUser, Hasher};
use crate::db;
use crate::error::ApiError;
use crate::models::{
    CreateUserRequest, TokenRequest, TokenResponse, UpdateUserRequest, UserChanges, UserResponse,
};
use crate::query;
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 5;
const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Trims the address and lowercases its domain part.
pub fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(format!("{}@{}", local, domain.to_lowercase()))
        }
        _ => Err(ApiError::bad_request("Enter a valid email address.")),
    }
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

async fn hash_password(hasher: &Hasher, password: String) -> Result<String, ApiError> {
    let hasher = hasher.clone();
    web::block(move || hasher.hash(&password)).await?
}

#[post("/api/user/create/")]
pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    let email = normalize_email(&req.email)?;
    check_password(&req.password)?;
    let name = req.name.trim().to_string();

    let password_hash = hash_password(&state.hasher, req.password).await?;
    let user = db::run(&state, move |conn| {
        if query::find_user_by_email(&email, conn)?.is_some() {
            return Err(ApiError::bad_request("A user with this email already exists."));
        }
        query::create_user(&email, &name, &password_hash, conn)
    })
    .await?;

    log::info!("registered user {}", user.id);
    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

#[post("/api/user/token/")]
pub async fn create_token(
    state: web::Data<AppState>,
    body: web::Json<TokenRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    }
    let email = normalize_email(&req.email).map_err(|_| ApiError::bad_request(BAD_CREDENTIALS))?;

    let user = db::run(&state, move |conn| query::find_user_by_email(&email, conn))
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::bad_request(BAD_CREDENTIALS))?;

    let hasher = state.hasher.clone();
    let stored = user.password_hash.clone();
    let verified = web::block(move || hasher.verify(&req.password, &stored)).await?;
    if !verified {
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    }

    let token = db::run(&state, move |conn| query::issue_token(&user, conn)).await?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

#[get("/api/user/me/")]
pub async fn me(user: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(&user.0))
}

#[put("/api/user/me/")]
pub async fn replace_me(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();
    for (field, present) in [
        ("email", req.email.is_some()),
        ("password", req.password.is_some()),
        ("name", req.name.is_some()),
    ] {
        if !present {
            return Err(ApiError::bad_request(format!("Field '{}' is required.", field)));
        }
    }
    update_me(&state, user, req).await
}

#[patch("/api/user/me/")]
pub async fn patch_me(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    update_me(&state, user, body.into_inner()).await
}

async fn update_me(
    state: &AppState,
    user: AuthUser,
    req: UpdateUserRequest,
) -> Result<HttpResponse, ApiError> {
    let email = req.email.as_deref().map(normalize_email).transpose()?;
    let password_hash = match req.password {
        Some(password) => {
            check_password(&password)?;
            Some(hash_password(&state.hasher, password).await?)
        }
        None => None,
    };
    let changes = UserChanges {
        email,
        name: req.name.map(|name| name.trim().to_string()),
        password_hash,
    };

    let user_id = user.id();
    let updated = db::run(state, move |conn| {
        if let Some(email) = &changes.email {
            if let Some(other) = query::find_user_by_email(email, conn)? {
                if other.id != user_id {
                    return Err(ApiError::bad_request("A user with this email already exists."));
                }
            }
        }
        query::update_user(user_id, &changes, conn)
    })
    .await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&updated)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_domain_is_lowercased() {
        assert_eq!(
            normalize_email("  Test@EXAMPLE.com ").unwrap(),
            "Test@example.com"
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "plain", "@example.com", "user@"] {
            assert!(normalize_email(bad).is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_password("pw").is_err());
        assert!(check_password("12345").is_ok());
    }
}
