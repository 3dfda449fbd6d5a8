use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    error::{AppError, Result},
    routes::auth::Claims,
    AppState,
};

#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        id: token_data.claims.sub,
        email: token_data.claims.email,
        name: token_data.claims.name,
    })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;
    let user = decode_token(bearer.token(), &state.config.jwt_secret)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

// Extractor for getting the authenticated user from request extensions
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::create_token;

    #[test]
    fn decodes_tokens_signed_with_the_same_secret() {
        let token = create_token("user-1", "a@example.com", "Ada", "secret").unwrap();
        let user = decode_token(&token, "secret").unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email, "a@example.com");
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let token = create_token("user-1", "a@example.com", "Ada", "secret").unwrap();
        assert!(matches!(
            decode_token(&token, "other"),
            Err(AppError::Unauthorized)
        ));
    }
}
