use crate::model::UserContext;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Claims shape emitted by the identity provider. Decoded and validated by
/// `JwtAuthenticator`, then converted into the `UserContext` every read and
/// write path actually operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub dept_ids: Vec<String>,
    #[serde(default)]
    pub project_ids: Vec<String>,
    #[serde(default)]
    pub client_ids: Vec<String>,
    #[serde(default)]
    pub active_project_id: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub nbf: Option<usize>,
    #[serde(default)]
    pub iat: Option<usize>,
}

impl TryFrom<JwtClaims> for UserContext {
    type Error = AuthError;

    fn try_from(claims: JwtClaims) -> Result<Self, Self::Error> {
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingSubject);
        }

        let roles = claims
            .roles
            .into_iter()
            .filter_map(|role| {
                let trimmed = role.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect();

        Ok(UserContext {
            user_id: claims.sub,
            roles,
            dept_ids: claims.dept_ids.into_iter().collect(),
            project_ids: claims.project_ids.into_iter().collect(),
            client_ids: claims.client_ids.into_iter().collect(),
            active_project_id: claims.active_project_id,
        })
    }
}

pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new_hs256(
        secret: impl AsRef<[u8]>,
        issuer: Option<&str>,
        audience: Option<&str>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = audience {
            validation.set_audience(&[audience]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    pub fn authenticate(&self, token: &str) -> Result<UserContext, AuthError> {
        let normalized = token
            .trim()
            .strip_prefix("Bearer ")
            .or_else(|| token.trim().strip_prefix("bearer "))
            .unwrap_or(token)
            .trim();
        if normalized.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let token_data = decode::<JwtClaims>(normalized, &self.decoding_key, &self.validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
        UserContext::try_from(token_data.claims)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid jwt: {0}")]
    InvalidToken(String),
    #[error("jwt claim sub must not be empty")]
    MissingSubject,
}

impl crate::error::EngineError for AuthError {
    fn error_code(&self) -> crate::error::ErrorCode {
        crate::error::ErrorCode::AccessDenied
    }
}

/// Role-change event consumed by the Relocation Manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub user_id: String,
    #[serde(default)]
    pub added_roles: Vec<String>,
    #[serde(default)]
    pub removed_roles: Vec<String>,
    #[serde(default)]
    pub new_dept_ids: Vec<String>,
    #[serde(default)]
    pub old_dept_ids: Vec<String>,
    #[serde(default)]
    pub new_project_ids: Vec<String>,
    #[serde(default)]
    pub old_project_ids: Vec<String>,
}

/// Source-registry event consumed by the Relocation Manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUpdated {
    pub source_urn: String,
}

/// Unused placeholder kept out of the archived map types so attribute-style
/// extensions (clearance levels, department metadata) can be layered onto
/// `UserContext` without another breaking change to the core model.
pub type Attributes = HashMap<String, String>;
