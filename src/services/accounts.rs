use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{consumer, farmer},
    errors::ServiceError,
    events::{Event, EventSender},
    identifiers,
    storage::{discard_uploads, store_upload, ArtifactStore, StoredUpload, UploadedArtifact},
};

const INVALID_FARMER_LOGIN: &str = "Invalid email or password";
const INVALID_CONSUMER_LOGIN: &str = "Invalid name, email, or password";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct FarmerRegistration {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub farm_name: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    #[validate(length(min = 1, max = 32))]
    pub mobile: String,
    #[validate(range(min = 0, max = 100))]
    pub experience: i32,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConsumerRegistration {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 32))]
    pub mobile: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Credentials {
    /// Consumers may also send their name; when present it must match.
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Farmer fields safe to return to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FarmerProfile {
    pub id: Uuid,
    pub name: String,
    pub farm_name: String,
    pub location: String,
    pub experience: i32,
    pub certificate: Option<String>,
    pub qr_code: Option<String>,
}

impl From<farmer::Model> for FarmerProfile {
    fn from(model: farmer::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            farm_name: model.farm_name,
            location: model.location,
            experience: model.experience,
            certificate: model.certificate,
            qr_code: model.qr_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FarmerSession {
    pub farmer_id: Uuid,
    pub farmer_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConsumerProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<consumer::Model> for ConsumerProfile {
    fn from(model: consumer::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
        }
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub(crate) fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("stored credential hash is unreadable: {}", e);
            false
        }
    }
}

/// A racing insert that trips the unique email index still reports Conflict.
fn conflict_on_unique(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict("Email already registered".to_string())
        }
        _ => ServiceError::DatabaseError(err),
    }
}

/// Registration, login and email checks for farmers and consumers.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    store: Arc<dyn ArtifactStore>,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            db,
            event_sender,
            store,
        }
    }

    #[instrument(skip(self, input, certificate, qr_code), fields(email = %input.email))]
    pub async fn register_farmer(
        &self,
        input: FarmerRegistration,
        certificate: Option<UploadedArtifact>,
        qr_code: Option<UploadedArtifact>,
    ) -> Result<FarmerProfile, ServiceError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let existing = farmer::Entity::find()
            .filter(farmer::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let mut stored: Vec<StoredUpload> = Vec::new();
        let mut certificate_ref = None;
        let mut qr_code_ref = None;
        for (upload, slot) in [
            (certificate, &mut certificate_ref),
            (qr_code, &mut qr_code_ref),
        ] {
            let Some(upload) = upload.filter(|u| !u.bytes.is_empty()) else {
                continue;
            };
            match store_upload(self.store.as_ref(), &upload).await {
                Ok(saved) => {
                    *slot = Some(saved.reference.clone());
                    stored.push(saved);
                }
                Err(e) => {
                    discard_uploads(self.store.as_ref(), &stored).await;
                    return Err(e.into());
                }
            }
        }

        let inserted = farmer::ActiveModel {
            id: Set(identifiers::generate()),
            name: Set(input.name.trim().to_string()),
            farm_name: Set(input.farm_name.trim().to_string()),
            location: Set(input.location.trim().to_string()),
            mobile: Set(input.mobile.trim().to_string()),
            experience: Set(input.experience),
            email: Set(email),
            password_hash: Set(password_hash),
            certificate: Set(certificate_ref),
            qr_code: Set(qr_code_ref),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .map_err(conflict_on_unique);
        let model = match inserted {
            Ok(model) => model,
            Err(e) => {
                discard_uploads(self.store.as_ref(), &stored).await;
                return Err(e);
            }
        };

        self.event_sender
            .send_or_log(Event::FarmerRegistered(model.id))
            .await;
        info!("Registered farmer: {}", model.id);
        Ok(model.into())
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login_farmer(&self, credentials: Credentials) -> Result<FarmerSession, ServiceError> {
        let farmer = farmer::Entity::find()
            .filter(farmer::Column::Email.eq(normalize_email(&credentials.email)))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_FARMER_LOGIN.to_string()))?;

        if !verify_password(&credentials.password, &farmer.password_hash) {
            return Err(ServiceError::Unauthorized(INVALID_FARMER_LOGIN.to_string()));
        }

        Ok(FarmerSession {
            farmer_id: farmer.id,
            farmer_name: farmer.name,
        })
    }

    /// The farmer's uploaded contact/payment QR image
    #[instrument(skip(self))]
    pub async fn farmer_qr(&self, farmer_id: Uuid) -> Result<String, ServiceError> {
        farmer::Entity::find_by_id(farmer_id)
            .one(&*self.db)
            .await?
            .and_then(|f| f.qr_code)
            .ok_or_else(|| ServiceError::NotFound(format!("QR for farmer {} not found", farmer_id)))
    }

    #[instrument(skip(self))]
    pub async fn consumer_email_exists(&self, email: &str) -> Result<bool, ServiceError> {
        let found = consumer::Entity::find()
            .filter(consumer::Column::Email.eq(normalize_email(email)))
            .one(&*self.db)
            .await?;
        Ok(found.is_some())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register_consumer(
        &self,
        input: ConsumerRegistration,
    ) -> Result<ConsumerProfile, ServiceError> {
        input.validate()?;
        if self.consumer_email_exists(&input.email).await? {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let model = consumer::ActiveModel {
            id: Set(identifiers::generate()),
            name: Set(input.name.trim().to_string()),
            email: Set(normalize_email(&input.email)),
            mobile: Set(input.mobile.trim().to_string()),
            password_hash: Set(hash_password(&input.password)?),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(conflict_on_unique)?;

        self.event_sender
            .send_or_log(Event::ConsumerRegistered(model.id))
            .await;
        info!("Registered consumer: {}", model.id);
        Ok(model.into())
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login_consumer(
        &self,
        credentials: Credentials,
    ) -> Result<ConsumerProfile, ServiceError> {
        let invalid = || ServiceError::Unauthorized(INVALID_CONSUMER_LOGIN.to_string());

        let consumer = consumer::Entity::find()
            .filter(consumer::Column::Email.eq(normalize_email(&credentials.email)))
            .one(&*self.db)
            .await?
            .ok_or_else(invalid)?;

        if let Some(name) = credentials.name.as_deref().map(str::trim) {
            if !name.is_empty() && !name.eq_ignore_ascii_case(&consumer.name) {
                return Err(invalid());
            }
        }
        if !verify_password(&credentials.password, &consumer.password_hash) {
            return Err(invalid());
        }

        Ok(consumer.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("tomato-42").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("tomato-42", &hash));
        assert!(!verify_password("tomato-43", &hash));
    }

    #[test]
    fn unreadable_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn registration_validation_rejects_bad_email_and_short_password() {
        let input = ConsumerRegistration {
            name: "Ravi".into(),
            email: "ravi-at-example".into(),
            mobile: "9000000000".into(),
            password: "123".into(),
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }
}
