//! Registration, account activation and authentication

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        AuthenticationRequest, AuthenticationResponse, NewUser, RegistrationRequest, User,
        UserClaims, ROLE_USER,
    },
    repository::Repository,
    services::{
        email::ActivationMailer,
        redis::{ActivationCodeStore, ActivationEntry},
    },
};

const ACTIVATION_CODE_LENGTH: usize = 6;
const BAD_CREDENTIALS_MESSAGE: &str = "Login and / or password is incorrect";

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    codes: Arc<dyn ActivationCodeStore>,
    mailer: Arc<dyn ActivationMailer>,
}

impl AuthService {
    pub fn new(
        repository: Repository,
        config: AuthConfig,
        codes: Arc<dyn ActivationCodeStore>,
        mailer: Arc<dyn ActivationMailer>,
    ) -> Self {
        Self { repository, config, codes, mailer }
    }

    /// Create a disabled account and e-mail its activation code.
    ///
    /// Registering again with the e-mail of an account that was never
    /// activated sends a fresh code to that account instead of failing.
    pub async fn register(&self, request: RegistrationRequest) -> AppResult<i32> {
        let request = request.trimmed();
        request.validate()?;

        if let Some(existing) = self.repository.users.find_by_email(&request.email).await? {
            if existing.enabled {
                return Err(AppError::Conflict("Email is already registered".to_string()));
            }
            tracing::info!("Re-sending activation code to pending user id={}", existing.id);
            self.send_activation_code(&existing).await?;
            return Ok(existing.id);
        }

        let new_user = NewUser {
            firstname: request.firstname,
            lastname: request.lastname,
            email: request.email,
            password_hash: hash_password(&request.password)?,
        };
        let user_id = self.repository.users.create(new_user, ROLE_USER).await?;
        tracing::info!("Registered user id={}", user_id);

        let user = self
            .repository
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", user_id)))?;
        self.send_activation_code(&user).await?;

        Ok(user_id)
    }

    /// Enable the account behind an activation code
    pub async fn activate_account(&self, token: &str) -> AppResult<()> {
        let entry = self
            .codes
            .get_activation_code(token)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid token".to_string()))?;

        let user = self
            .repository
            .users
            .find_by_id(entry.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if Utc::now().timestamp() > entry.expires_at {
            self.codes.delete_activation_code(token).await?;
            self.send_activation_code(&user).await?;
            return Err(AppError::BadRequest(
                "Activation token has expired. A new token has been sent to the same email address"
                    .to_string(),
            ));
        }

        self.repository.users.enable(user.id).await?;
        self.codes.delete_activation_code(token).await?;
        tracing::info!("Activated user id={}", user.id);
        Ok(())
    }

    /// Check credentials and issue a JWT
    pub async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> AppResult<AuthenticationResponse> {
        request.validate()?;

        let user = self
            .repository
            .users
            .find_by_email(request.email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication(BAD_CREDENTIALS_MESSAGE.to_string()))?;

        if !verify_password(&user, &request.password)? {
            return Err(AppError::Authentication(BAD_CREDENTIALS_MESSAGE.to_string()));
        }
        if user.account_locked {
            return Err(AppError::AccountLocked);
        }
        if !user.enabled {
            return Err(AppError::AccountDisabled);
        }

        let roles = self.repository.users.find_roles(user.id).await?;
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            full_name: user.full_name(),
            roles,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(AuthenticationResponse {
            token,
            token_type: "Bearer".to_string(),
        })
    }

    async fn send_activation_code(&self, user: &User) -> AppResult<()> {
        let expires_at =
            (Utc::now() + Duration::minutes(self.config.activation_code_ttl_minutes)).timestamp();
        let entry = ActivationEntry { user_id: user.id, expires_at };

        let mut code = generate_activation_code(ACTIVATION_CODE_LENGTH);
        let mut attempts = 1;
        while !self.codes.store_activation_code(&code, entry).await? {
            if attempts >= 5 {
                return Err(AppError::Internal("Could not allocate an activation code".to_string()));
            }
            attempts += 1;
            code = generate_activation_code(ACTIVATION_CODE_LENGTH);
        }

        self.mailer
            .send_activation_code(&user.email, &user.full_name(), &code)
            .await
    }
}

fn generate_activation_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repository::{
            books::MockBookRepository, feedbacks::MockFeedbackRepository,
            histories::MockTransactionHistoryRepository, users::MockUserRepository,
        },
        services::{email::MockActivationMailer, redis::MockActivationCodeStore},
    };
    use mockall::predicate::eq;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    fn user(enabled: bool, locked: bool) -> User {
        User {
            id: 3,
            firstname: "Ada".to_string(),
            lastname: "Reader".to_string(),
            date_of_birth: None,
            email: "ada@mail.com".to_string(),
            password: hash_password("correct-horse").unwrap(),
            account_locked: locked,
            enabled,
            created_date: Utc::now(),
            last_modified_date: None,
        }
    }

    fn service_with(
        users: MockUserRepository,
        codes: MockActivationCodeStore,
        mailer: MockActivationMailer,
    ) -> AuthService {
        let repository = Repository {
            books: Arc::new(MockBookRepository::new()),
            histories: Arc::new(MockTransactionHistoryRepository::new()),
            feedbacks: Arc::new(MockFeedbackRepository::new()),
            users: Arc::new(users),
        };
        AuthService::new(repository, AuthConfig::default(), Arc::new(codes), Arc::new(mailer))
    }

    fn service(users: MockUserRepository) -> AuthService {
        service_with(users, MockActivationCodeStore::new(), MockActivationMailer::new())
    }

    fn login(password: &str) -> AuthenticationRequest {
        AuthenticationRequest {
            email: "ada@mail.com".to_string(),
            password: password.to_string(),
        }
    }

    fn registration() -> RegistrationRequest {
        RegistrationRequest {
            firstname: "Ada".to_string(),
            lastname: "Reader".to_string(),
            email: "ada@mail.com".to_string(),
            password: "correct-horse".to_string(),
        }
    }

    #[tokio::test]
    async fn test_authenticate_issues_token_with_roles() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(true, false))));
        users
            .expect_find_roles()
            .returning(|_| Ok(vec![ROLE_USER.to_string()]));

        let response = service(users).authenticate(login("correct-horse")).await.unwrap();

        let claims =
            UserClaims::from_token(&response.token, &AuthConfig::default().jwt_secret).unwrap();
        assert_eq!(claims.user_id, 3);
        assert_eq!(claims.full_name, "Ada Reader");
        assert_eq!(claims.roles, vec![ROLE_USER.to_string()]);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_wrong_password() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(true, false))));

        let err = service(users).authenticate(login("wrong-horse")).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(ref m) if m == BAD_CREDENTIALS_MESSAGE));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_disabled_and_locked_accounts() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(false, false))));
        let err = service(users).authenticate(login("correct-horse")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountDisabled));

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(true, true))));
        let err = service(users).authenticate(login("correct-horse")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountLocked));
    }

    #[tokio::test]
    async fn test_register_rejects_email_of_active_account() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(true, false))));
        users.expect_create().never();
        let mut mailer = MockActivationMailer::new();
        mailer.expect_send_activation_code().never();

        let err = service_with(users, MockActivationCodeStore::new(), mailer)
            .register(registration())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_validates_before_touching_store() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().never();

        let err = service(users)
            .register(RegistrationRequest {
                firstname: "Ada".to_string(),
                lastname: "".to_string(),
                email: "not-an-email".to_string(),
                password: "short".to_string(),
            })
            .await
            .unwrap_err();
        match err {
            AppError::Validation(messages) => assert_eq!(messages.len(), 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// A failed activation mail must not lock the address out of registering
    #[tokio::test]
    async fn test_register_again_after_failed_mail_resends_code() {
        let stored: Arc<Mutex<Option<User>>> = Arc::new(Mutex::new(None));
        let mut users = MockUserRepository::new();

        let s = stored.clone();
        users.expect_find_by_email().returning(move |_| Ok(s.lock().unwrap().clone()));
        let s = stored.clone();
        users.expect_create().times(1).returning(move |new_user, role| {
            assert_eq!(role, ROLE_USER);
            let mut row = user(false, false);
            row.password = new_user.password_hash;
            *s.lock().unwrap() = Some(row);
            Ok(3)
        });
        let s = stored.clone();
        users.expect_find_by_id().returning(move |_| Ok(s.lock().unwrap().clone()));

        let mut codes = MockActivationCodeStore::new();
        codes.expect_store_activation_code().times(2).returning(|_, _| Ok(true));

        let attempts = Arc::new(AtomicUsize::new(0));
        let mut mailer = MockActivationMailer::new();
        let a = attempts.clone();
        mailer
            .expect_send_activation_code()
            .withf(|to, name, code| to == "ada@mail.com" && name == "Ada Reader" && code.len() == 6)
            .returning(move |_, _, _| {
                if a.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AppError::Internal("SMTP unreachable".to_string()))
                } else {
                    Ok(())
                }
            });

        let auth = service_with(users, codes, mailer);
        let err = auth.register(registration()).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        assert_eq!(auth.register(registration()).await.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_activate_unknown_token() {
        let mut codes = MockActivationCodeStore::new();
        codes.expect_get_activation_code().returning(|_| Ok(None));
        let mut users = MockUserRepository::new();
        users.expect_enable().never();

        let err = service_with(users, codes, MockActivationMailer::new())
            .activate_account("123456")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid token"));
    }

    #[tokio::test]
    async fn test_activate_valid_token_enables_and_consumes() {
        let expires_at = Utc::now().timestamp() + 600;
        let mut codes = MockActivationCodeStore::new();
        codes
            .expect_get_activation_code()
            .returning(move |_| Ok(Some(ActivationEntry { user_id: 3, expires_at })));
        codes
            .expect_delete_activation_code()
            .withf(|code| code == "123456")
            .times(1)
            .returning(|_| Ok(()));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(Some(user(false, false))));
        users.expect_enable().with(eq(3)).times(1).returning(|_| Ok(()));

        service_with(users, codes, MockActivationMailer::new())
            .activate_account("123456")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_activate_expired_token_sends_new_code() {
        let expires_at = Utc::now().timestamp() - 60;
        let mut codes = MockActivationCodeStore::new();
        codes
            .expect_get_activation_code()
            .returning(move |_| Ok(Some(ActivationEntry { user_id: 3, expires_at })));
        codes.expect_delete_activation_code().times(1).returning(|_| Ok(()));
        codes
            .expect_store_activation_code()
            .withf(|_, entry| entry.user_id == 3 && entry.expires_at > Utc::now().timestamp())
            .times(1)
            .returning(|_, _| Ok(true));
        let mut mailer = MockActivationMailer::new();
        mailer.expect_send_activation_code().times(1).returning(|_, _, _| Ok(()));
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(Some(user(false, false))));
        users.expect_enable().never();

        let err = service_with(users, codes, mailer)
            .activate_account("123456")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::BadRequest(ref m) if m.starts_with("Activation token has expired")
        ));
    }

    #[test]
    fn test_activation_code_is_numeric() {
        let code = generate_activation_code(ACTIVATION_CODE_LENGTH);
        assert_eq!(code.len(), ACTIVATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
