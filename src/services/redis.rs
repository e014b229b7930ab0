//! Redis service for short-lived activation codes

use async_trait::async_trait;
use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

/// How long an activation code stays recognizable after it expired
const ACTIVATION_RETENTION_SECONDS: u64 = 7 * 24 * 3600;

/// Activation code entry: the user it activates and its expiry (unix seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationEntry {
    pub user_id: i32,
    pub expires_at: i64,
}

impl ActivationEntry {
    fn encode(&self) -> String {
        format!("{}:{}", self.user_id, self.expires_at)
    }

    fn decode(value: &str) -> Option<Self> {
        let (user_id, expires_at) = value.split_once(':')?;
        Some(Self {
            user_id: user_id.parse().ok()?,
            expires_at: expires_at.parse().ok()?,
        })
    }
}

/// Where activation codes live between registration and activation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivationCodeStore: Send + Sync {
    /// Store an activation code unless it is already taken. Returns false on collision.
    async fn store_activation_code(&self, code: &str, entry: ActivationEntry) -> AppResult<bool>;

    /// Look up an activation code without consuming it
    async fn get_activation_code(&self, code: &str) -> AppResult<Option<ActivationEntry>>;

    /// Consume an activation code
    async fn delete_activation_code(&self, code: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service and check the connection
    pub async fn new(url: &str) -> AppResult<Self> {
        let service = Self::open(url)?;
        service.ping().await?;
        Ok(service)
    }

    /// Create the client without connecting
    pub fn open(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;
        Ok(())
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl ActivationCodeStore for RedisService {
    async fn store_activation_code(&self, code: &str, entry: ActivationEntry) -> AppResult<bool> {
        let mut conn = self.connection().await?;

        let key = format!("activation:{}", code);
        let stored: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(entry.encode())
            .arg("EX")
            .arg(ACTIVATION_RETENTION_SECONDS)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to store activation code in Redis: {}", e))
            })?;

        Ok(stored.is_some())
    }

    async fn get_activation_code(&self, code: &str) -> AppResult<Option<ActivationEntry>> {
        let mut conn = self.connection().await?;

        let key = format!("activation:{}", code);
        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to get activation code from Redis: {}", e))
            })?;

        Ok(value.as_deref().and_then(ActivationEntry::decode))
    }

    async fn delete_activation_code(&self, code: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;

        let key = format!("activation:{}", code);
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to delete activation code from Redis: {}", e))
            })?;

        Ok(())
    }
}
