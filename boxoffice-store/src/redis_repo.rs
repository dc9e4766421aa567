use redis::RedisResult;
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        info!("Redis client configured");
        Ok(Self { client })
    }

    pub fn rate_limit_key(client_ip: &str) -> String {
        format!("ratelimit:{}", client_ip)
    }

    /// Fixed window: the TTL is set only when the key is created, so later
    /// hits never extend it. INCR keeps the existing TTL.
    fn rate_limit_pipeline(key: &str, window_seconds: i64) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("EX")
            .arg(window_seconds)
            .arg("NX")
            .ignore()
            .incr(key, 1);
        pipe
    }

    /// Returns `true` while `key` is within `limit` hits for the window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = Self::rate_limit_pipeline(key, window_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(RedisClient::rate_limit_key("127.0.0.1"), "ratelimit:127.0.0.1");
    }

    #[test]
    fn test_window_is_only_set_on_first_hit() {
        let packed = RedisClient::rate_limit_pipeline("ratelimit:10.0.0.1", 60).get_packed_pipeline();
        let commands = String::from_utf8(packed).unwrap();

        assert!(commands.contains("\r\nMULTI\r\n"));
        assert!(commands.contains("\r\nSET\r\n"));
        assert!(commands.contains("\r\nNX\r\n"));
        assert!(commands.contains("\r\nINCR\r\n"));
        // No command that would push the TTL forward on every hit
        assert!(!commands.contains("EXPIRE"));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        assert!(RedisClient::new("not a url").await.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn test_limit_applies_within_window() {
        let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set");
        let client = RedisClient::new(&url).await.unwrap();
        let key = format!("ratelimit:test-{}", uuid::Uuid::new_v4());

        assert!(client.check_rate_limit(&key, 2, 60).await.unwrap());
        assert!(client.check_rate_limit(&key, 2, 60).await.unwrap());
        assert!(!client.check_rate_limit(&key, 2, 60).await.unwrap());
    }
}
