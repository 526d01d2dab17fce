use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window request counter for one client address. `true` while the
    /// address has made at most `limit` requests in the current window.
    pub async fn allow_request(&self, ip: &str, limit: i64, window_seconds: u64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = rate_limit_key(ip);

        // SET NX starts the window only on the first hit; INCR keeps its TTL.
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("SET").arg(&key).arg(0).arg("EX").arg(window_seconds).arg("NX").ignore()
            .incr(&key, 1)
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

fn rate_limit_key(ip: &str) -> String {
    format!("ratelimit:{}", ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key_is_namespaced() {
        assert_eq!(rate_limit_key("10.0.0.7"), "ratelimit:10.0.0.7");
    }

    #[test]
    fn test_invalid_url_is_rejected_up_front() {
        assert!(RedisClient::new("not a redis url").is_err());
        assert!(RedisClient::new("redis://127.0.0.1:6379/").is_ok());
    }
}
