//! Redis error mapping to BusError.

use booksync_core::events::BusError;

/// Maps Redis errors to BusError.
///
/// Connection problems become `ConnectionFailed`; anything else is wrapped
/// by `otherwise`.
pub fn map_redis_error(err: redis::RedisError, otherwise: fn(String) -> BusError) -> BusError {
    if err.is_connection_refusal() || err.is_timeout() || err.is_connection_dropped() {
        BusError::ConnectionFailed(err.to_string())
    } else {
        otherwise(err.to_string())
    }
}

/// True when `XGROUP CREATE` failed because the group already exists.
pub fn is_busy_group(err: &redis::RedisError) -> bool {
    err.to_string().contains("BUSYGROUP")
}
