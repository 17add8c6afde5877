/***************************************/
/*        3rd party libraries          */
/***************************************/
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Used for `ElevatorState::timestamp`
/// and for timing the door-wait threshold and keep-alive interval.
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis()
}
