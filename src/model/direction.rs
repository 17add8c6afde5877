/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::{Deserialize, Serialize};

/***************************************/
/*       Public data structures        */
/***************************************/

/// Direction of travel. `None` means "not currently moving and no
/// last-known direction in this cycle", it is not a placeholder for an
/// error, it is a legitimate steady state.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    None,
}
