use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub(super) struct RemovePeerResult {
    pub removed: String,
}
