use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Standard list envelope: `{"data": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataResponse<T> {
    pub data: T,
}
