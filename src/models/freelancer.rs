use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Freelancer {
    pub id: String,
    pub display_name: String,
}
