use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishRecord {
    pub name: String,
    /// Exactly as the model wrote it, e.g. "28 PLN".
    pub price: String,
}

impl DishRecord {
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
        }
    }
}

pub type DishList = Vec<DishRecord>;

/// Body returned to HTTP and CLI callers.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub dishes: DishList,
}
