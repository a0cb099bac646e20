use serde::{Deserialize, Serialize};

/// A stored person; `pk` is assigned by the store on insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub pk: i64,
    pub name: String,
    pub age: u32,
}

/// Payload accepted by create and update
#[derive(Debug, Serialize, Deserialize)]
pub struct PersonRequest {
    pub name: String,
    pub age: u32,
}
