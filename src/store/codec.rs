//! Record codec (bincode)

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Encode a record for storage
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(record)?)
}

/// Decode a stored record
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}
