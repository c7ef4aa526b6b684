//! Serde adapters writing binary payloads as base64 strings.

/// `#[serde(with = "crate::io::base64_bytes")]` for byte buffers.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(data))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<Vec<u8>>,
    {
        let text = String::deserialize(deserializer)?;
        BASE64
            .decode(text.as_bytes())
            .map(T::from)
            .map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "crate::io::base64_opt")]` for optional byte buffers.
pub mod base64_opt {
    use std::sync::Arc;

    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &Option<Arc<Vec<u8>>>, serializer: S) -> Result<S::Ok, S::Error> {
        data.as_ref()
            .map(|d| BASE64.encode(d.as_slice()))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Arc<Vec<u8>>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => BASE64
                .decode(text.as_bytes())
                .map(|d| Some(Arc::new(d)))
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
