use serde::{Deserialize, Deserializer, Serialize};

/// Uniform `{ data, message, success }` wrapper around API responses.
///
/// The backend spells the flag `sucess` in some handlers. Either spelling
/// decodes into `success`; when both are present the correct one wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub message: String,
    pub success: bool,
}

#[derive(Deserialize)]
struct RawEnvelope<T> {
    data: T,
    #[serde(default)]
    message: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    sucess: Option<bool>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::<T>::deserialize(deserializer)?;
        Ok(Self {
            data: raw.data,
            message: raw.message,
            success: raw.success.or(raw.sucess).unwrap_or(true),
        })
    }
}
