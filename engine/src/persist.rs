//! RON documents on disk.

use {
    crate::error::Error,
    serde::{de::DeserializeOwned, Serialize},
    std::path::Path,
};

pub fn to_ron<T>(value: &T) -> Result<String, Error>
where
    T: Serialize + ?Sized,
{
    let pretty = ron::ser::PrettyConfig::new();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron<T>(text: &str) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    Ok(ron::de::from_str(text)?)
}

#[tracing::instrument(skip(value))]
pub fn save<T>(path: &Path, value: &T) -> Result<(), Error>
where
    T: Serialize + ?Sized,
{
    let text = to_ron(value)?;
    std::fs::write(path, text).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })
}

#[tracing::instrument]
pub fn load<T>(path: &Path) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    from_ron(&text)
}
