use crate::{
    Error, Result,
    record::{Attributes, WorkerRecord, lookup},
};
use serde_json::Value;

const URL_KEY: &str = "url";
const TOKEN_KEY: &str = "token";

/// Normalized identity of a remote peer: an address plus an optional auth
/// token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionParameters {
    pub address: String,
    pub token: Option<String>,
}

impl ConnectionParameters {
    /// Reads `url` and `token` out of an attribute map, accepting text or
    /// symbol keys.
    pub fn from_attributes(attributes: &Attributes) -> Result<Self> {
        let address = match lookup(attributes, URL_KEY) {
            Some(Value::String(url)) if !url.is_empty() => url.clone(),
            Some(Value::String(_)) => return Err(Error::invalid_arguments("url is empty")),
            Some(other) => {
                return Err(Error::invalid_arguments(format!(
                    "url must be a string, got {other}"
                )));
            }
            None => return Err(Error::invalid_arguments("mapping has no url")),
        };
        let token = token_from(lookup(attributes, TOKEN_KEY))?;

        Ok(Self { address, token })
    }

    pub fn from_record(record: &WorkerRecord) -> Result<Self> {
        Self::from_attributes(record.attributes())
    }
}

/// The accepted shapes of worker connection arguments.
///
/// Both shapes normalize to the same [`ConnectionParameters`] through
/// [`ConnectionArgs::normalize`]. Mapping keys may be text (`"url"`) or
/// symbols (`:url`).
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionArgs {
    Positional {
        address: String,
        token: Option<String>,
    },
    Mapping(Attributes),
}

impl ConnectionArgs {
    pub fn positional(address: impl Into<String>, token: Option<String>) -> Self {
        Self::Positional {
            address: address.into(),
            token,
        }
    }

    /// Interprets an untyped argument list.
    ///
    /// Two values are read as `(address, token)`, a single object as a
    /// mapping. Every other arity or shape is rejected.
    pub fn from_values(values: &[Value]) -> Result<Self> {
        match values {
            [address, token] => {
                let address = address.as_str().ok_or_else(|| {
                    Error::invalid_arguments(format!("address must be a string, got {address}"))
                })?;
                Ok(Self::positional(address, token_from(Some(token))?))
            }
            [Value::Object(map)] => Ok(Self::Mapping(
                map.iter()
                    .map(|(key, value)| (key.as_str().into(), value.clone()))
                    .collect(),
            )),
            [other] => Err(Error::invalid_arguments(format!(
                "expected a mapping with a url, got {other}"
            ))),
            _ => Err(Error::invalid_arguments(format!(
                "expected (url, token) or a single mapping, got {} arguments",
                values.len()
            ))),
        }
    }

    /// Reduces either shape to an `(address, token)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConnectionArguments`] when the address is
    /// missing, empty or not a string, or when the token is neither absent nor
    /// a string.
    pub fn normalize(self) -> Result<ConnectionParameters> {
        match self {
            Self::Positional { address, .. } if address.is_empty() => {
                Err(Error::invalid_arguments("address is empty"))
            }
            Self::Positional { address, token } => Ok(ConnectionParameters { address, token }),
            Self::Mapping(attributes) => ConnectionParameters::from_attributes(&attributes),
        }
    }
}

fn token_from(value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(token)) => Ok(Some(token.clone())),
        Some(other) => Err(Error::invalid_arguments(format!(
            "token must be a string, got {other}"
        ))),
    }
}

impl From<(&str, &str)> for ConnectionArgs {
    fn from((address, token): (&str, &str)) -> Self {
        Self::positional(address, Some(token.to_string()))
    }
}

impl From<(&str, Option<&str>)> for ConnectionArgs {
    fn from((address, token): (&str, Option<&str>)) -> Self {
        Self::positional(address, token.map(str::to_string))
    }
}

impl From<(String, Option<String>)> for ConnectionArgs {
    fn from((address, token): (String, Option<String>)) -> Self {
        Self::positional(address, token)
    }
}

impl From<Attributes> for ConnectionArgs {
    fn from(attributes: Attributes) -> Self {
        Self::Mapping(attributes)
    }
}

impl From<&WorkerRecord> for ConnectionArgs {
    fn from(record: &WorkerRecord) -> Self {
        Self::Mapping(record.attributes().clone())
    }
}

impl From<ConnectionParameters> for ConnectionArgs {
    fn from(params: ConnectionParameters) -> Self {
        Self::positional(params.address, params.token)
    }
}
