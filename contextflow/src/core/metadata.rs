//! Transport-independent description of the operation in flight.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP-style method of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Returns the canonical uppercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    /// Returns true for methods that must not change server state.
    #[must_use]
    pub const fn is_safe(&self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Options)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(format!("unknown HTTP method: {other}")),
        }
    }
}

/// Where a declared parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    /// A path segment.
    Path,
    /// The query string.
    Query,
    /// A request header.
    Header,
    /// The request body.
    Body,
}

/// A declared parameter of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Declared type name, as reported by the routing layer.
    pub type_name: String,
    /// Where the value comes from.
    pub source: ParamSource,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
}

impl ParamSpec {
    /// Creates a required parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            source,
            required: true,
        }
    }

    /// Marks the parameter optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Immutable facts about the operation being invoked.
///
/// Produced by the routing layer and shared by reference with every filter of
/// one invocation. It never carries transport objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMeta {
    /// Operation name, e.g. `users.get`.
    pub operation: String,
    /// HTTP-style method.
    pub method: HttpMethod,
    /// Route path template, e.g. `/users/{id}`.
    pub path: String,
    /// Declared parameters in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
}

impl MethodMeta {
    /// Creates metadata with no declared parameters.
    #[must_use]
    pub fn new(operation: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            method,
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Adds a declared parameter.
    #[must_use]
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Returns the declared parameter named `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Returns the parameters read from `source`.
    pub fn params_from(&self, source: ParamSource) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(move |p| p.source == source)
    }
}

impl fmt::Display for MethodMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.method, self.path, self.operation)
    }
}
