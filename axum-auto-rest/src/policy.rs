//! Per-category exposure policy
//!
//! A [`CategoryPolicy`] decides which objects of one category become routes,
//! what their public path segment is, and how their parameters are renamed.
//! The serde shape of these types is the `build.<category>` block of the
//! configuration file and must not change.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default admission for objects of a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeMode {
    /// Expose everything except the listed objects
    All,
    /// Expose nothing except the listed objects
    None,
}

/// Per-object override of path and parameter names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectOverride {
    /// Replaces the object name in the path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Suppresses the category prefix for this object only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_prefix: Option<bool>,

    /// Source parameter name -> exposed parameter name (procedures and functions only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_params: Option<HashMap<String, String>>,
}

/// Exposure policy for one category of database objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    /// Prepended to every path of the category unless an object opts out
    #[serde(default)]
    pub prefix: Option<String>,

    /// Default admission
    pub include: IncludeMode,

    /// Objects whose admission is the inverse of `include` (entries set to `true`)
    #[serde(default)]
    pub except: HashMap<String, bool>,

    /// Per-object overrides keyed by object name
    #[serde(default)]
    pub config: HashMap<String, ObjectOverride>,
}

/// How one declared parameter is exposed to HTTP callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterBinding {
    /// Name declared by the routine
    pub source: String,

    /// Name callers must use in the request body
    pub exposed: String,
}

impl ParameterBinding {
    /// Whether the exposed name differs from the declared one
    pub fn is_aliased(&self) -> bool {
        self.source != self.exposed
    }
}

/// Characters `urlencoding` escapes that stay literal in published route paths
const LITERAL_SUB_DELIMS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode a path segment, keeping `! ' ( ) *` literal
fn encode_segment(segment: &str) -> String {
    LITERAL_SUB_DELIMS
        .iter()
        .fold(urlencoding::encode(segment).into_owned(), |encoded, (escape, literal)| {
            encoded.replace(escape, literal)
        })
}

impl CategoryPolicy {
    /// Policy exposing every object of the category without prefix or overrides
    pub fn include_all() -> Self {
        Self {
            prefix: None,
            include: IncludeMode::All,
            except: HashMap::new(),
            config: HashMap::new(),
        }
    }

    /// Policy exposing nothing
    pub fn include_none() -> Self {
        Self {
            include: IncludeMode::None,
            ..Self::include_all()
        }
    }

    fn is_exception(&self, name: &str) -> bool {
        self.except.get(name).copied().unwrap_or(false)
    }

    fn override_for(&self, name: &str) -> Option<&ObjectOverride> {
        self.config.get(name)
    }

    /// Admission rule: exact name match only, no wildcards
    pub fn should_expose(&self, name: &str) -> bool {
        match self.include {
            IncludeMode::All => !self.is_exception(name),
            IncludeMode::None => self.is_exception(name),
        }
    }

    /// Public path segment of an object: prefix, then alias or name, percent-encoded as one segment
    pub fn compute_path(&self, name: &str) -> String {
        let object_override = self.override_for(name);
        let mut path = String::new();

        let ignore_prefix = object_override
            .and_then(|object_override| object_override.ignore_prefix)
            .unwrap_or(false);

        if let Some(prefix) = self.prefix.as_deref().filter(|prefix| !prefix.is_empty()) {
            if !ignore_prefix {
                path.push_str(prefix.trim());
            }
        }

        match object_override
            .and_then(|object_override| object_override.alias.as_deref())
            .filter(|alias| !alias.is_empty())
        {
            Some(alias) => path.push_str(alias),
            None => path.push_str(name),
        }

        encode_segment(&path)
    }

    /// Exposed name of every declared parameter, in declaration order
    pub fn compute_parameter_binding(
        &self,
        name: &str,
        parameters: &[String],
    ) -> Vec<ParameterBinding> {
        let aliases = self
            .override_for(name)
            .and_then(|object_override| object_override.alias_params.as_ref());

        parameters
            .iter()
            .map(|source| {
                let exposed = aliases
                    .and_then(|aliases| aliases.get(source))
                    .filter(|alias| !alias.is_empty())
                    .unwrap_or(source);

                ParameterBinding {
                    source: source.clone(),
                    exposed: exposed.clone(),
                }
            })
            .collect()
    }
}
