//! Module identity types for modgraph

use std::borrow::Borrow;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject, StringValidation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Prefix reserved for facades synthesized at resolution time
pub const SYNTHETIC_PREFIX: char = '@';

/// Characters that delimit members inside a synthetic facade name
const FACADE_DELIMITERS: [char; 3] = ['(', ')', ','];

/// Reasons a string is not a valid module name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty
    Empty,
    /// The name contains whitespace, a control character or a facade delimiter
    InvalidCharacter { name: String, character: char },
    /// The name starts with the reserved synthetic prefix
    Reserved(String),
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "module name must not be empty"),
            NameError::InvalidCharacter { name, character } => {
                write!(f, "module name '{}' contains invalid character {:?}", name, character)
            }
            NameError::Reserved(name) => {
                write!(f, "module name '{}' uses the reserved prefix '{}'", name, SYNTHETIC_PREFIX)
            }
        }
    }
}

impl Error for NameError {}

/// Unique identifier of a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Validates and wraps a module name
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if let Some(character) = name
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || FACADE_DELIMITERS.contains(c))
        {
            return Err(NameError::InvalidCharacter { name, character });
        }
        if name.starts_with(SYNTHETIC_PREFIX) {
            return Err(NameError::Reserved(name));
        }
        Ok(Self(name))
    }

    /// Builds a name from a string literal.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid module name. Meant for compile-time
    /// identifiers, see [`ModuleKey`].
    pub fn from_static(name: &'static str) -> Self {
        match Self::new(name) {
            Ok(name) => name,
            Err(err) => panic!("invalid static module name: {}", err),
        }
    }

    /// Name of the synthetic facade aggregating `members`.
    ///
    /// Member names cannot contain the delimiters, so distinct member lists
    /// always map to distinct facade names.
    pub fn facade_of(members: &[ModuleName]) -> Self {
        let joined = members.iter().map(ModuleName::as_str).collect::<Vec<_>>().join(",");
        Self(format!("{}facade({})", SYNTHETIC_PREFIX, joined))
    }

    /// Whether this name was synthesized by [`ModuleName::facade_of`]
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for ModuleName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ModuleName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ModuleName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModuleName> for String {
    fn from(name: ModuleName) -> Self {
        name.0
    }
}

impl PartialEq<str> for ModuleName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModuleName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl JsonSchema for ModuleName {
    fn schema_name() -> String {
        "ModuleName".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        Schema::Object(SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            string: Some(Box::new(StringValidation {
                min_length: Some(1),
                pattern: Some(r"^[^@\s(),][^\s(),]*$".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        })
    }
}

/// Identity and human-readable description of a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModuleInfo {
    /// Unique identifier of the module
    pub name: ModuleName,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ModuleInfo {
    pub fn new(name: ModuleName) -> Self {
        Self { name, description: None }
    }

    /// Add a description to the module
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Compile-time module identifier.
///
/// Implemented by enums that name a fixed set of modules so call sites refer
/// to variants instead of string literals.
pub trait ModuleKey: Copy + 'static {
    /// Every key of this type, in declaration order
    fn all() -> &'static [Self];

    /// The registered name of this module
    fn as_str(self) -> &'static str;

    fn module_name(self) -> ModuleName {
        ModuleName::from_static(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Fixture {
        Alpha,
        Beta,
    }

    impl ModuleKey for Fixture {
        fn all() -> &'static [Self] {
            &[Fixture::Alpha, Fixture::Beta]
        }

        fn as_str(self) -> &'static str {
            match self {
                Fixture::Alpha => "fixture.alpha",
                Fixture::Beta => "fixture.beta",
            }
        }
    }

    #[test]
    fn test_valid_names() {
        let name = ModuleName::new("services.translate").unwrap();
        assert_eq!(name.as_str(), "services.translate");
        assert_eq!(name.to_string(), "services.translate");
        assert!(!name.is_synthetic());
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(ModuleName::new(""), Err(NameError::Empty));
        assert!(matches!(
            ModuleName::new("has space"),
            Err(NameError::InvalidCharacter { character: ' ', .. })
        ));
        assert!(matches!(ModuleName::new("@facade"), Err(NameError::Reserved(_))));
    }

    #[test]
    fn test_facade_delimiters_are_rejected() {
        for (name, delimiter) in [("a,b", ','), ("f(x", '('), ("x)", ')')] {
            assert_eq!(
                ModuleName::new(name),
                Err(NameError::InvalidCharacter { name: name.to_string(), character: delimiter })
            );
        }
        assert!(serde_json::from_str::<ModuleName>("\"a,b\"").is_err());
    }

    #[test]
    fn test_facade_name() {
        let members = vec![ModuleName::from_static("a"), ModuleName::from_static("b")];
        let facade = ModuleName::facade_of(&members);
        assert_eq!(facade.as_str(), "@facade(a,b)");
        assert!(facade.is_synthetic());
    }

    #[test]
    fn test_serde_rejects_invalid_name() {
        let name: ModuleName = serde_json::from_str("\"storage\"").unwrap();
        assert_eq!(name, "storage");
        assert!(serde_json::from_str::<ModuleName>("\"\"").is_err());
    }

    #[test]
    fn test_module_info() {
        let info = ModuleInfo::new(ModuleName::from_static("superdesk.services"))
            .with_description("Aggregates the service modules");

        assert_eq!(info.name, "superdesk.services");
        assert_eq!(info.description, Some("Aggregates the service modules".to_string()));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "superdesk.services",
                "description": "Aggregates the service modules"
            })
        );
        let bare = serde_json::to_value(ModuleInfo::new(ModuleName::from_static("entity"))).unwrap();
        assert_eq!(bare, serde_json::json!({ "name": "entity" }));
    }

    #[test]
    fn test_module_key() {
        let names: Vec<ModuleName> = Fixture::all().iter().map(|k| k.module_name()).collect();
        assert_eq!(names, vec![ModuleName::from_static("fixture.alpha"), ModuleName::from_static("fixture.beta")]);
    }

    #[test]
    #[should_panic(expected = "invalid static module name")]
    fn test_from_static_panics_on_invalid_name() {
        ModuleName::from_static("not valid");
    }
}
