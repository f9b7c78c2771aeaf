use std::error::Error;
use std::fmt;

use modgraph_core::{ModuleName, NameError};

/// Boxed error returned by module initializers
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Errors raised while registering declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A different declaration already exists under this name (strict mode)
    DuplicateModule(ModuleName),
    /// The module was already resolved and its dependency list is frozen
    FrozenModule(ModuleName),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateModule(name) => {
                write!(f, "Module '{}' is already registered", name)
            }
            RegistryError::FrozenModule(name) => {
                write!(f, "Module '{}' has been resolved and can no longer be redeclared", name)
            }
        }
    }
}

impl Error for RegistryError {}

/// Errors raised by a resolution pass
#[derive(Debug)]
pub enum ComposerError {
    /// The module (or one of its dependencies) was never registered
    UnknownModule { name: ModuleName, required_by: Option<ModuleName> },
    /// The dependency graph contains a cycle; the chain ends at the repeated module
    CyclicDependency(Vec<ModuleName>),
    /// A module's initializer failed
    InitializationFailed { name: ModuleName, cause: BoxError },
    /// Registration through the composer failed
    Registry(RegistryError),
}

impl ComposerError {
    /// The module the error is about
    pub fn module(&self) -> Option<&ModuleName> {
        match self {
            ComposerError::UnknownModule { name, .. } => Some(name),
            ComposerError::CyclicDependency(path) => path.first(),
            ComposerError::InitializationFailed { name, .. } => Some(name),
            ComposerError::Registry(RegistryError::DuplicateModule(name))
            | ComposerError::Registry(RegistryError::FrozenModule(name)) => Some(name),
        }
    }
}

impl fmt::Display for ComposerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposerError::UnknownModule { name, required_by: None } => {
                write!(f, "Unknown module '{}'", name)
            }
            ComposerError::UnknownModule { name, required_by: Some(parent) } => {
                write!(f, "Unknown module '{}' (required by '{}')", name, parent)
            }
            ComposerError::CyclicDependency(path) => {
                let chain = path.iter().map(ModuleName::as_str).collect::<Vec<_>>();
                write!(f, "Circular dependency detected: {}", chain.join(" -> "))
            }
            ComposerError::InitializationFailed { name, cause } => {
                write!(f, "Initialization of module '{}' failed: {}", name, cause)
            }
            ComposerError::Registry(err) => write!(f, "{}", err),
        }
    }
}

impl Error for ComposerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ComposerError::InitializationFailed { cause, .. } => Some(&**cause),
            ComposerError::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for ComposerError {
    fn from(err: RegistryError) -> Self {
        ComposerError::Registry(err)
    }
}

#[derive(Debug)]
pub enum ModGraphError {
    /// Error during registration
    Registry(RegistryError),
    /// Error during resolution
    Composer(ComposerError),
    /// Invalid module name
    Name(NameError),
    /// Error during Git operations
    Git(String),
    /// Error during file system operations
    Io(std::io::Error),
    /// Error during configuration parsing
    Config(String),
    /// Error reading or writing a manifest
    Manifest(String),
    /// Manifest failed schema validation
    Validation(String),
    /// Manifest schema version is incompatible
    IncompatibleVersion(String),
    /// A root module could not be brought up
    Bootstrap(String),
    /// A discovery source failed
    Discovery(String),
}

impl fmt::Display for ModGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModGraphError::Registry(err) => write!(f, "Registry error: {}", err),
            ModGraphError::Composer(err) => write!(f, "Resolution error: {}", err),
            ModGraphError::Name(err) => write!(f, "Name error: {}", err),
            ModGraphError::Git(msg) => write!(f, "Git error: {}", msg),
            ModGraphError::Io(err) => write!(f, "IO error: {}", err),
            ModGraphError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ModGraphError::Manifest(msg) => write!(f, "Manifest error: {}", msg),
            ModGraphError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ModGraphError::IncompatibleVersion(msg) => write!(f, "Incompatible version: {}", msg),
            ModGraphError::Bootstrap(msg) => write!(f, "Bootstrap error: {}", msg),
            ModGraphError::Discovery(msg) => write!(f, "Discovery error: {}", msg),
        }
    }
}

impl Error for ModGraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ModGraphError::Registry(err) => Some(err),
            ModGraphError::Composer(err) => Some(err),
            ModGraphError::Name(err) => Some(err),
            ModGraphError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for ModGraphError {
    fn from(err: RegistryError) -> Self {
        ModGraphError::Registry(err)
    }
}

impl From<ComposerError> for ModGraphError {
    fn from(err: ComposerError) -> Self {
        ModGraphError::Composer(err)
    }
}

impl From<NameError> for ModGraphError {
    fn from(err: NameError) -> Self {
        ModGraphError::Name(err)
    }
}

impl From<std::io::Error> for ModGraphError {
    fn from(err: std::io::Error) -> Self {
        ModGraphError::Io(err)
    }
}

impl From<git2::Error> for ModGraphError {
    fn from(err: git2::Error) -> Self {
        ModGraphError::Git(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ModGraphError>;
