//! Error types for the dependency injection container.

use std::fmt;

/// Dependency injection errors
///
/// Represents the various error conditions that can occur during service
/// registration, resolution, or container operations in ferrous-di.
///
/// # Examples
///
/// ```rust
/// use ferrous_di::{DiError, ServiceCollection, Resolver};
///
/// // Example of NotFound error
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///         println!("Service not found: {}", type_name);
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_di::DiError;
///
/// // Examples of error types
/// let not_found = DiError::NotFound("MyService");
/// let type_mismatch = DiError::TypeMismatch("std::string::String");
/// let circular = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
/// let wrong_lifetime = DiError::WrongLifetime("Cannot resolve scoped from singleton");
/// let depth_exceeded = DiError::DepthExceeded(100);
///
/// // All errors implement Display
/// println!("Error: {}", not_found);
/// println!("Error: {}", circular);
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// Service not registered
    NotFound(&'static str),
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    Circular(Vec<&'static str>),
    /// Invalid lifetime resolution (e.g., scoped from root)
    WrongLifetime(&'static str),
    /// Maximum recursion depth exceeded
    DepthExceeded(usize),
    /// Identifier is bound but cannot be constructed
    NotInstantiable(&'static str),
    /// A constructor dependency could not be supplied from any source
    Unresolvable(&'static str),
    /// A scoped or contextual binding carried an unsupported payload
    InvalidBinding(&'static str),
    /// A builder method was called out of order
    InvalidUsage(&'static str),
    /// The AOT compiler could not serialize or write its output
    CompilationFailed(String),
    /// Catch-all wrapper for a failure during resolution of `id`
    ResolutionFailed {
        /// Identifier whose resolution failed
        id: &'static str,
        /// Snapshot of the resolving stack at the point of failure
        resolving_chain: Vec<&'static str>,
        /// Suggestions derived from the identifier (not bound, not autoloadable, circular...)
        suggestions: Vec<String>,
        /// The underlying error
        cause: Box<DiError>,
    },
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(name) => write!(f, "Service not found: {}", name),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::WrongLifetime(msg) => write!(f, "Lifetime error: {}", msg),
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::NotInstantiable(name) => write!(f, "Not instantiable: {}", name),
            DiError::Unresolvable(name) => write!(f, "Unresolvable dependency: {}", name),
            DiError::InvalidBinding(msg) => write!(f, "Invalid binding: {}", msg),
            DiError::InvalidUsage(msg) => write!(f, "Invalid usage: {}", msg),
            DiError::CompilationFailed(msg) => write!(f, "Compilation failed: {}", msg),
            DiError::ResolutionFailed { id, resolving_chain, suggestions, cause } => {
                write!(f, "Resolution failed for {}: {}", id, cause)?;
                if !resolving_chain.is_empty() {
                    write!(f, " (chain: {})", resolving_chain.join(" -> "))?;
                }
                if !suggestions.is_empty() {
                    write!(f, " (suggestions: {})", suggestions.join("; "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiError::ResolutionFailed { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl DiError {
    /// Wraps `self` as the cause of a `ResolutionFailed` for `id`, unless it already is one.
    pub fn into_resolution_failed(
        self,
        id: &'static str,
        resolving_chain: Vec<&'static str>,
    ) -> DiError {
        if matches!(self, DiError::ResolutionFailed { .. }) {
            return self;
        }
        let suggestions = Self::suggest(id, &self);
        DiError::ResolutionFailed { id, resolving_chain, suggestions, cause: Box::new(self) }
    }

    fn suggest(id: &'static str, cause: &DiError) -> Vec<String> {
        let mut out = Vec::new();
        match cause {
            DiError::NotFound(_) => {
                out.push(format!("no binding registered for `{id}`"));
                out.push(format!("check for a typo, or register a binding via `bind::<T>`/`singleton::<T>`"));
            }
            DiError::Circular(path) => {
                out.push(format!("circular dependency detected: {}", path.join(" -> ")));
                out.push("break the cycle with a lazy proxy or setter injection".to_string());
            }
            DiError::Unresolvable(_) => {
                out.push(format!("`{id}` has a constructor dependency with no resolvable source"));
            }
            _ => {}
        }
        out
    }
}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout ferrous-di.
/// This follows the common Rust pattern of having a crate-specific Result type
/// to reduce boilerplate in function signatures.
///
/// # Examples
///
/// ```rust
/// use ferrous_di::{DiResult, DiError};
///
/// fn create_service() -> DiResult<String> {
///     Ok("service created".to_string())
/// }
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::NotFound("some_service"))
/// }
///
/// // Usage
/// match create_service() {
///     Ok(service) => println!("Success: {}", service),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub type DiResult<T> = Result<T, DiError>;