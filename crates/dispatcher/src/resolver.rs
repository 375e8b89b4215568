//! DestinationResolver - picks the secondary destination's address
//!
//! An explicit address always wins. Otherwise an ordered list of fallback
//! sources is consulted and the first one that yields a non-empty value is
//! used. No list at all is a configuration error.

use std::fmt;

use contracts::{ContractError, Dsn, SecondaryConfig};
use tracing::{debug, instrument, warn};

/// Name of the explicit parameter, as it appears in configuration and errors
pub const SECONDARY_DSN_PARAMETER: &str = "secondary.dsn";

/// Performance-specific address, checked first
pub const PERFORMANCE_DSN_ENV: &str = "SENTRY_PERFORMANCE_DSN";

/// General/production address, checked second
pub const PRODUCTION_DSN_ENV: &str = "SENTRY_DSN";

type Lookup = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// A named source that may provide an address
pub struct FallbackSource {
    name: String,
    lookup: Lookup,
}

impl FallbackSource {
    /// Create a source backed by an arbitrary lookup
    pub fn new<F>(name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            lookup: Box::new(lookup),
        }
    }

    /// Create a source reading a process environment variable at lookup time
    pub fn env(var: impl Into<String>) -> Self {
        let var = var.into();
        let key = var.clone();
        Self::new(var, move || std::env::var(&key).ok())
    }

    /// Create a source that always yields the same value (or nothing)
    pub fn fixed(name: impl Into<String>, value: Option<String>) -> Self {
        Self::new(name, move || value.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query the source, treating blank values as absent
    pub fn lookup(&self) -> Option<String> {
        (self.lookup)().filter(|v| !v.trim().is_empty())
    }
}

impl fmt::Debug for FallbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackSource")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered environment-variable sources
pub fn env_fallbacks<I, S>(names: I) -> Vec<FallbackSource>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(FallbackSource::env).collect()
}

/// `SENTRY_PERFORMANCE_DSN`, then `SENTRY_DSN`
pub fn default_env_fallbacks() -> Vec<FallbackSource> {
    env_fallbacks([PERFORMANCE_DSN_ENV, PRODUCTION_DSN_ENV])
}

/// Sources named by `[secondary].fallback_env`; `None` when the key is absent
pub fn configured_fallbacks(config: &SecondaryConfig) -> Option<Vec<FallbackSource>> {
    config.fallback_env.as_deref().map(env_fallbacks)
}

/// Where a resolved address came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The explicit parameter
    Explicit,
    /// The named fallback source
    Fallback(String),
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => f.write_str("explicit"),
            Self::Fallback(name) => write!(f, "fallback:{name}"),
        }
    }
}

/// A resolved address and its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub address: String,
    pub source: ResolutionSource,
}

/// Resolves one destination parameter
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    parameter: String,
}

impl Default for DestinationResolver {
    fn default() -> Self {
        Self::new(SECONDARY_DSN_PARAMETER)
    }
}

impl DestinationResolver {
    /// Resolver for the named parameter (used in error messages)
    pub fn new(parameter: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
        }
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Produce exactly one address or fail.
    ///
    /// # Errors
    /// `ContractError::UnresolvedDestination` when the explicit value is
    /// missing and no fallback yields a value.
    #[instrument(
        name = "resolver_resolve",
        skip(self, explicit, fallbacks),
        fields(parameter = %self.parameter)
    )]
    pub fn resolve(
        &self,
        explicit: Option<&str>,
        fallbacks: Option<&[FallbackSource]>,
    ) -> Result<Resolved, ContractError> {
        if let Some(address) = explicit.filter(|v| !v.trim().is_empty()) {
            debug!(source = "explicit", "Destination resolved");
            return Ok(Resolved {
                address: address.trim().to_string(),
                source: ResolutionSource::Explicit,
            });
        }

        let Some(fallbacks) = fallbacks else {
            warn!("No explicit address and no fallback sources");
            return Err(ContractError::unresolved_destination(&self.parameter, None));
        };

        for source in fallbacks {
            if let Some(address) = source.lookup() {
                debug!(source = %source.name(), "Destination resolved from fallback");
                return Ok(Resolved {
                    address: address.trim().to_string(),
                    source: ResolutionSource::Fallback(source.name().to_string()),
                });
            }
            debug!(source = %source.name(), "Fallback source empty");
        }

        let names = fallbacks.iter().map(|s| s.name().to_string()).collect();
        Err(ContractError::unresolved_destination(
            &self.parameter,
            Some(names),
        ))
    }

    /// Resolve and parse into a `Dsn`
    ///
    /// # Errors
    /// Resolution errors unchanged, or `ContractError::InvalidDsn`.
    pub fn resolve_dsn(
        &self,
        explicit: Option<&str>,
        fallbacks: Option<&[FallbackSource]>,
    ) -> Result<(Dsn, ResolutionSource), ContractError> {
        let resolved = self.resolve(explicit, fallbacks)?;
        let dsn = Dsn::parse(&resolved.address)?;
        Ok((dsn, resolved.source))
    }
}

/// Resolve the secondary destination with the default parameter name
pub fn resolve_dsn(
    explicit: Option<&str>,
    fallbacks: Option<&[FallbackSource]>,
) -> Result<(Dsn, ResolutionSource), ContractError> {
    DestinationResolver::default().resolve_dsn(explicit, fallbacks)
}
