//! Infrastructure error plumbing

mod conversions;

pub use conversions::InfraError;

use sitecap_domain::SitecapError;

/// Map any infrastructure error with an [`InfraError`] conversion into the
/// domain error.
pub(crate) fn to_domain<E>(err: E) -> SitecapError
where
    E: Into<InfraError>,
{
    err.into().into()
}
