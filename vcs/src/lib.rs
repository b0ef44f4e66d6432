#[cfg(feature = "core")]
#[doc(inline)]
pub use vcs_core as core;

#[cfg(feature = "catalog")]
#[doc(inline)]
pub use vcs_catalog as catalog;

#[cfg(feature = "markers")]
#[doc(inline)]
pub use vcs_markers as markers;

#[cfg(feature = "store")]
#[doc(inline)]
pub use vcs_store as store;
