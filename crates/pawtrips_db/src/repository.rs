//! Repository factory trait
//!
//! Feature crates depend on the repository traits in [`crate::repositories`];
//! factories implementing this trait decide which backend they get.

/// Creates repository instances of type `R` from a configuration `C`.
pub trait RepositoryFactory<R, C> {
    fn create_repository(&self, config: C) -> R;
}
