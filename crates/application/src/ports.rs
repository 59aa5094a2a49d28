//! Repository and collaborator ports.
//!
//! Each port is an `async_trait` object implemented by the infrastructure
//! crate against PostgreSQL (or Redis), and by in-memory fakes under test.
//! Update methods take the expected optimistic-concurrency [`Version`]
//! explicitly so version semantics stay visible at every call site; a stale
//! token fails with `AppError::ConcurrencyConflict`.
//!
//! [`Version`]: scolaris_core::Version

/// Relationship graph ports.
pub mod enrollment;
/// User, password hashing and event ports.
pub mod identity;
/// Invitation ports, including the transactional acceptance unit.
pub mod invitations;
/// Role and permission ports.
pub mod rbac;
/// Institution registry ports.
pub mod registry;
/// Token lifecycle and settings ports.
pub mod tokens;
