//! Sandbox module - path confinement and file quotas
//!
//! Validates caller-supplied file mappings before anything touches the guest
//! filesystem:
//! - path.rs: rewrites relative paths under the confinement root, rejecting
//!   traversal by construction
//! - quota.rs: enforces file count and size quotas over a whole request,
//!   all-or-nothing

mod path;
mod quota;

pub use path::{parent_directories, sanitize};
pub use quota::{validate, FileQuota, ValidatedFile};
