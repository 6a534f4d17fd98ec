pub mod dom;
pub mod identity;
pub mod observe;

pub use identity::{scan_page, IdentitySource};
pub use observe::{resolve_identity, DetectorState, IdentityOutcome};
