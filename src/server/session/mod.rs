//! Match session orchestration: the per-match session actor and the
//! manager that owns the active-session map.

pub mod actor;
pub mod manager;
