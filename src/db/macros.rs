//! Engine dispatch macro for reducing code duplication.
//!
//! Expands to an exhaustive `match` over `EngineAdapter`, binding the inner
//! adapter to the given identifier in every arm. Adding an engine variant
//! without an arm here is a compile error.

/// Run the same expression against whichever adapter an `EngineAdapter` holds.
///
/// # Example
///
/// ```ignore
/// dispatch_adapter!(self, a => a.connect().await)
/// ```
#[macro_export]
macro_rules! dispatch_adapter {
    ($adapter:expr, $a:ident => $body:expr) => {
        match $adapter {
            $crate::db::adapter::EngineAdapter::MySql($a) => $body,
            $crate::db::adapter::EngineAdapter::Postgres($a) => $body,
        }
    };
}

pub use dispatch_adapter;
