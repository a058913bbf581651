//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging adapters for fault reporting."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Logging macros that stamp every event with the reporting component.
//!
//! All macros accept either `context = <LogContext>, <format args>` or plain
//! format arguments. The calling crate must depend on `tracing`.

#[doc(hidden)]
#[macro_export]
macro_rules! __fault_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            component = ctx.component.unwrap_or(""),
            component_type = ctx.component_type.unwrap_or(""),
            component_id = ?ctx.component_id,
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with component context.
#[macro_export]
macro_rules! fault_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fault_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fault_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with component context.
#[macro_export]
macro_rules! fault_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fault_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fault_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with component context.
#[macro_export]
macro_rules! fault_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__fault_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__fault_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
