//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging adapters and sinks."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
/// Shared expansion for the `ems_*` macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __ems_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $level,
            entity = ctx.entity.unwrap_or(""),
            host = ctx.host.unwrap_or(""),
            oid = ctx.oid.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with device context.
#[macro_export]
macro_rules! ems_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with device context.
#[macro_export]
macro_rules! ems_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with device context.
#[macro_export]
macro_rules! ems_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with device context.
#[macro_export]
macro_rules! ems_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__ems_event!($crate::tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
