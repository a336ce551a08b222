//! Command handler implementations.

pub mod compose;
pub mod file;
pub mod logging;
pub mod shell;
pub mod system;

pub use compose::{
    ComposeDownHandler, ComposeFindHandler, ComposePsHandler, ComposeRouterHandler,
    ComposeUpHandler, ComposeViewHandler,
};
pub use file::{
    FileCopyHandler, FileGetHandler, FileInfoHandler, FileMoveHandler, FileRouterHandler,
};
pub use logging::{LoggingDecreaseHandler, LoggingIncreaseHandler, LoggingLevelHandler};
pub use shell::ShellHandler;
pub use system::{SystemAliasHandler, SystemInfoHandler, SystemOsHandler};

/// Drop the leading handler-name token from a payload, returning the rest
/// of the line verbatim (quoting preserved). Returns the whole payload when
/// the first token is not `name`.
pub(crate) fn strip_name_token<'a>(payload: &'a str, name: &str) -> &'a str {
    let trimmed = payload.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) if first == name => rest.trim_start(),
        None if trimmed == name => "",
        _ => trimmed,
    }
}
