//! Protocol constants.
//!
//! Values shared by the request builder and the endpoint types.

/// Identifier used in place of claimed and local identifiers when the
/// provider is asked to choose the identity (directed identity).
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Reserved callback argument carrying the identifier the user typed, when it
/// differs from the claimed identifier.
pub const USER_SUPPLIED_IDENTIFIER_ARG: &str = "openid.rp.user_supplied_identifier";

/// Prefix that caller-supplied callback arguments must not use.
pub const RESERVED_ARG_PREFIX: &str = "openid.";

/// Maximum length of an association handle.
pub const MAX_HANDLE_LENGTH: usize = 255;

/// Request modes on the wire.
pub mod modes {
    /// Interactive authentication.
    pub const CHECKID_SETUP: &str = "checkid_setup";

    /// Non-interactive authentication.
    pub const CHECKID_IMMEDIATE: &str = "checkid_immediate";
}
