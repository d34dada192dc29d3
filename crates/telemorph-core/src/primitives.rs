//! # Primitives
//!
//! Fixed markers and constants shared by the matcher, binder and translators.
//! These are compiled in and immutable at runtime.

/// Key value in a pattern that matches any concrete value, including `""`.
pub const WILDCARD: &str = "*";

/// Opening delimiter of a variable token such as `<intf>`.
pub const VAR_OPEN: char = '<';

/// Closing delimiter of a variable token.
pub const VAR_CLOSE: char = '>';

/// Origin of normalized output.
pub const OPENCONFIG_ORIGIN: &str = "openconfig";

/// Origin of vendor-native input paths.
pub const NATIVE_ORIGIN: &str = "eos_native";

/// Maximum number of notifications accepted in a single batch (CLI/API).
pub const MAX_BATCH_NOTIFICATIONS: usize = 10_000;

/// Variable name carried by a token, or `None` if `value` is a literal.
///
/// ```
/// use telemorph_core::primitives::variable_name;
///
/// assert_eq!(variable_name("<intf>"), Some("intf"));
/// assert_eq!(variable_name("Ethernet1"), None);
/// assert_eq!(variable_name("<>"), None);
/// ```
#[must_use]
pub fn variable_name(value: &str) -> Option<&str> {
    value
        .strip_prefix(VAR_OPEN)
        .and_then(|v| v.strip_suffix(VAR_CLOSE))
        .filter(|name| !name.is_empty())
}

/// True if `value` is the wildcard marker.
#[must_use]
pub fn is_wildcard(value: &str) -> bool {
    value == WILDCARD
}
