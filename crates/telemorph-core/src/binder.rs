//! # Variable Binder
//!
//! Extracts named variables from key values of a binding template and
//! substitutes them into an output template.
//!
//! A binding template is a path whose key values may be variable tokens
//! (`<name>`). Together, [`bind_keys`] and [`apply_bind`] express declarative
//! "rename path A's value into path B" rules without per-rule code.
//!
//! ```
//! use telemorph_core::{Path, binder};
//!
//! let input = Path::parse("/intf[name=<intf>]/counters/in-octets").unwrap();
//! let output = Path::parse("/interfaces/interface[name=<intf>]/state/counters/in-octets").unwrap();
//! let concrete = Path::parse("/intf[name=Ethernet1]/counters/in-octets").unwrap();
//!
//! let bindings = binder::bind_keys(&input, &concrete).unwrap();
//! let renamed = binder::apply_bind(&bindings, &output).unwrap();
//! assert_eq!(renamed.to_string(), "/interfaces/interface[name=Ethernet1]/state/counters/in-octets");
//! ```

use crate::TelemorphError;
use crate::path::Path;
use crate::primitives::{WILDCARD, variable_name};
use std::collections::BTreeMap;

/// Variable name → bound concrete value.
pub type Bindings = BTreeMap<String, String>;

/// Bind the variables of `template` by positional comparison with `concrete`.
///
/// Fails when lengths, element names or key-set sizes differ, when a literal
/// key value differs from the concrete one, or when one variable would bind
/// to two different values.
///
/// Origins are not bound. A template origin, when set, must equal the
/// concrete one; an empty template origin accepts any.
pub fn bind_keys(template: &Path, concrete: &Path) -> Result<Bindings, TelemorphError> {
    if !template.origin.is_empty() && template.origin != concrete.origin {
        return Err(TelemorphError::InvalidPath {
            path: concrete.to_string(),
            reason: format!("origin does not match template {template}"),
        });
    }
    if template.elems.len() != concrete.elems.len() {
        return Err(TelemorphError::LengthMismatch {
            template: template.to_string(),
            path: concrete.to_string(),
        });
    }

    let mut bindings = Bindings::new();
    for (index, (t, c)) in template.elems.iter().zip(&concrete.elems).enumerate() {
        if t.name != c.name {
            return Err(TelemorphError::ElementMismatch {
                index,
                template: template.to_string(),
                path: concrete.to_string(),
            });
        }
        let key_mismatch = || TelemorphError::KeyMismatch {
            index,
            template: template.to_string(),
            path: concrete.to_string(),
        };
        if t.keys.len() != c.keys.len() {
            return Err(key_mismatch());
        }
        for (key, tv) in &t.keys {
            let cv = c.keys.get(key).ok_or_else(key_mismatch)?;
            match variable_name(tv) {
                Some(var) => match bindings.get(var) {
                    Some(existing) if existing != cv => {
                        return Err(TelemorphError::AmbiguousBinding {
                            var: var.to_string(),
                            first: existing.clone(),
                            second: cv.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        bindings.insert(var.to_string(), cv.clone());
                    }
                },
                None if tv == cv => {}
                None => return Err(key_mismatch()),
            }
        }
    }
    Ok(bindings)
}

/// Substitute every variable token of `template` with its binding.
///
/// The result carries the template's origin. Fails with `UnboundVariable`
/// if a token has no entry in `bindings`.
pub fn apply_bind(bindings: &Bindings, template: &Path) -> Result<Path, TelemorphError> {
    let mut out = template.clone();
    for elem in &mut out.elems {
        for value in elem.keys.values_mut() {
            let Some(var) = variable_name(value) else {
                continue;
            };
            let bound = bindings
                .get(var)
                .ok_or_else(|| TelemorphError::UnboundVariable {
                    var: var.to_string(),
                    template: template.to_string(),
                })?;
            *value = bound.clone();
        }
    }
    Ok(out)
}

/// Turn a binding template into a matching pattern by replacing every
/// variable token with the wildcard. Literal values are kept.
#[must_use]
pub fn vars_to_wildcards(template: &Path) -> Path {
    let mut out = template.clone();
    for elem in &mut out.elems {
        for value in elem.keys.values_mut() {
            if variable_name(value).is_some() {
                *value = WILDCARD.to_string();
            }
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
