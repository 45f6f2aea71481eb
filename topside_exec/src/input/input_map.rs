//! Logical input name to capability mapping table

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::warn;
use std::collections::HashMap;
use std::fs::read_to_string;

// Internal
use super::{Capability, InputError};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Indirection table from stable logical input names (like "axis.rov.forward") to pad
/// capabilities, so that bindings can be changed in a file rather than in control code.
///
/// The on-disk format is a flat JSON object of logical name to capability name strings.
#[derive(Debug, Default)]
pub struct InputMap {
    map: HashMap<String, Capability>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl InputMap {
    /// An empty map, under which every logical name reads as no input.
    pub fn empty() -> Self {
        InputMap::default()
    }

    /// Load a mapping file.
    ///
    /// The file path is relative to the "triton_sw/params" directory, like parameter files.
    pub fn load(map_file_path: &str) -> Result<Self, InputError> {
        // Get the params dir
        let mut path = util::host::get_triton_sw_root()
            .map_err(|_| InputError::SwRootNotSet)?;
        path.push("params");
        path.push(map_file_path);

        // Load the file into a string
        let map_str = match read_to_string(path) {
            Ok(s) => s,
            Err(e) => return Err(InputError::MapReadError(e)),
        };

        Self::from_json(map_str.as_str())
    }

    /// Parse a mapping from JSON text.
    ///
    /// An entry naming a capability that does not exist is kept bound to [`Capability::None`]
    /// with a warning, so that a typo in the file disables one binding rather than the run.
    pub fn from_json(json: &str) -> Result<Self, InputError> {
        let raw: HashMap<String, String> = match serde_json::from_str(json) {
            Ok(r) => r,
            Err(e) => return Err(InputError::MapParseError(e)),
        };

        let mut map = HashMap::new();

        for (logical, cap_name) in raw {
            let cap = match Capability::from_name(cap_name.as_str()) {
                Some(c) => c,
                None => {
                    warn!(
                        "Input map binds \"{}\" to unknown capability \"{}\", using none instead",
                        logical, cap_name
                    );
                    Capability::None
                }
            };

            map.insert(logical, cap);
        }

        Ok(InputMap { map })
    }

    /// Translate a logical input name into the capability it is bound to.
    ///
    /// Unmapped names resolve to [`Capability::None`], which always reads neutral.
    pub fn translate(&self, logical: &str) -> Capability {
        self.map.get(logical).copied().unwrap_or(Capability::None)
    }

    /// The number of bindings in the map.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if the map holds no bindings at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_translate() {
        let map = InputMap::from_json(
            r#"{
                "axis.rov.forward": "lstick_y",
                "digital.rotate_wrist.cw": "rbumper",
                "digital.broken": "not_a_capability"
            }"#,
        )
        .unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.translate("axis.rov.forward"), Capability::LStickY);
        assert_eq!(map.translate("digital.rotate_wrist.cw"), Capability::RBumper);

        // Unknown capability names and unmapped logical names both read as no input
        assert_eq!(map.translate("digital.broken"), Capability::None);
        assert_eq!(map.translate("axis.not.mapped"), Capability::None);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(InputMap::from_json("not json at all").is_err());
        assert!(InputMap::empty().is_empty());
    }
}
