// cvar.rs -- named configuration variables

use std::collections::HashMap;

use bitflags::bitflags;
use log::{debug, warn};

bitflags! {
    /// Behaviour flags attached to a console variable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CvarFlags: u32 {
        /// Saved to the user configuration on shutdown.
        const ARCHIVE = 1 << 0;
        /// Cannot be changed through `set`, only `force_set`.
        const NOSET = 1 << 1;
        /// Change is held until `apply_latched` is called.
        const LATCH = 1 << 2;
    }
}

/// A console variable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub latched_string: Option<String>,
    pub flags: CvarFlags,
    pub modified: bool,
    pub value: f32,
}

fn parse_value(s: &str) -> f32 {
    s.trim().parse::<f32>().unwrap_or(0.0)
}

/// The variable store. One per application, passed explicitly.
#[derive(Debug, Default)]
pub struct CvarContext {
    vars: Vec<Cvar>,
    /// O(1) lookup by name -> index in vars
    index: HashMap<String, usize>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a cvar by name.
    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.index.get(name).map(|&idx| &self.vars[idx])
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |var| var.value)
    }

    /// Get the string value of a cvar. Returns "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |var| var.string.as_str())
    }

    /// Get or create a cvar. If it already exists the value is kept and
    /// the flags are OR'd in.
    pub fn get(&mut self, name: &str, default: &str, flags: CvarFlags) -> &Cvar {
        let idx = match self.index.get(name) {
            Some(&idx) => {
                self.vars[idx].flags |= flags;
                idx
            }
            None => {
                let idx = self.vars.len();
                self.vars.push(Cvar {
                    name: name.to_string(),
                    string: default.to_string(),
                    latched_string: None,
                    flags,
                    modified: true,
                    value: parse_value(default),
                });
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &self.vars[idx]
    }

    fn set2(&mut self, name: &str, value: &str, force: bool) {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.get(name, value, CvarFlags::empty());
                return;
            }
        };
        let var = &mut self.vars[idx];

        if !force {
            if var.flags.contains(CvarFlags::NOSET) {
                warn!("{} is write protected", name);
                return;
            }
            if var.flags.contains(CvarFlags::LATCH) {
                let pending = var.latched_string.as_deref().unwrap_or(&var.string);
                if pending != value {
                    debug!("{} will be changed on restart", name);
                    var.latched_string = Some(value.to_string());
                }
                return;
            }
        } else {
            var.latched_string = None;
        }

        if var.string == value {
            return;
        }
        var.modified = true;
        var.string = value.to_string();
        var.value = parse_value(value);
    }

    /// Set a cvar value (respects NOSET and LATCH).
    pub fn set(&mut self, name: &str, value: &str) {
        self.set2(name, value, false);
    }

    /// Force-set a cvar value (ignores NOSET and LATCH).
    pub fn force_set(&mut self, name: &str, value: &str) {
        self.set2(name, value, true);
    }

    /// Set a cvar from a float value.
    pub fn set_value(&mut self, name: &str, value: f32) {
        let val_str = if value == (value as i32) as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &val_str);
    }

    /// Apply all latched variable changes.
    pub fn apply_latched(&mut self) {
        for var in &mut self.vars {
            if let Some(latched) = var.latched_string.take() {
                var.value = parse_value(&latched);
                var.string = latched;
                var.modified = true;
            }
        }
    }

    /// Names of variables modified since the last call, clearing the flag.
    pub fn take_modified(&mut self) -> Vec<String> {
        self.vars
            .iter_mut()
            .filter(|var| var.modified)
            .map(|var| {
                var.modified = false;
                var.name.clone()
            })
            .collect()
    }

    /// Variables flagged ARCHIVE, as `set name "value"` lines.
    pub fn archive_lines(&self) -> Vec<String> {
        self.vars
            .iter()
            .filter(|var| var.flags.contains(CvarFlags::ARCHIVE))
            .map(|var| format!("set {} \"{}\"", var.name, var.string))
            .collect()
    }
}
