use consolekit_core::config::env_or;

/// Length bounds for department names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeptRules {
    pub name_min: usize,
    pub name_max: usize,
}

impl Default for DeptRules {
    fn default() -> Self {
        Self {
            name_min: 1,
            name_max: 50,
        }
    }
}

impl DeptRules {
    /// Defaults overridden by `CONSOLEKIT_DEPT_NAME_MIN` / `CONSOLEKIT_DEPT_NAME_MAX`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            name_min: env_or("CONSOLEKIT_DEPT_NAME_MIN", d.name_min),
            name_max: env_or("CONSOLEKIT_DEPT_NAME_MAX", d.name_max),
        }
    }
}
