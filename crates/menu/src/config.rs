use consolekit_core::config::env_or;

/// Length bounds for menu names and route paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuRules {
    pub name_min: usize,
    pub name_max: usize,
    pub path_min: usize,
    pub path_max: usize,
}

impl Default for MenuRules {
    fn default() -> Self {
        Self {
            name_min: 2,
            name_max: 30,
            path_min: 2,
            path_max: 100,
        }
    }
}

impl MenuRules {
    /// Defaults overridden by `CONSOLEKIT_MENU_NAME_MIN`, `..._NAME_MAX`,
    /// `..._PATH_MIN` and `..._PATH_MAX`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            name_min: env_or("CONSOLEKIT_MENU_NAME_MIN", d.name_min),
            name_max: env_or("CONSOLEKIT_MENU_NAME_MAX", d.name_max),
            path_min: env_or("CONSOLEKIT_MENU_PATH_MIN", d.path_min),
            path_max: env_or("CONSOLEKIT_MENU_PATH_MAX", d.path_max),
        }
    }
}
