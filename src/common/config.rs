use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout_engine::Orientation;
use crate::sys::geometry::Thickness;

const MAX_PANEL_CHILDREN: usize = 64;

pub fn config_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".rift-placement.toml"))
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Number of children a panel may hold before new windows are placed into
    /// a nested split instead.
    #[serde(default = "default_max_panel_children")]
    pub max_panel_children: usize,
    /// Orientation of the root panel of newly registered desktops.
    #[serde(default)]
    pub default_orientation: Orientation,
    /// Whether pulling a node out of a nested panel may land it in the root.
    #[serde(default = "yes")]
    pub allow_pull_to_root: bool,
    #[serde(default)]
    pub gaps: GapSettings,
    #[serde(default)]
    pub stack: StackSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_panel_children: default_max_panel_children(),
            default_orientation: Orientation::default(),
            allow_pull_to_root: true,
            gaps: GapSettings::default(),
            stack: StackSettings::default(),
        }
    }
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Outer gaps (space between windows and the work area edges)
    #[serde(default)]
    pub outer: OuterGaps,
    /// Space between adjacent windows
    #[serde(default)]
    pub inner: i32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub bottom: i32,
    #[serde(default)]
    pub right: i32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct StackSettings {
    /// Extra padding around windows that live inside a stack, leaving room
    /// for tab or stack-line decorations.
    #[serde(default)]
    pub window_padding: i32,
}

impl GapSettings {
    /// Padding applied to every window so neighbours end up `inner` apart.
    pub fn window_padding(&self) -> Thickness {
        let half = self.inner / 2;
        Thickness {
            left: half,
            top: half,
            right: self.inner - half,
            bottom: self.inner - half,
        }
    }

    /// Padding of the root panel. Together with the windows' own padding the
    /// outer edge ends up exactly `outer` away from the work area.
    pub fn root_padding(&self) -> Thickness {
        let window = self.window_padding();
        Thickness {
            left: (self.outer.left - window.left).max(0),
            top: (self.outer.top - window.top).max(0),
            right: (self.outer.right - window.right).max(0),
            bottom: (self.outer.bottom - window.bottom).max(0),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.inner < 0 {
            issues.push(format!("inner gap must be non-negative, got {}", self.inner));
        }

        issues.extend(self.outer.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.inner < 0 {
            self.inner = 0;
            fixes += 1;
        }

        fixes + self.outer.auto_fix_values()
    }
}

impl OuterGaps {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in self.edges() {
            if value < 0 {
                issues.push(format!("outer.{name} gap must be non-negative, got {value}"));
            }
        }

        issues
    }

    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        for value in [&mut self.top, &mut self.left, &mut self.bottom, &mut self.right] {
            if *value < 0 {
                *value = 0;
                fixes += 1;
            }
        }

        fixes
    }

    fn edges(&self) -> [(&'static str, i32); 4] {
        [
            ("top", self.top),
            ("left", self.left),
            ("bottom", self.bottom),
            ("right", self.right),
        ]
    }
}

impl StackSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.window_padding < 0 {
            issues.push(format!(
                "stack.window_padding must be non-negative, got {}",
                self.window_padding
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        if self.window_padding < 0 {
            self.window_padding = 0;
            return 1;
        }
        0
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.max_panel_children < 2 {
            issues.push(format!(
                "max_panel_children must be at least 2, got {}",
                self.max_panel_children
            ));
        }
        if self.max_panel_children > MAX_PANEL_CHILDREN {
            issues.push(format!(
                "max_panel_children should not exceed {MAX_PANEL_CHILDREN}, got {}",
                self.max_panel_children
            ));
        }

        issues.extend(self.gaps.validate());
        issues.extend(self.stack.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.max_panel_children < 2 {
            self.max_panel_children = default_max_panel_children();
            fixes += 1;
        }
        if self.max_panel_children > MAX_PANEL_CHILDREN {
            self.max_panel_children = MAX_PANEL_CHILDREN;
            fixes += 1;
        }

        fixes += self.gaps.auto_fix_values();
        fixes += self.stack.auto_fix_values();

        fixes
    }
}

fn yes() -> bool { true }

fn default_max_panel_children() -> usize { 4 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> { Ok(toml::from_str(buf)?) }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::parse(include_str!("../../rift-placement.default.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.settings.max_panel_children, 4);
        assert!(config.settings.allow_pull_to_root);
        assert_eq!(config.settings.default_orientation, Orientation::Horizontal);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[settings]\nanimate = true\n").is_err());
    }

    #[test]
    fn validate_and_fix_negative_values() {
        let mut config = Config::parse(
            r#"
            [settings]
            max_panel_children = 1

            [settings.gaps]
            inner = -4
            outer = { top = -1, left = 2 }

            [settings.stack]
            window_padding = -3
            "#,
        )
        .unwrap();

        assert_eq!(config.validate().len(), 4);
        assert_eq!(config.auto_fix_values(), 4);
        assert!(config.validate().is_empty());
        assert_eq!(config.settings.gaps.inner, 0);
        assert_eq!(config.settings.gaps.outer.top, 0);
        assert_eq!(config.settings.gaps.outer.left, 2);
        assert_eq!(config.settings.max_panel_children, 4);
    }

    #[test]
    fn gap_padding_adds_up() {
        let gaps = GapSettings {
            inner: 9,
            outer: OuterGaps { top: 10, left: 10, bottom: 10, right: 10 },
        };
        let window = gaps.window_padding();
        assert_eq!(window.left + window.right, 9);
        let root = gaps.root_padding();
        assert_eq!(root.left + window.left, 10);
        assert_eq!(root.right + window.right, 10);
    }

    #[test]
    fn save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.settings.gaps.inner = 12;
        config.settings.default_orientation = Orientation::Vertical;
        config.save(&path).unwrap();

        assert_eq!(Config::read(&path).unwrap(), config);
    }
}
