use crate::tap::error::Error;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use strum_macros::{Display, EnumString};

pub const DEFAULT_FILE_NAME: &str = "debug_output.log";
pub const DEFAULT_SUBDIRECTORY: &str = "temp";

/// Where the log file lives relative to the workspace root.
#[derive(Copy, Clone, PartialEq, Debug, Default, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// `<root>/<file_name>`
    #[strum(serialize = "root")]
    Root,
    /// `<root>/<subdirectory>/<file_name>`
    #[default]
    #[strum(to_string = "subdirectory", serialize = "subdir")]
    Subdirectory,
}

/// Log file location settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub placement: Placement,
    /// Used only with [`Placement::Subdirectory`].
    pub subdirectory: String,
    pub file_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            subdirectory: DEFAULT_SUBDIRECTORY.to_string(),
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl Config {
    /// Read and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let data = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&data)
    }

    pub fn from_toml(data: &str) -> Result<Self, Error> {
        let config: Config = toml::de::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configured names can't move the log file out of the workspace.
    pub fn validate(&self) -> Result<(), Error> {
        single_component("file_name", &self.file_name)?;
        if self.placement == Placement::Subdirectory {
            single_component("subdirectory", &self.subdirectory)?;
        }
        Ok(())
    }

    /// Log file path for a workspace root.
    pub fn log_file_path(&self, root: &Path) -> PathBuf {
        match self.placement {
            Placement::Root => root.join(&self.file_name),
            Placement::Subdirectory => root.join(&self.subdirectory).join(&self.file_name),
        }
    }
}

fn single_component(field: &'static str, value: &str) -> Result<(), Error> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == value => Ok(()),
        _ => Err(Error::InvalidComponent {
            field,
            value: value.to_string(),
        }),
    }
}
