//! 配置模块，负责加载打印参数的JSON配置文件

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 默认的配置文件名，在当前工作目录下查找
pub const DEFAULT_CONFIG_FILE: &str = "bexpr_dump.json";

/// 结构化打印的参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// 每一层嵌套使用的缩进单元
    pub indent: String,
    /// 根节点所在的层级
    pub level: usize,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            level: 0,
        }
    }
}

impl DumpConfig {
    /// 从JSON文件加载配置，缺失的字段使用默认值
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ConfigError::NotFound(path_ref.display().to_string()));
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;

        let config: DumpConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path_ref.display().to_string(),
                source,
            })?;

        log::debug!(
            "loaded dump config from {}: indent={:?} level={}",
            path_ref.display(),
            config.indent,
            config.level
        );
        Ok(config)
    }

    /// 加载默认配置文件，文件不存在或无效时回退到默认配置
    pub fn load_or_default() -> Self {
        match Self::from_json_file(DEFAULT_CONFIG_FILE) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => {
                log::warn!("{}, falling back to default dump config", e);
                Self::default()
            }
        }
    }
}
