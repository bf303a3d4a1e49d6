use crate::error::{IsgError, Result};
use crate::random_asm::inst_generator::GeneratorConfig;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "isg.toml";

/// `isg.toml` 的内容，所有字段都可以省略
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsgConfig {
    pub generator: GeneratorSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    #[serde(flatten)]
    pub config: GeneratorConfig,
    /// 每个程序的（最少）指令数
    pub num_instructions: usize,
    pub seed: Option<u64>,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        Self {
            config: GeneratorConfig::default(),
            num_instructions: 100,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// 语料根目录，每个程序一个子目录
    pub src_dir: PathBuf,
    pub prefix: String,
    pub overwrite: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            prefix: "isg".to_string(),
            overwrite: false,
        }
    }
}

impl IsgConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: IsgConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IsgError::file(format!("Configuration file does not exist: {:?}", path)));
        }
        info!("📄 Loading configuration from {:?}", path);
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    /// 给定路径时必须存在；否则尝试当前目录下的 `isg.toml`，不存在则使用默认值
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.generator.config.extensions.is_empty() {
            return Err(IsgError::config("At least one extension must be enabled"));
        }
        if self.output.prefix.trim().is_empty() {
            return Err(IsgError::config("Output prefix must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_asm::instructions::{Complexity, Extension};
    use std::collections::BTreeSet;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = IsgConfig::from_toml_str("").unwrap();
        assert_eq!(config, IsgConfig::default());
        assert_eq!(config.generator.config.extensions.len(), 3);
        assert_eq!(config.generator.num_instructions, 100);
        assert_eq!(config.output.prefix, "isg");
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[generator]
extensions = ["rv32i", "rv32c"]
allowed_instructions = ["add", "c.lwsp"]
allow_nop_fill = true
complexity = ["simple", "complex"]
num_instructions = 64
seed = 42

[output]
src_dir = "corpus"
prefix = "bench"
overwrite = true
"#;
        let config = IsgConfig::from_toml_str(content).unwrap();
        let generator = &config.generator.config;
        assert_eq!(
            generator.extensions,
            [Extension::Rv32i, Extension::Rv32c]
                .into_iter()
                .collect::<BTreeSet<_>>()
        );
        assert!(generator.allowed_instructions.as_ref().unwrap().contains("c.lwsp"));
        assert!(generator.allow_nop_fill);
        assert_eq!(
            generator.complexity,
            Some(
                [Complexity::Simple, Complexity::Complex]
                    .into_iter()
                    .collect::<BTreeSet<_>>()
            )
        );
        assert_eq!(config.generator.num_instructions, 64);
        assert_eq!(config.generator.seed, Some(42));
        assert_eq!(config.output.src_dir, PathBuf::from("corpus"));
        assert!(config.output.overwrite);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            IsgConfig::from_toml_str("[generator]\nextensions = []\n"),
            Err(IsgError::Config { .. })
        ));
        assert!(matches!(
            IsgConfig::from_toml_str("[generator]\nextensions = [\"rv64i\"]\n"),
            Err(IsgError::Toml(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        let err = IsgConfig::load(&temp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, IsgError::File { .. }));
    }
}
