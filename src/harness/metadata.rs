use crate::error::Result;
use crate::random_asm::inst_generator::{GeneratedProgram, GeneratorConfig};
use crate::random_asm::instructions::Extension;
use crate::utils::{build_rv32_march, get_regs_in_inst};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// 与每个 C 文件一起保存的生成信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramMetadata {
    pub name: String,
    pub buffer_register: String,
    pub march: String,
    pub extensions: BTreeSet<Extension>,
    pub allowed_instructions: Option<BTreeSet<String>>,
    pub requested_instructions: usize,
    pub instruction_count: usize,
    pub labels: Vec<String>,
    /// 程序中出现过的寄存器（架构名），不含通过 `%0` 引用的缓冲区寄存器
    pub registers: BTreeSet<String>,
    pub seed: u64,
    pub generated_at: String,
}

impl ProgramMetadata {
    pub fn new(
        name: &str,
        program: &GeneratedProgram,
        config: &GeneratorConfig,
        requested_instructions: usize,
        seed: u64,
    ) -> Self {
        let registers = program
            .lines
            .iter()
            .flat_map(|line| get_regs_in_inst(&line.to_string()))
            .collect();

        Self {
            name: name.to_string(),
            buffer_register: program.buffer_register.to_string(),
            march: build_rv32_march(&config.extensions),
            extensions: config.extensions.clone(),
            allowed_instructions: config.allowed_instructions.clone(),
            requested_instructions,
            instruction_count: program.instruction_count(),
            labels: program.labels().into_iter().map(String::from).collect(),
            registers,
            seed,
            generated_at: Local::now().to_rfc3339(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_asm::inst_generator::InstructionsGenerator;

    #[test]
    fn test_metadata_describes_program() {
        let config = GeneratorConfig::default();
        let program = InstructionsGenerator::from_seed(config.clone(), 21)
            .unwrap()
            .generate(40)
            .unwrap();
        let metadata = ProgramMetadata::new("isg_40_0", &program, &config, 40, 21);

        assert_eq!(metadata.march, "rv32imc");
        assert_eq!(metadata.instruction_count, program.instruction_count());
        assert!(metadata.instruction_count >= 40);
        assert_eq!(metadata.labels.len(), program.labels().len());
        assert!(!metadata.registers.contains(&metadata.buffer_register));
    }

    #[test]
    fn test_metadata_json_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("meta.json");
        let config = GeneratorConfig::default();
        let program = InstructionsGenerator::from_seed(config.clone(), 1)
            .unwrap()
            .generate(10)
            .unwrap();
        let metadata = ProgramMetadata::new("p", &program, &config, 10, 1);

        metadata.save(&path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"rv32c\""));
        assert_eq!(ProgramMetadata::load(&path).unwrap(), metadata);
    }
}
