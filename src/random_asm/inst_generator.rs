use crate::consts::harness::{
    BUFFER_PLACEHOLDER, COMPRESSED_WIDTH, CSR_POOL, LABEL_PREFIX, STANDARD_WIDTH,
};
use crate::error::{IsgError, Result};
use crate::random_asm::asm_maker::{format_for_embedding, insert_mode_directives};
use crate::random_asm::instructions::{
    Complexity, Expansion, Extension, FixedConstraints, InstructionCatalog, InstructionClass,
    InstructionDescriptor, OperandFormat,
};
use crate::random_asm::registers::{DEFAULT_CATEGORIES, RegisterCategory, RegisterFile, RegisterSet};
use enum_iterator::all;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// 两条框架指令（auipc + 跳转，或 auipc + c.addi + c.jr）占用的字节数
pub const INDIRECT_BASE_OFFSET: i32 = 8;

/// 宏展开时插入的填充指令最大数量
const MAX_MACRO_FILLER: usize = 3;
/// 栈重定向宏每一步之后的填充指令最大数量
const MAX_REDIRECT_FILLER: usize = 2;

/// 输出序列中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AsmLine {
    Instruction { mnemonic: String, operands: String },
    Label(String),
}

impl AsmLine {
    pub fn instruction<M: Into<String>, O: Into<String>>(mnemonic: M, operands: O) -> Self {
        Self::Instruction {
            mnemonic: mnemonic.into(),
            operands: operands.into(),
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, AsmLine::Label(_))
    }

    pub fn mnemonic(&self) -> Option<&str> {
        match self {
            AsmLine::Instruction { mnemonic, .. } => Some(mnemonic),
            AsmLine::Label(_) => None,
        }
    }

    pub fn operands(&self) -> Option<&str> {
        match self {
            AsmLine::Instruction { operands, .. } => Some(operands),
            AsmLine::Label(_) => None,
        }
    }

    /// 以 `c.` 开头的助记符使用 16 位编码
    pub fn is_compressed(&self) -> bool {
        self.mnemonic().is_some_and(|m| m.starts_with("c."))
    }

    /// 该行占用的字节数（标签为 0）
    pub fn width(&self) -> i32 {
        match self {
            AsmLine::Label(_) => 0,
            _ if self.is_compressed() => COMPRESSED_WIDTH,
            _ => STANDARD_WIDTH,
        }
    }
}

impl Display for AsmLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsmLine::Instruction { mnemonic, operands } if operands.is_empty() => {
                write!(f, "{}", mnemonic)
            }
            AsmLine::Instruction { mnemonic, operands } => write!(f, "{} {}", mnemonic, operands),
            AsmLine::Label(label) => write!(f, "{}:", label),
        }
    }
}

/// 单次合成使用的约束：描述符的固定约束 + 调用方的寄存器排除集 + 目标标签
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub imm_range: Option<(i32, i32)>,
    pub nonzero_imm: bool,
    pub no_operands: bool,
    pub excluded_registers: RegisterSet,
    pub target_label: Option<String>,
}

impl Constraints {
    pub fn merged(fixed: FixedConstraints, excluded: &RegisterSet) -> Self {
        Self {
            imm_range: fixed.imm_range,
            nonzero_imm: fixed.nonzero_imm,
            no_operands: fixed.no_operands,
            excluded_registers: excluded.clone(),
            target_label: None,
        }
    }
}

/// 操作数合成的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesized {
    /// 调用方需要输出 `mnemonic operands`
    Operands(String),
    /// 宏已经把所有行写入输出序列，调用方不能再输出该助记符
    Emitted,
}

/// 抽取指令时是否遵守助记符白名单
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Draw {
    Program,
    /// 宏内部的填充指令只受扩展和复杂度限制
    Filler,
}

/// 生成器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub extensions: BTreeSet<Extension>,
    pub allowed_instructions: Option<BTreeSet<String>>,
    pub allow_nop_fill: bool,
    /// 顶层指令的复杂度过滤（宏内部的填充不受影响）
    pub complexity: Option<BTreeSet<Complexity>>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            extensions: all::<Extension>().collect(),
            allowed_instructions: None,
            allow_nop_fill: false,
            complexity: None,
        }
    }
}

/// 一次 `generate` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProgram {
    pub lines: Vec<AsmLine>,
    /// 插入了 `.option` 指令并缩进后的汇编文本
    pub text: String,
    pub buffer_register: &'static str,
}

impl GeneratedProgram {
    pub fn instruction_count(&self) -> usize {
        self.lines.iter().filter(|line| !line.is_label()).count()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                AsmLine::Label(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 可直接放进 `__asm__ volatile (...)` 的文本
    pub fn inline_asm(&self) -> String {
        format_for_embedding(&self.text)
    }
}

/// 随机指令序列生成器
///
/// 同时负责操作数合成和指令发射：组合宏需要递归地生成填充指令并直接改写
/// 正在构建的输出序列，所以两者共享同一个对象。
#[derive(Debug)]
pub struct InstructionsGenerator<R: Rng = StdRng> {
    catalog: InstructionCatalog,
    registers: RegisterFile,
    buffer_register: &'static str,
    extensions: BTreeSet<Extension>,
    allowed_instructions: Option<BTreeSet<String>>,
    complexity: Option<Vec<Complexity>>,
    sequence: Vec<AsmLine>,
    label_counter: usize,
    rng: R,
}

impl InstructionsGenerator<StdRng> {
    pub fn from_seed(config: GeneratorConfig, seed: u64) -> Result<Self> {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng(config: GeneratorConfig) -> Result<Self> {
        Self::new(config, StdRng::from_os_rng())
    }
}

impl<R: Rng> InstructionsGenerator<R> {
    /// 创建生成器，并在此时从注入的随机源中抽取缓冲区寄存器
    pub fn new(config: GeneratorConfig, mut rng: R) -> Result<Self> {
        let buffer_register = RegisterFile::new().pick_compressed(&mut rng, &RegisterSet::new())?;
        debug!(
            "Reserved {} as measurement buffer register",
            buffer_register
        );

        Ok(Self {
            catalog: InstructionCatalog::rv32imc(config.allow_nop_fill),
            registers: RegisterFile::with_exclusions([buffer_register]),
            buffer_register,
            extensions: config.extensions,
            allowed_instructions: config.allowed_instructions,
            complexity: config.complexity.map(|tiers| tiers.into_iter().collect()),
            sequence: Vec::new(),
            label_counter: 0,
            rng,
        })
    }

    pub fn buffer_register(&self) -> &'static str {
        self.buffer_register
    }

    pub fn catalog(&self) -> &InstructionCatalog {
        &self.catalog
    }

    pub fn sequence(&self) -> &[AsmLine] {
        &self.sequence
    }

    /// 当前序列中的指令行数（不含标签）
    pub fn instruction_count(&self) -> usize {
        self.sequence.iter().filter(|line| !line.is_label()).count()
    }

    pub fn reset(&mut self) {
        self.sequence.clear();
        self.label_counter = 0;
    }

    /// 生成至少 `num_instructions` 条指令行（宏可能多出几行）并做后处理
    pub fn generate(&mut self, num_instructions: usize) -> Result<GeneratedProgram> {
        self.reset();
        let complexity = self.complexity.clone();
        let no_exclusions = RegisterSet::new();

        while self.instruction_count() < num_instructions {
            if let Err(e) = self.emit_one(complexity.as_deref(), &no_exclusions) {
                // 宏展开到一半失败时序列可能不完整，整体丢弃
                self.reset();
                return Err(e);
            }
        }

        let lines = std::mem::take(&mut self.sequence);
        let text = insert_mode_directives(&lines);
        debug!(
            "Generated {} lines ({} requested) with buffer register {}",
            lines.len(),
            num_instructions,
            self.buffer_register
        );

        Ok(GeneratedProgram {
            lines,
            text,
            buffer_register: self.buffer_register,
        })
    }

    pub fn generate_program(&mut self, num_instructions: usize) -> Result<String> {
        Ok(self.generate(num_instructions)?.text)
    }

    /// 随机生成一条指令（必要时带标签），遵守助记符白名单
    pub fn emit_one(
        &mut self,
        complexity: Option<&[Complexity]>,
        excluded_registers: &RegisterSet,
    ) -> Result<InstructionDescriptor> {
        self.emit(Draw::Program, complexity, excluded_registers)
    }

    fn emit_filler(
        &mut self,
        complexity: &[Complexity],
        excluded_registers: &RegisterSet,
    ) -> Result<InstructionDescriptor> {
        self.emit(Draw::Filler, Some(complexity), excluded_registers)
    }

    fn emit(
        &mut self,
        draw: Draw,
        complexity: Option<&[Complexity]>,
        excluded_registers: &RegisterSet,
    ) -> Result<InstructionDescriptor> {
        let allowlist = match draw {
            Draw::Program => self.allowed_instructions.as_ref(),
            Draw::Filler => None,
        };
        let spec = self.catalog.pick_random(
            &mut self.rng,
            Some(&self.extensions),
            complexity,
            allowlist,
        )?;

        let mut constraints = Constraints::merged(spec.constraints, excluded_registers);
        let label = if spec.needs_label() {
            let label = self.next_label();
            constraints.target_label = Some(label.clone());
            Some(label)
        } else {
            None
        };

        match self.synthesize(&spec, &constraints)? {
            Synthesized::Operands(operands) if !spec.is_macro_only() => {
                self.sequence
                    .push(AsmLine::instruction(spec.mnemonic, operands));
            }
            Synthesized::Emitted if spec.is_macro_only() => {}
            other => {
                return Err(IsgError::internal(format!(
                    "{} produced {:?}, inconsistent with its expansion kind",
                    spec.mnemonic, other
                )));
            }
        }

        if let Some(label) = label {
            self.sequence.push(AsmLine::Label(label));
        }

        Ok(spec)
    }

    /// 按描述符的操作数格式合成操作数
    pub fn synthesize(
        &mut self,
        spec: &InstructionDescriptor,
        constraints: &Constraints,
    ) -> Result<Synthesized> {
        if constraints.no_operands {
            return Ok(Synthesized::Operands(String::new()));
        }
        if let Some(expansion) = spec.expansion {
            return self.expand(expansion, spec, constraints);
        }

        let operands = match spec.format {
            OperandFormat::R => self.gen_r_type(constraints)?,
            OperandFormat::I => self.gen_i_type(constraints)?,
            OperandFormat::S => self.gen_s_type(spec, constraints)?,
            OperandFormat::B => self.gen_b_type(constraints)?,
            OperandFormat::U => self.gen_u_type(constraints)?,
            OperandFormat::J => self.gen_j_type(constraints)?,
            OperandFormat::Csr => self.gen_csr_type(constraints)?,
            OperandFormat::Cr => self.gen_cr_type(constraints)?,
            OperandFormat::Ci => self.gen_ci_type(constraints)?,
            OperandFormat::Css => self.gen_css_type(constraints)?,
            OperandFormat::Ciw => self.gen_ciw_type(constraints)?,
            OperandFormat::Cl => self.gen_cl_type(constraints)?,
            OperandFormat::Cs => self.gen_cs_type(constraints)?,
            OperandFormat::Ca => self.gen_ca_type(constraints)?,
            OperandFormat::Cb => self.gen_cb_type(constraints)?,
            OperandFormat::Cj => self.target_label(constraints),
        };

        Ok(Synthesized::Operands(operands))
    }

    fn expand(
        &mut self,
        expansion: Expansion,
        spec: &InstructionDescriptor,
        constraints: &Constraints,
    ) -> Result<Synthesized> {
        match expansion {
            Expansion::IndirectCall => self.indirect_call_sequence(constraints),
            Expansion::CompressedIndirectJump => self.compressed_jump_sequence(constraints),
            Expansion::StackAdjust => self.stack_adjust_sequence(constraints),
            Expansion::StackRedirect => self.stack_redirect_sequence(spec, constraints),
        }
    }

    // ---------------------------------------------------------------------
    // 组合宏
    // ---------------------------------------------------------------------

    /// auipc t, 0 + 0~3 条填充 + jalr link, t, offset
    fn indirect_call_sequence(&mut self, constraints: &Constraints) -> Result<Synthesized> {
        let excluded = &constraints.excluded_registers;
        let temp_reg = self.pick(&[RegisterCategory::Temporary], excluded)?;
        let link_reg = self.pick(DEFAULT_CATEGORIES, &with(excluded, [temp_reg]))?;

        self.sequence
            .push(AsmLine::instruction("auipc", format!("{}, 0", temp_reg)));
        let filler_start = self.sequence.len();

        let num_filler = self.rng.random_range(0..=MAX_MACRO_FILLER);
        let filler_exclusions = with(excluded, [temp_reg, link_reg]);
        for _ in 0..num_filler {
            self.emit_filler(&[Complexity::Simple], &filler_exclusions)?;
        }

        let offset = INDIRECT_BASE_OFFSET + self.bytes_since(filler_start);
        debug!("jalr sequence: {} filler, offset {}", num_filler, offset);

        Ok(Synthesized::Operands(format!("{}, {}, {}", link_reg, temp_reg, offset)))
    }

    /// auipc t, 0 + 0~3 条填充 + c.addi t, offset + c.jr/c.jalr t
    ///
    /// c.addi 随后与一条随机的填充指令交换位置；正确性只取决于偏移量的值。
    fn compressed_jump_sequence(&mut self, constraints: &Constraints) -> Result<Synthesized> {
        let excluded = &constraints.excluded_registers;
        let temp_reg = self.pick(&[RegisterCategory::Temporary], excluded)?;

        let auipc_index = self.sequence.len();
        self.sequence
            .push(AsmLine::instruction("auipc", format!("{}, 0", temp_reg)));

        let num_filler = self.rng.random_range(0..=MAX_MACRO_FILLER);
        let filler_exclusions = with(excluded, [temp_reg]);
        for _ in 0..num_filler {
            self.emit_filler(&[Complexity::Simple], &filler_exclusions)?;
        }

        let offset = INDIRECT_BASE_OFFSET + self.bytes_since(auipc_index + 1);
        self.sequence
            .push(AsmLine::instruction("c.addi", format!("{}, {}", temp_reg, offset)));

        if num_filler > 0 {
            let addi_index = self.sequence.len() - 1;
            let swap_index = self.rng.random_range(auipc_index + 1..addi_index);
            self.sequence.swap(addi_index, swap_index);
        }
        debug!(
            "compressed jump sequence: {} filler, offset {}",
            num_filler, offset
        );

        Ok(Synthesized::Operands(temp_reg.to_string()))
    }

    /// c.addi16sp sp, 16 + 0~3 条填充，调用方随后输出 c.addi16sp sp, -16
    fn stack_adjust_sequence(&mut self, constraints: &Constraints) -> Result<Synthesized> {
        self.sequence
            .push(AsmLine::instruction("c.addi16sp", "sp, 16"));

        let num_filler = self.rng.random_range(0..=MAX_MACRO_FILLER);
        for _ in 0..num_filler {
            self.emit_filler(
                &[Complexity::Simple, Complexity::Control],
                &constraints.excluded_registers,
            )?;
        }

        Ok(Synthesized::Operands("sp, -16".to_string()))
    }

    /// c.lwsp/c.swsp 只能以 sp 为基址：先把 sp 指向测量缓冲区，访存后再恢复
    fn stack_redirect_sequence(
        &mut self,
        spec: &InstructionDescriptor,
        constraints: &Constraints,
    ) -> Result<Synthesized> {
        let excluded = &constraints.excluded_registers;
        let temp_reg = self.pick(&[RegisterCategory::Temporary], excluded)?;
        let data_reg = self.pick(DEFAULT_CATEGORIES, &with(excluded, [temp_reg]))?;
        let offset = self.rng.random_range(0..=63) * 4;

        let access = match spec.mnemonic {
            "c.lwsp" | "c.swsp" => {
                AsmLine::instruction(spec.mnemonic, format!("{}, {}(sp)", data_reg, offset))
            }
            other => {
                return Err(IsgError::internal(format!(
                    "stack redirection is only defined for c.lwsp/c.swsp, got {}",
                    other
                )));
            }
        };

        let required = [
            AsmLine::instruction("c.mv", format!("{}, sp", temp_reg)),
            AsmLine::instruction("c.mv", format!("sp, {}", BUFFER_PLACEHOLDER)),
            access,
            AsmLine::instruction("c.mv", format!("sp, {}", temp_reg)),
        ];
        let last = required.len() - 1;
        let filler_exclusions = with(excluded, [temp_reg, "x2"]);

        for (step, line) in required.into_iter().enumerate() {
            self.sequence.push(line);
            if step == last {
                break;
            }
            let num_filler = self.rng.random_range(0..=MAX_REDIRECT_FILLER);
            for _ in 0..num_filler {
                self.emit_filler(&[Complexity::Simple], &filler_exclusions)?;
            }
        }

        Ok(Synthesized::Emitted)
    }

    // ---------------------------------------------------------------------
    // 标准格式
    // ---------------------------------------------------------------------

    fn gen_r_type(&mut self, constraints: &Constraints) -> Result<String> {
        let excluded = &constraints.excluded_registers;
        let rd = self.pick_default(excluded)?;
        let rs1 = self.pick_default(excluded)?;
        let rs2 = self.pick_default(excluded)?;
        Ok(format!("{}, {}, {}", rd, rs1, rs2))
    }

    fn gen_i_type(&mut self, constraints: &Constraints) -> Result<String> {
        let excluded = &constraints.excluded_registers;
        let rd = self.pick_default(excluded)?;
        let rs1 = self.pick_default(excluded)?;
        let imm = self.immediate(constraints, (-2048, 2047));
        Ok(format!("{}, {}, {}", rd, rs1, imm))
    }

    /// 访存指令以缓冲区占位符为基址，偏移按字对齐
    fn gen_s_type(
        &mut self,
        spec: &InstructionDescriptor,
        constraints: &Constraints,
    ) -> Result<String> {
        let excluded = &constraints.excluded_registers;
        let (base, offset) = match spec.class {
            InstructionClass::Load | InstructionClass::Store => (
                BUFFER_PLACEHOLDER.to_string(),
                self.rng.random_range(-100..=100) * 4,
            ),
            _ => (
                self.pick_default(excluded)?.to_string(),
                self.rng.random_range(-2048..=2047),
            ),
        };
        // load 的 rd 与 store 的 rs2 取自同一个寄存器池
        let reg = self.pick_default(excluded)?;
        Ok(format!("{}, {}({})", reg, offset, base))
    }

    fn gen_b_type(&mut self, constraints: &Constraints) -> Result<String> {
        let excluded = &constraints.excluded_registers;
        let rs1 = self.pick_default(excluded)?;
        let rs2 = self.pick_default(excluded)?;
        let label = self.target_label(constraints);
        Ok(format!("{}, {}, {}", rs1, rs2, label))
    }

    fn gen_u_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rd = self.pick_default(&constraints.excluded_registers)?;
        let imm = self.rng.random_range(0..(1 << 20));
        Ok(format!("{}, {}", rd, imm))
    }

    fn gen_j_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rd = self.pick_default(&constraints.excluded_registers)?;
        let label = self.target_label(constraints);
        Ok(format!("{}, {}", rd, label))
    }

    fn gen_csr_type(&mut self, constraints: &Constraints) -> Result<String> {
        let excluded = &constraints.excluded_registers;
        let rd = self.pick_default(excluded)?;
        let rs1 = self.pick_default(excluded)?;
        let csr = CSR_POOL
            .choose(&mut self.rng)
            .ok_or_else(|| IsgError::internal("CSR pool is empty"))?;
        Ok(format!("{}, {:#x}, {}", rd, csr, rs1))
    }

    // ---------------------------------------------------------------------
    // 压缩格式
    // ---------------------------------------------------------------------

    fn gen_cr_type(&mut self, constraints: &Constraints) -> Result<String> {
        let excluded = &constraints.excluded_registers;
        let rd = self.pick_default(excluded)?;
        let rs2 = self.pick_default(excluded)?;
        Ok(format!("{}, {}", rd, rs2))
    }

    fn gen_ci_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rd = self.pick_default(&constraints.excluded_registers)?;
        let imm = self.immediate(constraints, (-32, 31));
        Ok(format!("{}, {}", rd, imm))
    }

    fn gen_css_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rs2 = self.pick_default(&constraints.excluded_registers)?;
        let offset = self.rng.random_range(0..=63) * 4;
        Ok(format!("{}, {}(sp)", rs2, offset))
    }

    fn gen_ciw_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rd = self.pick_compressed(&constraints.excluded_registers)?;
        Ok(format!("{}, sp, 4", rd))
    }

    fn gen_cl_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rd = self.pick_compressed(&constraints.excluded_registers)?;
        let offset = self.rng.random_range(0..=31) * 4;
        Ok(format!("{}, {}({})", rd, offset, BUFFER_PLACEHOLDER))
    }

    fn gen_cs_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rs2 = self.pick_compressed(&constraints.excluded_registers)?;
        let offset = self.rng.random_range(0..=31) * 4;
        Ok(format!("{}, {}({})", rs2, offset, BUFFER_PLACEHOLDER))
    }

    fn gen_ca_type(&mut self, constraints: &Constraints) -> Result<String> {
        let excluded = &constraints.excluded_registers;
        let rd = self.pick_compressed(excluded)?;
        let rs2 = self.pick_compressed(excluded)?;
        Ok(format!("{}, {}", rd, rs2))
    }

    /// 有固定立即数范围时是移位/andi，否则是以标签为目标的分支
    fn gen_cb_type(&mut self, constraints: &Constraints) -> Result<String> {
        let rs1 = self.pick_compressed(&constraints.excluded_registers)?;
        match constraints.imm_range {
            Some(_) => {
                let imm = self.immediate(constraints, (-32, 31));
                Ok(format!("{}, {}", rs1, imm))
            }
            None => {
                let label = self.target_label(constraints);
                Ok(format!("{}, {}", rs1, label))
            }
        }
    }

    // ---------------------------------------------------------------------
    // 辅助函数
    // ---------------------------------------------------------------------

    fn next_label(&mut self) -> String {
        self.label_counter += 1;
        format!("{}{}", LABEL_PREFIX, self.label_counter)
    }

    fn target_label(&mut self, constraints: &Constraints) -> String {
        match &constraints.target_label {
            Some(label) => label.clone(),
            None => self.next_label(),
        }
    }

    fn immediate(&mut self, constraints: &Constraints, default: (i32, i32)) -> i32 {
        let (min, max) = constraints.imm_range.unwrap_or(default);
        if constraints.nonzero_imm && min <= 0 && 0 <= max && min < max {
            // 在去掉 0 之后的区间上均匀抽取
            let value = self.rng.random_range(min..max);
            return if value >= 0 { value + 1 } else { value };
        }
        self.rng.random_range(min..=max)
    }

    fn pick(
        &mut self,
        categories: &[RegisterCategory],
        excluded: &RegisterSet,
    ) -> Result<&'static str> {
        self.registers
            .pick_random(&mut self.rng, categories, excluded, false)
    }

    fn pick_default(&mut self, excluded: &RegisterSet) -> Result<&'static str> {
        self.registers.pick_default(&mut self.rng, excluded)
    }

    fn pick_compressed(&mut self, excluded: &RegisterSet) -> Result<&'static str> {
        self.registers.pick_compressed(&mut self.rng, excluded)
    }

    /// 从 `start` 开始的所有行占用的字节数
    fn bytes_since(&self, start: usize) -> i32 {
        self.sequence[start..].iter().map(AsmLine::width).sum()
    }
}

fn with<const N: usize>(base: &RegisterSet, extra: [&'static str; N]) -> RegisterSet {
    let mut set = base.clone();
    set.extend(extra);
    set
}
