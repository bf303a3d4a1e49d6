use crate::error::{IsgError, Result};
use clap::ValueEnum;
use enum_iterator::Sequence;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// 支持的 RV32 扩展
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
    Sequence,
)]
pub enum Extension {
    /// 基础整数指令
    #[serde(rename = "rv32i")]
    #[value(name = "rv32i")]
    Rv32i,
    /// 乘除法扩展
    #[serde(rename = "rv32m")]
    #[value(name = "rv32m")]
    Rv32m,
    /// 压缩指令
    #[serde(rename = "rv32c")]
    #[value(name = "rv32c")]
    Rv32c,
}

impl Display for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extension::Rv32i => write!(f, "rv32i"),
            Extension::Rv32m => write!(f, "rv32m"),
            Extension::Rv32c => write!(f, "rv32c"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionClass {
    Alu,
    Load,
    Store,
    Branch,
    Jump,
    System,
    Atomic,
    Multiply,
}

/// 操作数格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
pub enum OperandFormat {
    /// rd, rs1, rs2
    R,
    /// rd, rs1, imm
    I,
    /// rs2, offset(rs1) / rd, offset(rs1)
    S,
    /// rs1, rs2, label
    B,
    /// rd, imm
    U,
    /// rd, label
    J,
    /// rd, csr, rs1
    Csr,
    /// rd, rs2
    Cr,
    /// rd, imm
    Ci,
    /// rs2, offset(sp)
    Css,
    /// rd', sp, uimm
    Ciw,
    /// rd', offset(rs1')
    Cl,
    /// rs2', offset(rs1')
    Cs,
    /// rd', rs2'
    Ca,
    /// rs1', imm / rs1', label
    Cb,
    /// label
    Cj,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
    Sequence,
)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// 可以安全地作为填充指令
    Simple,
    /// 会展开成多条指令，或者依赖 harness 的缓冲区约定
    Complex,
    /// 分支/跳转，不能作为普通填充
    Control,
}

/// 组合宏的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expansion {
    /// auipc + 填充 + jalr
    IndirectCall,
    /// auipc + 填充 + c.addi + c.jr/c.jalr
    CompressedIndirectJump,
    /// c.addi16sp sp, 16 + 填充 + c.addi16sp sp, -16
    StackAdjust,
    /// 把 sp 临时重定向到测量缓冲区后执行 c.lwsp/c.swsp
    StackRedirect,
}

/// 描述符自带的固定约束
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedConstraints {
    pub imm_range: Option<(i32, i32)>,
    /// 立即数不能为 0
    pub nonzero_imm: bool,
    pub no_operands: bool,
}

impl FixedConstraints {
    pub const NONE: FixedConstraints = FixedConstraints {
        imm_range: None,
        nonzero_imm: false,
        no_operands: false,
    };

    pub const fn imm(min: i32, max: i32) -> Self {
        Self {
            imm_range: Some((min, max)),
            nonzero_imm: false,
            no_operands: false,
        }
    }

    pub const fn bare() -> Self {
        Self {
            imm_range: None,
            nonzero_imm: false,
            no_operands: true,
        }
    }

    pub const fn nonzero(mut self) -> Self {
        self.nonzero_imm = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDescriptor {
    pub mnemonic: &'static str,
    pub extension: Extension,
    pub class: InstructionClass,
    pub format: OperandFormat,
    pub complexity: Complexity,
    pub description: &'static str,
    pub constraints: FixedConstraints,
    pub expansion: Option<Expansion>,
}

impl InstructionDescriptor {
    /// 分支，或不是宏展开的跳转，需要一个目标标签
    pub fn needs_label(&self) -> bool {
        self.class == InstructionClass::Branch
            || (self.class == InstructionClass::Jump && self.complexity != Complexity::Complex)
    }

    /// 只能由宏自己输出的助记符，调用方不能再输出一行
    pub fn is_macro_only(&self) -> bool {
        self.expansion == Some(Expansion::StackRedirect)
    }
}

const fn desc(
    mnemonic: &'static str,
    extension: Extension,
    class: InstructionClass,
    format: OperandFormat,
    complexity: Complexity,
    description: &'static str,
) -> InstructionDescriptor {
    InstructionDescriptor {
        mnemonic,
        extension,
        class,
        format,
        complexity,
        description,
        constraints: FixedConstraints::NONE,
        expansion: None,
    }
}

impl InstructionDescriptor {
    const fn with_constraints(mut self, constraints: FixedConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    const fn with_expansion(mut self, expansion: Expansion) -> Self {
        self.expansion = Some(expansion);
        self
    }
}

use Complexity::{Complex, Control, Simple};
use Extension::{Rv32c, Rv32i, Rv32m};
use InstructionClass::{Alu, Branch, Jump, Load, Multiply, Store};
use OperandFormat as F;

const SHIFT: FixedConstraints = FixedConstraints::imm(0, 31);
const C_SHIFT: FixedConstraints = FixedConstraints::imm(1, 31);

// ecall/ebreak、fence、CSR 指令以及除 nop 外的伪指令会让 harness 停机或陷入异常，不收录
pub static RV32I_INSTRUCTIONS: &[InstructionDescriptor] = &[
    desc("nop", Rv32i, Alu, F::I, Simple, "No operation (pseudo)")
        .with_constraints(FixedConstraints::bare()),
    desc("add", Rv32i, Alu, F::R, Simple, "Add"),
    desc("sub", Rv32i, Alu, F::R, Simple, "Subtract"),
    desc("and", Rv32i, Alu, F::R, Simple, "Bitwise AND"),
    desc("or", Rv32i, Alu, F::R, Simple, "Bitwise OR"),
    desc("xor", Rv32i, Alu, F::R, Simple, "Bitwise XOR"),
    desc("sll", Rv32i, Alu, F::R, Simple, "Shift left logical"),
    desc("srl", Rv32i, Alu, F::R, Simple, "Shift right logical"),
    desc("sra", Rv32i, Alu, F::R, Simple, "Shift right arith"),
    desc("slt", Rv32i, Alu, F::R, Simple, "Set less than"),
    desc("sltu", Rv32i, Alu, F::R, Simple, "Set less than unsigned"),
    desc("addi", Rv32i, Alu, F::I, Simple, "Add immediate"),
    desc("andi", Rv32i, Alu, F::I, Simple, "AND immediate"),
    desc("ori", Rv32i, Alu, F::I, Simple, "OR immediate"),
    desc("xori", Rv32i, Alu, F::I, Simple, "XOR immediate"),
    desc("slli", Rv32i, Alu, F::I, Simple, "Shift left logical imm").with_constraints(SHIFT),
    desc("srli", Rv32i, Alu, F::I, Simple, "Shift right logical imm").with_constraints(SHIFT),
    desc("srai", Rv32i, Alu, F::I, Simple, "Shift right arith imm").with_constraints(SHIFT),
    desc("slti", Rv32i, Alu, F::I, Simple, "Set less than imm"),
    desc("sltiu", Rv32i, Alu, F::I, Simple, "Set less than unsigned"),
    desc("lb", Rv32i, Load, F::S, Complex, "Load byte"),
    desc("lh", Rv32i, Load, F::S, Complex, "Load halfword"),
    desc("lw", Rv32i, Load, F::S, Complex, "Load word"),
    desc("lbu", Rv32i, Load, F::S, Complex, "Load byte unsigned"),
    desc("lhu", Rv32i, Load, F::S, Complex, "Load halfword unsigned"),
    desc("sb", Rv32i, Store, F::S, Complex, "Store byte"),
    desc("sh", Rv32i, Store, F::S, Complex, "Store halfword"),
    desc("sw", Rv32i, Store, F::S, Complex, "Store word"),
    desc("beq", Rv32i, Branch, F::B, Control, "Branch if equal"),
    desc("bne", Rv32i, Branch, F::B, Control, "Branch if not equal"),
    desc("blt", Rv32i, Branch, F::B, Control, "Branch if less than"),
    desc("bge", Rv32i, Branch, F::B, Control, "Branch if >="),
    desc("bltu", Rv32i, Branch, F::B, Control, "Branch if < unsigned"),
    desc("bgeu", Rv32i, Branch, F::B, Control, "Branch >= unsigned"),
    desc("jal", Rv32i, Jump, F::J, Control, "Jump and link"),
    desc("jalr", Rv32i, Jump, F::I, Complex, "Jump and link register")
        .with_constraints(FixedConstraints::imm(4, 4))
        .with_expansion(Expansion::IndirectCall),
    desc("lui", Rv32i, Alu, F::U, Simple, "Load upper immediate"),
    desc("auipc", Rv32i, Alu, F::U, Simple, "Add upper imm to PC"),
];

pub static RV32M_INSTRUCTIONS: &[InstructionDescriptor] = &[
    desc("mul", Rv32m, Multiply, F::R, Simple, "Multiply"),
    desc("mulh", Rv32m, Multiply, F::R, Simple, "Multiply high"),
    desc("mulhsu", Rv32m, Multiply, F::R, Simple, "Mul high s*u"),
    desc("mulhu", Rv32m, Multiply, F::R, Simple, "Mul high unsigned"),
    desc("div", Rv32m, Multiply, F::R, Simple, "Divide"),
    desc("divu", Rv32m, Multiply, F::R, Simple, "Divide unsigned"),
    desc("rem", Rv32m, Multiply, F::R, Simple, "Remainder"),
    desc("remu", Rv32m, Multiply, F::R, Simple, "Remainder unsigned"),
];

// 压缩指令的描述省略 "Compressed" 前缀
pub static RV32C_INSTRUCTIONS: &[InstructionDescriptor] = &[
    desc("c.add", Rv32c, Alu, F::Cr, Simple, "Add"),
    desc("c.mv", Rv32c, Alu, F::Cr, Simple, "Move"),
    desc("c.and", Rv32c, Alu, F::Ca, Simple, "Bitwise AND"),
    desc("c.or", Rv32c, Alu, F::Ca, Simple, "Bitwise OR"),
    desc("c.xor", Rv32c, Alu, F::Ca, Simple, "Bitwise XOR"),
    desc("c.sub", Rv32c, Alu, F::Ca, Simple, "Subtract"),
    // 立即数为 0 的 c.addi 是 HINT 编码
    desc("c.addi", Rv32c, Alu, F::Ci, Simple, "Add immediate")
        .with_constraints(FixedConstraints::imm(-32, 31).nonzero()),
    desc("c.slli", Rv32c, Alu, F::Ci, Simple, "Shift left log imm").with_constraints(C_SHIFT),
    desc("c.srli", Rv32c, Alu, F::Cb, Simple, "Shift right log imm").with_constraints(C_SHIFT),
    desc("c.srai", Rv32c, Alu, F::Cb, Simple, "Shift right arith imm").with_constraints(C_SHIFT),
    desc("c.andi", Rv32c, Alu, F::Cb, Simple, "AND immediate")
        .with_constraints(FixedConstraints::imm(-32, 31)),
    desc("c.nop", Rv32c, Alu, F::Ci, Simple, "No operation")
        .with_constraints(FixedConstraints::bare()),
    desc("c.li", Rv32c, Alu, F::Ci, Simple, "Load immediate"),
    desc("c.lui", Rv32c, Alu, F::Ci, Simple, "Load upper immediate")
        .with_constraints(FixedConstraints::imm(1, 31)),
    desc("c.lw", Rv32c, Load, F::Cl, Complex, "Load word"),
    desc("c.lwsp", Rv32c, Load, F::Ci, Complex, "Load word from SP")
        .with_expansion(Expansion::StackRedirect),
    desc("c.sw", Rv32c, Store, F::Cs, Complex, "Store word"),
    desc("c.swsp", Rv32c, Store, F::Css, Complex, "Store word to SP")
        .with_expansion(Expansion::StackRedirect),
    desc("c.beqz", Rv32c, Branch, F::Cb, Control, "Branch if zero"),
    desc("c.bnez", Rv32c, Branch, F::Cb, Control, "Branch if nonzero"),
    desc("c.jalr", Rv32c, Jump, F::Cr, Complex, "Jump link register")
        .with_expansion(Expansion::CompressedIndirectJump),
    desc("c.jr", Rv32c, Jump, F::Cr, Complex, "Jump register")
        .with_expansion(Expansion::CompressedIndirectJump),
    desc("c.jal", Rv32c, Jump, F::Cj, Control, "Jump and link"),
    desc("c.j", Rv32c, Jump, F::Cj, Control, "Jump"),
    desc("c.addi16sp", Rv32c, Alu, F::Ci, Complex, "Add imm*16 to SP")
        .with_expansion(Expansion::StackAdjust),
    desc("c.addi4spn", Rv32c, Alu, F::Ciw, Complex, "rd' = sp+imm*4"),
];

/// 指令数据库
#[derive(Debug, Clone)]
pub struct InstructionCatalog {
    instructions: Vec<InstructionDescriptor>,
    allow_nop_fill: bool,
}

impl InstructionCatalog {
    /// RV32I + RV32M + RV32C 子集
    pub fn rv32imc(allow_nop_fill: bool) -> Self {
        let instructions = RV32I_INSTRUCTIONS
            .iter()
            .chain(RV32M_INSTRUCTIONS)
            .chain(RV32C_INSTRUCTIONS)
            .copied()
            .collect();
        Self {
            instructions,
            allow_nop_fill,
        }
    }

    pub fn find(&self, mnemonic: &str) -> Option<&InstructionDescriptor> {
        self.instructions
            .iter()
            .find(|inst| inst.mnemonic == mnemonic)
    }

    pub fn by_extension(&self, extension: Extension) -> Vec<&InstructionDescriptor> {
        self.instructions
            .iter()
            .filter(|inst| inst.extension == extension)
            .collect()
    }

    pub fn by_class(&self, class: InstructionClass) -> Vec<&InstructionDescriptor> {
        self.instructions
            .iter()
            .filter(|inst| inst.class == class)
            .collect()
    }

    /// 按扩展、复杂度、助记符白名单过滤后的候选列表（None 或空集合表示不限制）
    ///
    /// 开启 nop 填充时，nop 描述符会被再追加一次（不去重），从而提高被抽中的概率。
    pub fn candidates(
        &self,
        extensions: Option<&BTreeSet<Extension>>,
        complexity: Option<&[Complexity]>,
        allowlist: Option<&BTreeSet<String>>,
    ) -> Vec<&InstructionDescriptor> {
        let mut candidates: Vec<&InstructionDescriptor> = self
            .instructions
            .iter()
            .filter(|inst| {
                extensions.is_none_or(|exts| exts.is_empty() || exts.contains(&inst.extension))
            })
            .filter(|inst| {
                complexity.is_none_or(|tiers| tiers.is_empty() || tiers.contains(&inst.complexity))
            })
            .filter(|inst| {
                allowlist.is_none_or(|names| names.is_empty() || names.contains(inst.mnemonic))
            })
            .collect();

        if self.allow_nop_fill {
            candidates.extend(self.find("nop"));
        }

        candidates
    }

    pub fn pick_random<R: Rng>(
        &self,
        rng: &mut R,
        extensions: Option<&BTreeSet<Extension>>,
        complexity: Option<&[Complexity]>,
        allowlist: Option<&BTreeSet<String>>,
    ) -> Result<InstructionDescriptor> {
        let candidates = self.candidates(extensions, complexity, allowlist);
        candidates.choose(rng).map(|inst| **inst).ok_or_else(|| {
            IsgError::no_matching_instruction(format!(
                "extensions={:?}, complexity={:?}, allowlist={:?}",
                extensions, complexity, allowlist
            ))
        })
    }
}

impl Default for InstructionCatalog {
    fn default() -> Self {
        Self::rv32imc(false)
    }
}
