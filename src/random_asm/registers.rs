use crate::error::{IsgError, Result};
use enum_iterator::Sequence;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 寄存器名称集合（寄存器名均来自静态寄存器表）
pub type RegisterSet = BTreeSet<&'static str>;

/// 寄存器的 ABI 分类
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Sequence,
)]
#[serde(rename_all = "snake_case")]
pub enum RegisterCategory {
    Zero,
    ReturnAddress,
    StackPointer,
    GlobalPointer,
    ThreadPointer,
    Temporary,
    Saved,
    Argument,
}

/// 通用分配池的默认分类
pub const DEFAULT_CATEGORIES: &[RegisterCategory] = &[
    RegisterCategory::Temporary,
    RegisterCategory::Saved,
    RegisterCategory::Argument,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    /// 架构名 (x0 - x31)
    pub name: &'static str,
    /// ABI 别名 (zero, ra, sp, ...)
    pub abi_name: &'static str,
    pub category: RegisterCategory,
    /// 是否可以出现在 rd'/rs1'/rs2' 这类 3 位寄存器字段中 (x8 - x15)
    pub compressed: bool,
    pub description: &'static str,
}

const fn reg(
    name: &'static str,
    abi_name: &'static str,
    category: RegisterCategory,
    compressed: bool,
    description: &'static str,
) -> RegisterDescriptor {
    RegisterDescriptor {
        name,
        abi_name,
        category,
        compressed,
        description,
    }
}

use RegisterCategory::*;

/// RV32 整数寄存器表
pub static REGISTERS: [RegisterDescriptor; 32] = [
    reg("x0", "zero", Zero, false, "Hard-wired zero"),
    reg("x1", "ra", ReturnAddress, false, "Return address"),
    reg("x2", "sp", StackPointer, false, "Stack pointer"),
    reg("x3", "gp", GlobalPointer, false, "Global pointer"),
    reg("x4", "tp", ThreadPointer, false, "Thread pointer"),
    reg("x5", "t0", Temporary, false, "Temporary register 0"),
    reg("x6", "t1", Temporary, false, "Temporary register 1"),
    reg("x7", "t2", Temporary, false, "Temporary register 2"),
    reg("x8", "s0", Saved, true, "Saved register 0 / frame pointer"),
    reg("x9", "s1", Saved, true, "Saved register 1"),
    reg(
        "x10",
        "a0",
        Argument,
        true,
        "Function argument 0 / return value 0",
    ),
    reg(
        "x11",
        "a1",
        Argument,
        true,
        "Function argument 1 / return value 1",
    ),
    reg("x12", "a2", Argument, true, "Function argument 2"),
    reg("x13", "a3", Argument, true, "Function argument 3"),
    reg("x14", "a4", Argument, true, "Function argument 4"),
    reg("x15", "a5", Argument, true, "Function argument 5"),
    reg("x16", "a6", Argument, false, "Function argument 6"),
    reg("x17", "a7", Argument, false, "Function argument 7"),
    reg("x18", "s2", Saved, false, "Saved register 2"),
    reg("x19", "s3", Saved, false, "Saved register 3"),
    reg("x20", "s4", Saved, false, "Saved register 4"),
    reg("x21", "s5", Saved, false, "Saved register 5"),
    reg("x22", "s6", Saved, false, "Saved register 6"),
    reg("x23", "s7", Saved, false, "Saved register 7"),
    reg("x24", "s8", Saved, false, "Saved register 8"),
    reg("x25", "s9", Saved, false, "Saved register 9"),
    reg("x26", "s10", Saved, false, "Saved register 10"),
    reg("x27", "s11", Saved, false, "Saved register 11"),
    reg("x28", "t3", Temporary, false, "Temporary register 3"),
    reg("x29", "t4", Temporary, false, "Temporary register 4"),
    reg("x30", "t5", Temporary, false, "Temporary register 5"),
    reg("x31", "t6", Temporary, false, "Temporary register 6"),
];

/// 寄存器表的一个视图，附带永久排除的寄存器（例如缓冲区寄存器）
#[derive(Debug, Clone, Default)]
pub struct RegisterFile {
    excluded: RegisterSet,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一个永久排除指定寄存器的寄存器表
    pub fn with_exclusions<I>(excluded: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Self {
            excluded: excluded.into_iter().collect(),
        }
    }

    pub fn by_category(&self, categories: &[RegisterCategory]) -> Vec<&'static RegisterDescriptor> {
        REGISTERS
            .iter()
            .filter(|reg| categories.contains(&reg.category))
            .collect()
    }

    /// 可用于压缩指令 3 位寄存器字段的寄存器，可选地再按分类过滤
    pub fn compressed_eligible(
        &self,
        categories: Option<&[RegisterCategory]>,
    ) -> Vec<&'static RegisterDescriptor> {
        REGISTERS
            .iter()
            .filter(|reg| reg.compressed)
            .filter(|reg| categories.is_none_or(|cats| cats.contains(&reg.category)))
            .collect()
    }

    /// 按架构名或 ABI 别名查找寄存器
    pub fn lookup(name: &str) -> Option<&'static RegisterDescriptor> {
        REGISTERS
            .iter()
            .find(|reg| reg.name == name || reg.abi_name == name)
    }

    /// 从过滤后的寄存器池中均匀抽取一个寄存器名
    ///
    /// `require_compressed` 为 false 时只在非压缩寄存器中抽取，使指令本身的
    /// 压缩/标准选择与寄存器选择互不影响。
    pub fn pick_random<R: Rng>(
        &self,
        rng: &mut R,
        categories: &[RegisterCategory],
        exclusions: &RegisterSet,
        require_compressed: bool,
    ) -> Result<&'static str> {
        let pool = if require_compressed {
            self.compressed_eligible(Some(categories))
        } else {
            self.by_category(categories)
                .into_iter()
                .filter(|reg| !reg.compressed)
                .collect()
        };

        let candidates: Vec<&'static RegisterDescriptor> = pool
            .into_iter()
            .filter(|reg| !self.excluded.contains(reg.name) && !exclusions.contains(reg.name))
            .collect();

        candidates.choose(rng).map(|reg| reg.name).ok_or_else(|| {
            let all_exclusions: Vec<&str> = self.excluded.union(exclusions).copied().collect();
            IsgError::no_candidate_register(
                format!("{:?}", categories),
                format!("{:?}", all_exclusions),
            )
        })
    }

    /// 默认分类下的非压缩寄存器
    pub fn pick_default<R: Rng>(
        &self,
        rng: &mut R,
        exclusions: &RegisterSet,
    ) -> Result<&'static str> {
        self.pick_random(rng, DEFAULT_CATEGORIES, exclusions, false)
    }

    /// 默认分类下的压缩寄存器 (x8 - x15)
    pub fn pick_compressed<R: Rng>(
        &self,
        rng: &mut R,
        exclusions: &RegisterSet,
    ) -> Result<&'static str> {
        self.pick_random(rng, DEFAULT_CATEGORIES, exclusions, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_register_table_layout() {
        for (index, reg) in REGISTERS.iter().enumerate() {
            assert_eq!(reg.name, format!("x{}", index));
        }
        let compressed: Vec<&str> = RegisterFile::new()
            .compressed_eligible(None)
            .iter()
            .map(|reg| reg.name)
            .collect();
        assert_eq!(
            compressed,
            vec!["x8", "x9", "x10", "x11", "x12", "x13", "x14", "x15"]
        );
    }

    #[test]
    fn test_default_pick_avoids_compressed_registers() {
        let file = RegisterFile::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let name = file.pick_default(&mut rng, &RegisterSet::new()).unwrap();
            let reg = RegisterFile::lookup(name).unwrap();
            assert!(!reg.compressed, "{} should not be drawn", name);
            assert!(DEFAULT_CATEGORIES.contains(&reg.category));
        }
    }

    #[test]
    fn test_compressed_pick_honours_permanent_exclusions() {
        let file = RegisterFile::with_exclusions(["x10"]);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let name = file.pick_compressed(&mut rng, &RegisterSet::new()).unwrap();
            assert_ne!(name, "x10");
            assert!(RegisterFile::lookup(name).unwrap().compressed);
        }
    }

    #[test]
    fn test_empty_pool_reports_no_candidate() {
        let file = RegisterFile::with_exclusions(["x5", "x6", "x7"]);
        let mut rng = StdRng::seed_from_u64(3);
        let exclusions: RegisterSet = ["x28", "x29", "x30", "x31"].into_iter().collect();
        let err = file
            .pick_random(&mut rng, &[RegisterCategory::Temporary], &exclusions, false)
            .unwrap_err();
        assert!(matches!(err, IsgError::NoCandidateRegister { .. }));

        // 特殊寄存器没有压缩编码
        let err = file
            .pick_random(
                &mut rng,
                &[RegisterCategory::StackPointer],
                &RegisterSet::new(),
                true,
            )
            .unwrap_err();
        assert!(matches!(err, IsgError::NoCandidateRegister { .. }));
    }

    #[test]
    fn test_lookup_by_abi_alias() {
        assert_eq!(RegisterFile::lookup("sp").unwrap().name, "x2");
        assert_eq!(RegisterFile::lookup("x31").unwrap().abi_name, "t6");
        assert!(RegisterFile::lookup("x32").is_none());
    }
}
