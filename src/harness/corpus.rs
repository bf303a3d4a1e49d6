use crate::error::{IsgError, Result};
use crate::harness::metadata::ProgramMetadata;
use crate::random_asm::asm_maker::generate_c_harness_from_program;
use crate::random_asm::inst_generator::{GeneratorConfig, InstructionsGenerator};
use log::{info, warn};
use rand::Rng;
use rayon::prelude::*;
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 名称中带有该标记的目录不视为语料
const IGNORE_MARKER: &str = "0ignore_";

/// 语料目录：每个程序一个子目录 `<src_dir>/<name>/<name>.c`
#[derive(Debug, Clone)]
pub struct Corpus {
    src_dir: PathBuf,
    config: GeneratorConfig,
}

impl Corpus {
    pub fn new<P: Into<PathBuf>>(src_dir: P, config: GeneratorConfig) -> Self {
        Self {
            src_dir: src_dir.into(),
            config,
        }
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn program_dir(&self, name: &str) -> PathBuf {
        self.src_dir.join(name)
    }

    pub fn c_file_path(&self, name: &str) -> PathBuf {
        self.program_dir(name).join(format!("{}.c", name))
    }

    pub fn metadata_path(&self, name: &str) -> PathBuf {
        self.program_dir(name).join(format!("{}.json", name))
    }

    /// 列出所有包含同名 .c 文件的程序目录（按名称排序）
    pub fn list_programs(&self) -> Result<Vec<String>> {
        if !self.src_dir.exists() {
            return Ok(Vec::new());
        }

        let mut programs = Vec::new();
        for entry in fs::read_dir(&self.src_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.contains(IGNORE_MARKER) || !entry.path().is_dir() {
                continue;
            }
            if self.c_file_path(&name).is_file() {
                programs.push(name);
            }
        }
        programs.sort();
        Ok(programs)
    }

    /// 生成一个 C 测量文件及其元数据，返回 C 文件路径
    ///
    /// 未给定种子时从系统随机源抽取一个，并记录在元数据中以便复现。
    pub fn gen_c_file(
        &self,
        name: &str,
        num_instructions: usize,
        seed: Option<u64>,
        overwrite: bool,
    ) -> Result<PathBuf> {
        if name.trim().is_empty() {
            return Err(IsgError::config("Program name must be a non-empty string"));
        }
        if name.contains(['/', '\\']) {
            return Err(IsgError::config(format!(
                "Program name must not contain path separators: {}",
                name
            )));
        }

        let c_file_path = self.c_file_path(name);
        if c_file_path.exists() && !overwrite {
            return Err(IsgError::file(format!(
                "The file {:?} already exists. Enable overwrite to replace it.",
                c_file_path
            )));
        }

        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let mut generator = InstructionsGenerator::from_seed(self.config.clone(), seed)?;
        let program = generator.generate(num_instructions)?;

        // 生成成功后才创建目录，失败不会留下空目录
        create_dir_all(self.program_dir(name))?;
        fs::write(&c_file_path, generate_c_harness_from_program(&program))?;
        ProgramMetadata::new(name, &program, &self.config, num_instructions, seed)
            .save(&self.metadata_path(name))?;

        info!(
            "📝 Wrote {:?} ({} instructions, buffer register {})",
            c_file_path,
            program.instruction_count(),
            program.buffer_register
        );
        Ok(c_file_path)
    }

    /// 下一个可用的编号：`<prefix>_<num_instructions>_<id>` 中最大 id + 1
    ///
    /// 只统计包含同名 .c 文件的目录。
    pub fn next_id(&self, prefix: &str, num_instructions: usize) -> Result<usize> {
        if !self.src_dir.exists() {
            return Ok(0);
        }

        let group = format!("{}_{}_", prefix, num_instructions);
        let mut next = 0;
        for entry in fs::read_dir(&self.src_dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            let id = name
                .strip_prefix(&group)
                .and_then(|rest| rest.parse::<usize>().ok());
            if let Some(id) = id.filter(|_| self.c_file_path(&name).is_file()) {
                next = next.max(id + 1);
            }
        }
        Ok(next)
    }

    /// 追加 `count` 个新程序，编号接在已有的最大编号之后
    ///
    /// 给定 `base_seed` 时第 `id` 个程序使用 `base_seed + id` 作为种子。
    /// 任意一个程序生成失败都会返回错误，已经写出的文件保留。
    pub fn extend_corpus(
        &self,
        prefix: &str,
        num_instructions: usize,
        count: usize,
        base_seed: Option<u64>,
    ) -> Result<Vec<PathBuf>> {
        let start_id = self.next_id(prefix, num_instructions)?;
        let completed = AtomicUsize::new(0);

        info!(
            "🚀 Extending corpus {:?} with {} programs ({}_{}_{}..)",
            self.src_dir, count, prefix, num_instructions, start_id
        );

        let mut paths = (start_id..start_id + count)
            .into_par_iter()
            .map(|id| -> Result<PathBuf> {
                let name = format!("{}_{}_{}", prefix, num_instructions, id);
                let seed = base_seed.map(|base| base.wrapping_add(id as u64));
                match self.gen_c_file(&name, num_instructions, seed, false) {
                    Ok(path) => {
                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        info!("✅ {} ({}/{})", name, done, count);
                        Ok(path)
                    }
                    Err(e) => {
                        warn!("❌ Corpus extension failed at {}: {}", name, e);
                        Err(e)
                    }
                }
            })
            .collect::<Result<Vec<_>>>()?;

        paths.sort();
        Ok(paths)
    }
}
