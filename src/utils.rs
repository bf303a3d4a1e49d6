use crate::error::Result;
use crate::random_asm::instructions::Extension;
use crate::random_asm::registers::RegisterFile;
use chrono::{DateTime, Local};
use log::info;
use rand::{Rng, distr::Alphanumeric};
use std::{collections::BTreeSet, fs::create_dir_all, path::PathBuf};

pub fn resolve_output_dir(
    output_dir: Option<PathBuf>,
    workspace_dir: Option<PathBuf>,
) -> Result<PathBuf> {
    match (output_dir, workspace_dir) {
        (Some(dir), _) => {
            info!("使用固定输出目录: {:?}", dir);
            create_dir_all(&dir)?;
            Ok(dir)
        }
        (None, workspace) => {
            // 默认使用 workspace 模式
            let workspace = workspace.unwrap_or_else(|| PathBuf::from("workspace"));
            let random_output_dir = workspace.join(generate_random_dir_name());
            create_dir_all(&random_output_dir)?;
            info!("创建随机输出目录: {:?}", random_output_dir);
            Ok(random_output_dir)
        }
    }
}

fn generate_random_dir_name() -> String {
    let now: DateTime<Local> = Local::now();
    let timestamp = now.format("%Y%m%d_%H%M%S").to_string();
    let random_suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("isg_{}_{}", timestamp, random_suffix)
}

/// 根据启用的扩展构建 march 字符串（按 IMC 的规范顺序）。
pub fn build_rv32_march(extensions: &BTreeSet<Extension>) -> String {
    let mut march = String::from("rv32i");
    if extensions.contains(&Extension::Rv32m) {
        march.push('m');
    }
    if extensions.contains(&Extension::Rv32c) {
        march.push('c');
    }
    march
}

/// 从生成的汇编文本中提取指令行。
///
/// 同时接受原始文本和内联汇编形式（每行带引号和 `\n`），跳过
/// `.option` 等伪指令、标签以及注释。
pub fn extract_instruction_lines(assembly_code: &str) -> Vec<String> {
    let mut instructions = Vec::new();

    for line in assembly_code.lines() {
        let mut trimmed_line = line.trim();
        if let Some(inner) = trimmed_line
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        {
            trimmed_line = inner.trim_end_matches("\\n").trim();
        }

        if trimmed_line.is_empty() || trimmed_line.starts_with('.') {
            continue;
        }

        // 处理行内注释，只保留指令部分
        let instruction_part = match trimmed_line.find('#') {
            Some(comment_pos) => trimmed_line[..comment_pos].trim(),
            None => trimmed_line,
        };

        // 跳过标签行（以 : 结尾且不包含空格的行）
        if instruction_part.is_empty()
            || (instruction_part.ends_with(':') && !instruction_part.contains(' '))
        {
            continue;
        }

        instructions.push(instruction_part.to_string());
    }

    instructions
}

/// 提取一条指令中出现的所有寄存器，ABI 别名统一转换为架构名 (x0 - x31)。
pub fn get_regs_in_inst(inst: &str) -> Vec<String> {
    let mut regs = Vec::new();
    let mut current_token = String::new();

    for c in inst.chars() {
        match c {
            '(' | ')' | ',' | ' ' | '\t' => {
                if !current_token.is_empty() {
                    process_token(&current_token, &mut regs);
                    current_token.clear();
                }
            }
            _ => current_token.push(c),
        }
    }

    if !current_token.is_empty() {
        process_token(&current_token, &mut regs);
    }

    regs
}

fn process_token(token: &str, regs: &mut Vec<String>) {
    let cleaned_token = token.trim_matches(|c: char| c.is_whitespace() || c == ',' || c == ':');

    // 最短的寄存器名是两个字符 (x0, sp, ...)
    if cleaned_token.len() < 2 {
        return;
    }

    if let Some(reg) = RegisterFile::lookup(cleaned_token) {
        regs.push(reg.name.to_string());
    }
}
