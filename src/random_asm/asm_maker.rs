use crate::consts::harness::{DIRECTIVE_NORVC, DIRECTIVE_RVC, INDENT, LABEL_PREFIX, LABEL_SUFFIX};
use crate::error::Result;
use crate::harness::template::generate_c_harness;
use crate::random_asm::inst_generator::{
    AsmLine, GeneratedProgram, GeneratorConfig, InstructionsGenerator,
};
use clap::ValueEnum;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static LABEL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b{}(\d+)\b", LABEL_PREFIX)).expect("label pattern is valid")
});

/// 使用给定随机源生成一段程序
pub fn generate_program<R: Rng>(
    config: GeneratorConfig,
    num_instructions: usize,
    rng: R,
) -> Result<GeneratedProgram> {
    let mut generator = InstructionsGenerator::new(config, rng)?;
    generator.generate(num_instructions)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodingMode {
    Unset,
    Standard,
    Compressed,
}

/// 在标准/压缩指令之间插入 `.option norvc` / `.option rvc`
///
/// 每段连续的标准指令前插入 `.option norvc`，每段连续的压缩指令前插入
/// `.option rvc`；标签不打断连续段。末尾仍处于标准段时补一个 `.option rvc`。
/// 指令行缩进四个空格，标签和伪指令顶格。
pub fn insert_mode_directives(lines: &[AsmLine]) -> String {
    let mut output = Vec::with_capacity(lines.len() * 2);
    let mut mode = EncodingMode::Unset;

    for line in lines {
        if line.is_label() {
            output.push(line.to_string());
            continue;
        }

        let wanted = if line.is_compressed() {
            EncodingMode::Compressed
        } else {
            EncodingMode::Standard
        };
        if wanted != mode {
            output.push(
                match wanted {
                    EncodingMode::Compressed => DIRECTIVE_RVC,
                    _ => DIRECTIVE_NORVC,
                }
                .to_string(),
            );
            mode = wanted;
        }
        output.push(format!("{}{}", INDENT, line));
    }

    if mode == EncodingMode::Standard {
        output.push(DIRECTIVE_RVC.to_string());
    }

    output.join("\n")
}

/// 转换为 C 内联汇编的字符串拼接形式
///
/// 每个非空行变成 `"line\n"`，标签名追加 `%=` 以便同一段汇编被多次内联时
/// 标签仍然唯一。
pub fn format_for_embedding(text: &str) -> String {
    let quoted = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("\"{}\\n\"", line))
        .collect::<Vec<_>>()
        .join("\n");

    LABEL_TOKEN
        .replace_all(&quoted, format!("{}${{1}}{}", LABEL_PREFIX, LABEL_SUFFIX))
        .into_owned()
}

/// 根据生成的程序构造完整的 C 测量文件
pub fn generate_c_harness_from_program(program: &GeneratedProgram) -> String {
    generate_c_harness(&program.inline_asm(), program.buffer_register)
}

/// 程序的输出形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// 带 `.option` 伪指令的汇编文本
    Raw,
    /// C 内联汇编的字符串拼接形式
    Inline,
    /// 完整的 C 测量文件
    C,
}

impl OutputFormat {
    pub fn render(&self, program: &GeneratedProgram) -> String {
        match self {
            OutputFormat::Raw => program.text.clone(),
            OutputFormat::Inline => program.inline_asm(),
            OutputFormat::C => generate_c_harness_from_program(program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random_asm::instructions::Extension;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn inst(mnemonic: &str, operands: &str) -> AsmLine {
        AsmLine::instruction(mnemonic, operands)
    }

    #[test]
    fn test_directives_wrap_standard_runs() {
        let lines = vec![
            inst("add", "x5, x6, x7"),
            inst("c.add", "x5, x6"),
            inst("c.nop", ""),
            inst("sub", "x5, x6, x7"),
        ];
        let expected = [
            ".option norvc",
            "    add x5, x6, x7",
            ".option rvc",
            "    c.add x5, x6",
            "    c.nop",
            ".option norvc",
            "    sub x5, x6, x7",
            ".option rvc",
        ]
        .join("\n");
        assert_eq!(insert_mode_directives(&lines), expected);
    }

    #[test]
    fn test_leading_compressed_run_and_labels() {
        let lines = vec![
            inst("c.j", "L1"),
            AsmLine::Label("L1".to_string()),
            inst("c.mv", "x5, x6"),
        ];
        let expected = [".option rvc", "    c.j L1", "L1:", "    c.mv x5, x6"].join("\n");
        assert_eq!(insert_mode_directives(&lines), expected);

        // 标签不打断标准段
        let lines = vec![
            inst("beq", "x5, x6, L1"),
            AsmLine::Label("L1".to_string()),
            inst("add", "x5, x6, x7"),
        ];
        let text = insert_mode_directives(&lines);
        assert_eq!(text.matches(".option norvc").count(), 1);
        assert!(text.ends_with(".option rvc"));
    }

    #[test]
    fn test_empty_sequence() {
        assert_eq!(insert_mode_directives(&[]), "");
        assert_eq!(format_for_embedding(""), "");
    }

    #[test]
    fn test_directives_alternate_in_generated_programs() {
        for seed in 0..30 {
            let program =
                generate_program(GeneratorConfig::default(), 120, StdRng::seed_from_u64(seed))
                    .unwrap();
            let directives: Vec<&str> = program
                .text
                .lines()
                .filter(|line| line.starts_with(".option"))
                .collect();
            assert!(directives.windows(2).all(|w| w[0] != w[1]));
            if let Some(last) = directives.last() {
                assert_eq!(*last, ".option rvc");
            }

            // 每条指令都处于与其编码一致的模式下
            let mut compressed_mode = None;
            for line in program.text.lines() {
                match line {
                    ".option rvc" => compressed_mode = Some(true),
                    ".option norvc" => compressed_mode = Some(false),
                    _ if line.starts_with(INDENT) => {
                        let is_compressed = line.trim_start().starts_with("c.");
                        assert_eq!(compressed_mode, Some(is_compressed), "{}", line);
                    }
                    _ => assert!(line.ends_with(':')),
                }
            }
        }
    }

    #[test]
    fn test_format_for_embedding() {
        let text = ".option norvc\n    beq x5, x6, L12\n.option rvc\nL12:\n\n    c.lw x8, 4(%0)";
        let expected = [
            "\".option norvc\\n\"",
            "\"    beq x5, x6, L12%=\\n\"",
            "\".option rvc\\n\"",
            "\"L12%=:\\n\"",
            "\"    c.lw x8, 4(%0)\\n\"",
        ]
        .join("\n");
        assert_eq!(format_for_embedding(text), expected);
    }

    #[test]
    fn test_only_label_tokens_are_rewritten() {
        let embedded = format_for_embedding("    lui x5, 12\n    c.j L3\nL3:");
        assert!(embedded.contains("lui x5, 12\\n"));
        assert!(embedded.contains("c.j L3%=\\n"));
        assert!(embedded.contains("\"L3%=:\\n\""));
    }

    #[test]
    fn test_output_formats() {
        let program =
            generate_program(GeneratorConfig::default(), 15, StdRng::seed_from_u64(12)).unwrap();
        assert_eq!(OutputFormat::Raw.render(&program), program.text);
        assert!(
            OutputFormat::Inline
                .render(&program)
                .lines()
                .all(|line| line.starts_with('"') && line.ends_with("\\n\""))
        );
        assert!(OutputFormat::C.render(&program).contains("execute_cw"));
    }

    #[test]
    fn test_c_harness_embeds_program() {
        let config = GeneratorConfig {
            extensions: [Extension::Rv32i, Extension::Rv32c].into_iter().collect(),
            ..GeneratorConfig::default()
        };
        let program = generate_program(config, 20, StdRng::seed_from_u64(4)).unwrap();
        let harness = generate_c_harness_from_program(&program);
        assert!(harness.contains(&format!("asm(\"{}\")", program.buffer_register)));
        for label in program.labels() {
            assert!(harness.contains(&format!("{}%=:", label)));
        }
    }
}
