use crate::consts::harness::{BUFFER_MIDPOINT, BUFFER_WORDS};

/// 内联汇编在 `__asm__ volatile (` 中的缩进
const ASM_INDENT: &str = "        ";

/// 生成完整的 C 测量文件
///
/// `inline_asm` 是 [`format_for_embedding`](crate::random_asm::asm_maker::format_for_embedding)
/// 的输出，`%0` 由编译器替换为绑定到 `buffer_register` 的缓冲区指针。
pub fn generate_c_harness(inline_asm: &str, buffer_register: &str) -> String {
    format!(
        "{}\n{}\n{}",
        get_buffer_declaration(),
        get_execute_function(inline_asm, buffer_register),
        get_initialize_function()
    )
}

fn get_buffer_declaration() -> String {
    format!(
        "// Global buffer allocated at compile time with explicit alignment\n\
         static volatile int buffer[{}] __attribute__((aligned(8)));\n",
        BUFFER_WORDS
    )
}

fn get_execute_function(inline_asm: &str, buffer_register: &str) -> String {
    let body = inline_asm
        .lines()
        .map(|line| format!("{}{}", ASM_INDENT, line))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"int execute_cw (void)
{{
    volatile int *buf_ptr = &buffer[{midpoint}]; // Point to middle of buffer

    register volatile int *buf_ptr_reg asm("{buffer_register}") = buf_ptr;
    register long saved_ra asm("x1");

    // Save return address
    asm volatile ("mv %0, ra" : "=r" (saved_ra));

    __asm__ volatile (
{body}
        :
        : "r" (buf_ptr_reg)
        : "memory"
    );

    // Restore return address
    asm volatile ("mv ra, %0" : : "r" (saved_ra));

    return 0;
}}
"#,
        midpoint = BUFFER_MIDPOINT,
        buffer_register = buffer_register,
        body = body,
    )
}

fn get_initialize_function() -> &'static str {
    "void initialize_cw() {}\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_layout() {
        let asm = "\".option norvc\\n\"\n\"    lw x5, 8(%0)\\n\"\n\".option rvc\\n\"";
        let harness = generate_c_harness(asm, "x12");

        assert!(harness.starts_with("// Global buffer"));
        assert!(harness.contains("static volatile int buffer[1024] __attribute__((aligned(8)));"));
        assert!(harness.contains("volatile int *buf_ptr = &buffer[512];"));
        assert!(harness.contains("register volatile int *buf_ptr_reg asm(\"x12\") = buf_ptr;"));
        assert!(harness.contains("        \"    lw x5, 8(%0)\\n\"\n"));
        assert!(harness.contains(": \"r\" (buf_ptr_reg)"));
        assert!(harness.contains(": \"memory\""));
        assert!(harness.trim_end().ends_with("void initialize_cw() {}"));

        // ra 在汇编块之前保存、之后恢复
        let save = harness.find("mv %0, ra").unwrap();
        let block = harness.find("__asm__ volatile").unwrap();
        let restore = harness.find("mv ra, %0").unwrap();
        assert!(save < block && block < restore);
    }
}
