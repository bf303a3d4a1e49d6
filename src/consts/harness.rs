// 测量 harness 与生成器之间共享的约定

/// 内联汇编中缓冲区指针输入操作数的占位符
pub const BUFFER_PLACEHOLDER: &str = "%0";

/// GCC 内联汇编中每个展开位置唯一的编号，追加到标签后避免重复定义
pub const LABEL_SUFFIX: &str = "%=";

/// 生成的分支/跳转目标标签前缀
pub const LABEL_PREFIX: &str = "L";

/// 切换到 32 位标准编码的汇编指令
pub const DIRECTIVE_NORVC: &str = ".option norvc";

/// 恢复压缩 (16 位) 编码的汇编指令
pub const DIRECTIVE_RVC: &str = ".option rvc";

/// 指令行缩进
pub const INDENT: &str = "    ";

/// 可能出现在 CSR 类型指令中的控制/状态寄存器地址
pub const CSR_POOL: &[u16] = &[0x300, 0x301, 0x304, 0x305, 0x340, 0x341, 0x342];

/// harness 中缓冲区的 int 元素个数
pub const BUFFER_WORDS: usize = 1024;

/// 缓冲区指针指向的元素下标（缓冲区中部，正负偏移都落在缓冲区内）
pub const BUFFER_MIDPOINT: usize = 512;

/// 标准宽度指令的字节数
pub const STANDARD_WIDTH: i32 = 4;

/// 压缩指令的字节数
pub const COMPRESSED_WIDTH: i32 = 2;
