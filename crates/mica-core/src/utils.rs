//! 通用工具函数

/// 压缩空白：去掉首尾空白，内部连续空白折叠为单个空格
pub fn simplified(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 生成可以安全充当存储路径单段的名称
///
/// 先压缩空白，再把路径分隔符替换为下划线，防止患者/检查/系列名
/// 把输出文件写到存储树之外。
pub fn storage_component(input: &str) -> String {
    simplified(input)
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
