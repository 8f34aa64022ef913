//! 体标识
//!
//! 由归一化元数据计算体分组键：同键的记录属于同一逻辑体，聚合为
//! 一个目录系列/输出单元。键是元数据的纯函数，不做任何IO，同样
//! 的输入在任何进程、任何区域设置下算出同样的键。

use mica_core::ImageMetadata;

/// 计算体分组键
///
/// 按固定顺序拼接患者名、检查id、系列id、量化方向、系列号、
/// 序列名、层厚、行数、列数。
pub fn volume_key(meta: &ImageMetadata) -> String {
    let mut key = String::new();
    key.push_str(&meta.patient_name);
    key.push_str(&meta.study_uid);
    key.push_str(&meta.series_uid);
    key.push_str(&quantize_orientation(&meta.orientation));
    key.push_str(&meta.series_number);
    key.push_str(&meta.sequence_name);
    key.push_str(&meta.slice_thickness);
    key.push_str(&meta.rows);
    key.push_str(&meta.columns);
    key
}

/// 方向量化
///
/// 同一采集的相邻切片方向余弦常在小数末位抖动，原样参与键会把
/// 一个体撕成多个系列。把每个分量收敛到5位有效数字后重新拼接，
/// 吸收阈值以下的浮点噪声。解析失败的分量按 0 处理。
pub fn quantize_orientation(raw: &str) -> String {
    raw.split_whitespace()
        .map(|component| format_significant(component.parse::<f64>().unwrap_or(0.0)))
        .collect()
}

/// 5位有效数字的确定性格式化（科学计数法，与区域设置无关）
fn format_significant(value: f64) -> String {
    format!("{value:.4e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_with_orientation(orientation: &str) -> ImageMetadata {
        ImageMetadata {
            patient_name: "DOE^JOHN".to_string(),
            study_uid: "1.2".to_string(),
            series_uid: "1.2.3".to_string(),
            orientation: orientation.to_string(),
            series_number: "2".to_string(),
            sequence_name: "tfl".to_string(),
            slice_thickness: "1.0".to_string(),
            rows: "256".to_string(),
            columns: "256".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sub_threshold_orientation_noise_is_absorbed() {
        // 第5位有效数字之后的差异不应分裂同一个体
        let a = volume_key(&meta_with_orientation("1.00002 0 0 0 1.00001 0"));
        let b = volume_key(&meta_with_orientation("1.00000 0 0 0 1.00000 0"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_third_digit_difference_changes_key() {
        let a = volume_key(&meta_with_orientation("1.01 0 0 0 1 0"));
        let b = volume_key(&meta_with_orientation("1.00 0 0 0 1 0"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_deterministic() {
        let meta = meta_with_orientation("0.999999 0 0 0 1 0");
        assert_eq!(volume_key(&meta), volume_key(&meta));
    }

    #[test]
    fn test_distinct_identity_fields_change_key() {
        let base = meta_with_orientation("1 0 0 0 1 0");
        let mut other = base.clone();
        other.series_uid = "9.9.9".to_string();
        assert_ne!(volume_key(&base), volume_key(&other));
    }

    #[test]
    fn test_unparsable_components_quantize_to_zero() {
        assert_eq!(quantize_orientation("abc"), format!("{:.4e}", 0.0));
        assert_eq!(quantize_orientation(""), "");
    }
}
