pub struct FileSizeUtils;

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

impl FileSizeUtils {
    pub fn format_size(size: u64) -> String {
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Byte multiplier for a unit name such as `"MB"` (1024-based, case-insensitive).
    pub fn unit_multiplier(unit: &str) -> Option<u64> {
        let unit = unit.trim().to_uppercase();
        UNITS
            .iter()
            .position(|u| *u == unit)
            .map(|index| 1024u64.pow(index as u32))
    }

    pub fn to_bytes(size: f64, unit: &str) -> Option<u64> {
        let multiplier = Self::unit_multiplier(unit)?;
        if !size.is_finite() || size < 0.0 {
            return None;
        }
        Some((size * multiplier as f64).floor() as u64)
    }
}
