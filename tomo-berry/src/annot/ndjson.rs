//! CryoET Data Portal 风格的 `.ndjson` 标注点读取.
//!
//! 文件每行一个 JSON 对象. 只有 `"type": "orientedPoint"` 且带
//! `location` 字段的行贡献标注点, 其余行被跳过; 空行忽略.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use super::OpenAnnotationError;
use crate::Pt3d;

/// 一行标注记录. 未知字段一律忽略.
#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "type")]
    kind: Option<String>,
    location: Option<Location>,
}

/// 世界坐标, portal 按 x/y/z 命名.
#[derive(Debug, Deserialize)]
struct Location {
    x: f64,
    y: f64,
    z: f64,
}

/// 读取 `.ndjson` 标注文件的所有点.
///
/// 世界坐标 (x, y, z) 逐点就近取整, 并精确重排为本 crate 的
/// (z, x, y) 轴序.
pub fn read_ndjson_points<P: AsRef<Path>>(path: P) -> Result<Vec<Pt3d>, OpenAnnotationError> {
    let file = File::open(path.as_ref()).map_err(OpenAnnotationError::Io)?;
    let reader = BufReader::new(file);

    let mut points = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(OpenAnnotationError::Io)?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).map_err(OpenAnnotationError::Json)?;
        if record.kind.as_deref() != Some("orientedPoint") {
            continue;
        }
        let Some(loc) = record.location else { continue };
        points.push((
            loc.z.round() as i64,
            loc.x.round() as i64,
            loc.y.round() as i64,
        ));
    }
    Ok(points)
}
