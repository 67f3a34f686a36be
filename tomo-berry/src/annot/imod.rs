//! IMOD 二进制模型 (`.mod`) 的最小读取实现.
//!
//! 只抽取本项目需要的内容: 模型头里的范围字段和所有 contour 点.
//! IMOD 模型的多字节值一律按 big-endian 存储. `OBJT`/`CONT`/`MESH`
//! 之外的块都带长度字, 按长度跳过; `IEOF` 终止解析.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::{Idx3d, Pt3d};

/// 模型头长度: 8 字节魔数/版本 + 128 字节名字 + 26 个 4 字节字段.
const MODEL_HEADER_LEN: usize = 8 + 128 + 104;

/// `OBJT` 块除标签外的长度.
const OBJECT_LEN: usize = 176;

/// 读取 IMOD 模型错误.
#[derive(Debug)]
pub enum ImodError {
    /// 魔数不是 `IMOD`.
    BadMagic([u8; 4]),

    /// 文件在期望位置之前截断, 或某个块的长度字段非法.
    Truncated,

    /// contour 点数为负.
    BadContourSize(i32),

    /// 底层 I/O 错误.
    Io(io::Error),
}

/// IMOD 模型中本项目关心的部分.
#[derive(Debug, Clone)]
pub struct ImodModel {
    /// 所有 contour 的点, 已取整并重排为本 crate 的 (z, x, y) 轴序.
    pub points: Vec<Pt3d>,

    /// 模型头声明的坐标范围 (zmax, xmax, ymax),
    /// 即所属 tomogram 的形状.
    pub implied_shape: Idx3d,
}

/// 读取 `.mod` 文件.
pub fn read_imod<P: AsRef<Path>>(path: P) -> Result<ImodModel, ImodError> {
    let mut raw = Vec::new();
    File::open(path.as_ref())
        .and_then(|mut f| f.read_to_end(&mut raw))
        .map_err(ImodError::Io)?;
    parse_imod(&raw)
}

/// 顺序读取游标.
struct Cursor<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ImodError> {
        let end = self.pos.checked_add(n).ok_or(ImodError::Truncated)?;
        if end > self.raw.len() {
            return Err(ImodError::Truncated);
        }
        let out = &self.raw[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn take_i32(&mut self) -> Result<i32, ImodError> {
        let b = self.take(4)?;
        // 长度刚好为 4, 转换不会失败.
        Ok(i32::from_be_bytes(b.try_into().unwrap()))
    }

    fn take_f32(&mut self) -> Result<f32, ImodError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes(b.try_into().unwrap()))
    }

    /// 按非负长度字段跳过 `n * elem` 字节.
    fn skip_counted(&mut self, n: i32, elem: usize) -> Result<(), ImodError> {
        if n < 0 {
            return Err(ImodError::Truncated);
        }
        let total = (n as usize).checked_mul(elem).ok_or(ImodError::Truncated)?;
        self.take(total).map(|_| ())
    }
}

/// 从完整的模型文件映像解析.
fn parse_imod(raw: &[u8]) -> Result<ImodModel, ImodError> {
    let mut cur = Cursor { raw, pos: 0 };

    let magic = cur.take(4)?;
    if magic != b"IMOD" {
        // 长度刚好为 4, 转换不会失败.
        return Err(ImodError::BadMagic(magic.try_into().unwrap()));
    }
    cur.take(4)?; // 版本号 (如 `V1.2`), 不校验.
    cur.take(128)?; // 模型名.

    let xmax = cur.take_i32()?;
    let ymax = cur.take_i32()?;
    let zmax = cur.take_i32()?;
    cur.take(MODEL_HEADER_LEN - cur.pos)?; // 其余头字段一并跳过.

    let implied_shape = (
        zmax.max(0) as usize,
        xmax.max(0) as usize,
        ymax.max(0) as usize,
    );

    let mut points = Vec::new();
    loop {
        let tag = match cur.take(4) {
            Ok(t) => t,
            // 没写 IEOF 就直接到尾的旧文件: 到此为止.
            Err(ImodError::Truncated) if cur.pos == raw.len() => break,
            Err(e) => return Err(e),
        };
        match tag {
            b"IEOF" => break,
            b"OBJT" => {
                cur.take(OBJECT_LEN)?;
            }
            b"CONT" => {
                let psize = cur.take_i32()?;
                if psize < 0 {
                    return Err(ImodError::BadContourSize(psize));
                }
                cur.take(12)?; // flags, time, surf.
                for _ in 0..psize {
                    let x = cur.take_f32()?;
                    let y = cur.take_f32()?;
                    let z = cur.take_f32()?;
                    points.push((z.round() as i64, x.round() as i64, y.round() as i64));
                }
            }
            b"MESH" => {
                let vsize = cur.take_i32()?;
                let lsize = cur.take_i32()?;
                cur.take(8)?; // flag, time/surf.
                cur.skip_counted(vsize, 12)?; // 顶点.
                cur.skip_counted(lsize, 4)?; // 索引.
            }
            _ => {
                // 其余块 (IMAT, MINX, VIEW, ...) 都带长度字.
                let len = cur.take_i32()?;
                cur.skip_counted(len, 1)?;
            }
        }
    }

    Ok(ImodModel { points, implied_shape })
}

#[cfg(test)]
mod tests {
    use super::{parse_imod, ImodError, MODEL_HEADER_LEN, OBJECT_LEN};

    /// 模型头: 魔数/版本 + 名字 + (xmax, ymax, zmax) + 其余字段置零.
    fn header(xmax: i32, ymax: i32, zmax: i32) -> Vec<u8> {
        let mut raw = Vec::with_capacity(MODEL_HEADER_LEN);
        raw.extend_from_slice(b"IMODV1.2");
        raw.extend_from_slice(&[0u8; 128]);
        raw.extend_from_slice(&xmax.to_be_bytes());
        raw.extend_from_slice(&ymax.to_be_bytes());
        raw.extend_from_slice(&zmax.to_be_bytes());
        raw.resize(MODEL_HEADER_LEN, 0);
        raw
    }

    fn objt() -> Vec<u8> {
        let mut raw = b"OBJT".to_vec();
        raw.resize(4 + OBJECT_LEN, 0);
        raw
    }

    fn cont(points: &[(f32, f32, f32)]) -> Vec<u8> {
        let mut raw = b"CONT".to_vec();
        raw.extend_from_slice(&(points.len() as i32).to_be_bytes());
        raw.extend_from_slice(&[0u8; 12]);
        for &(x, y, z) in points {
            raw.extend_from_slice(&x.to_be_bytes());
            raw.extend_from_slice(&y.to_be_bytes());
            raw.extend_from_slice(&z.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_parse_points_and_shape() {
        let mut raw = header(200, 100, 50);
        raw.extend_from_slice(&objt());
        raw.extend_from_slice(&cont(&[(3.0, 4.0, 5.0), (10.6, 20.2, 30.5)]));
        raw.extend_from_slice(b"IEOF");

        let model = parse_imod(&raw).unwrap();
        // 世界坐标 (x, y, z) 重排为 (z, x, y), 逐点就近取整.
        assert_eq!(model.points, vec![(5, 3, 4), (31, 11, 20)]);
        assert_eq!(model.implied_shape, (50, 200, 100));
    }

    /// 未知块按长度字跳过, 不影响点的抽取.
    #[test]
    fn test_parse_skips_unknown_chunks() {
        let mut raw = header(10, 10, 10);
        raw.extend_from_slice(&objt());
        raw.extend_from_slice(b"IMAT");
        raw.extend_from_slice(&8i32.to_be_bytes());
        raw.extend_from_slice(&[0xAB; 8]);
        raw.extend_from_slice(&cont(&[(1.0, 2.0, 3.0)]));
        // 没有 IEOF, 文件到此为止.

        let model = parse_imod(&raw).unwrap();
        assert_eq!(model.points, vec![(3, 1, 2)]);
    }

    #[test]
    fn test_parse_bad_magic() {
        let err = parse_imod(b"MODI####").unwrap_err();
        assert!(matches!(err, ImodError::BadMagic(m) if &m == b"MODI"));
    }

    #[test]
    fn test_parse_truncated_contour() {
        let mut raw = header(10, 10, 10);
        raw.extend_from_slice(&cont(&[(1.0, 2.0, 3.0)]));
        raw.truncate(raw.len() - 4); // 掐掉最后一个坐标.
        assert!(matches!(parse_imod(&raw).unwrap_err(), ImodError::Truncated));
    }
}
