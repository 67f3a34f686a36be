//! MRC2014 格式 3D 体数据读取.
//!
//! 只实现本项目需要的最小子集: 单体 3D 图像, 体素编码 mode 0/1/2/6.
//! 多字节值按 MRC2014 惯例取 little-endian; 扩展头按 `nsymbt` 跳过.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::warn;
use ndarray::Array3;

/// MRC 主头固定长度 (字节).
const HEADER_LEN: usize = 1024;

/// 头部 `MAP ` 标识字的字节偏移 (word 53).
const MAP_ID_OFFSET: usize = 208;

/// 读取 MRC 文件错误.
#[derive(Debug)]
pub enum MrcError {
    /// 文件在期望位置之前截断. 携带 (期望字节数, 实际字节数).
    Truncated(usize, usize),

    /// 头部尺寸字段非法 (负数或相乘溢出). 携带 (nx, ny, nz).
    BadDimensions(i32, i32, i32),

    /// 不支持的体素编码模式.
    UnsupportedMode(i32),

    /// 底层 I/O 错误.
    Io(io::Error),
}

/// 读出头部第 `word` 个 4 字节字 (little-endian 有符号整数).
#[inline]
fn i32_at(header: &[u8], word: usize) -> i32 {
    let off = word * 4;
    // 长度刚好为 4, 转换不会失败.
    i32::from_le_bytes(header[off..off + 4].try_into().unwrap())
}

/// 读取 `.mrc`/`.rec` 文件为 `f32` 体数据.
///
/// 文件内体素按 (z, y, x) 行主序存储; 返回前换轴成本 crate 的
/// (z, x, y) 约定并恢复行主布局. 体素值一律加宽为 `f32`.
pub fn read_mrc<P: AsRef<Path>>(path: P) -> Result<Array3<f32>, MrcError> {
    let mut raw = Vec::new();
    File::open(path.as_ref())
        .and_then(|mut f| f.read_to_end(&mut raw))
        .map_err(MrcError::Io)?;
    parse_mrc(&raw)
}

/// 从完整的 MRC 文件映像解析体数据.
fn parse_mrc(raw: &[u8]) -> Result<Array3<f32>, MrcError> {
    if raw.len() < HEADER_LEN {
        return Err(MrcError::Truncated(HEADER_LEN, raw.len()));
    }
    let header = &raw[..HEADER_LEN];

    let (nx, ny, nz) = (i32_at(header, 0), i32_at(header, 1), i32_at(header, 2));
    let mode = i32_at(header, 3);
    let nsymbt = i32_at(header, 23);
    if nx < 0 || ny < 0 || nz < 0 || nsymbt < 0 {
        return Err(MrcError::BadDimensions(nx, ny, nz));
    }

    // 2014 标准要求 word 53 为 `MAP `; 一些旧软件写出的文件没有.
    // 对这类文件只告警, 仍按 little-endian 继续解析.
    let map_id = &header[MAP_ID_OFFSET..MAP_ID_OFFSET + 4];
    if map_id != b"MAP " && map_id != &[0u8; 4] {
        warn!("MRC 头部 MAP 标识异常: {map_id:?}");
    }

    let (nxu, nyu, nzu) = (nx as usize, ny as usize, nz as usize);
    let voxels = nxu
        .checked_mul(nyu)
        .and_then(|v| v.checked_mul(nzu))
        .ok_or(MrcError::BadDimensions(nx, ny, nz))?;

    let elem = match mode {
        0 => 1, // i8
        1 => 2, // i16
        2 => 4, // f32
        6 => 2, // u16
        m => return Err(MrcError::UnsupportedMode(m)),
    };

    let data_offset = HEADER_LEN
        .checked_add(nsymbt as usize)
        .ok_or(MrcError::Truncated(usize::MAX, raw.len()))?;
    let need = voxels
        .checked_mul(elem)
        .and_then(|n| n.checked_add(data_offset))
        .ok_or(MrcError::BadDimensions(nx, ny, nz))?;
    if raw.len() < need {
        return Err(MrcError::Truncated(need, raw.len()));
    }
    let body = &raw[data_offset..need];

    let mut values = Vec::with_capacity(voxels);
    match mode {
        0 => values.extend(body.iter().map(|&b| b as i8 as f32)),
        1 => values.extend(
            body.chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32),
        ),
        2 => values.extend(
            body.chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        ),
        6 => values.extend(
            body.chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as f32),
        ),
        _ => unreachable!(),
    }

    // 该操作不会生成 `Err`, 可直接 unwrap: 体素个数与形状一致.
    let data = Array3::from_shape_vec((nzu, nyu, nxu), values)
        .unwrap()
        .permuted_axes([0, 2, 1]);

    Ok(data.as_standard_layout().to_owned())
}

#[cfg(test)]
mod tests {
    use super::{parse_mrc, MrcError, HEADER_LEN};

    /// 拼一个最小 MRC 映像: 给定尺寸、模式和数据体字节.
    fn make_mrc(nx: i32, ny: i32, nz: i32, mode: i32, body: &[u8]) -> Vec<u8> {
        let mut raw = vec![0u8; HEADER_LEN];
        raw[0..4].copy_from_slice(&nx.to_le_bytes());
        raw[4..8].copy_from_slice(&ny.to_le_bytes());
        raw[8..12].copy_from_slice(&nz.to_le_bytes());
        raw[12..16].copy_from_slice(&mode.to_le_bytes());
        raw[208..212].copy_from_slice(b"MAP ");
        raw.extend_from_slice(body);
        raw
    }

    #[test]
    fn test_parse_mode2() {
        // (nz, ny, nx) = (4, 3, 2), 体素值即其行主序线性下标.
        let (nx, ny, nz) = (2usize, 3usize, 4usize);
        let mut body = Vec::new();
        for idx in 0..(nx * ny * nz) {
            body.extend_from_slice(&(idx as f32).to_le_bytes());
        }
        let data = parse_mrc(&make_mrc(2, 3, 4, 2, &body)).unwrap();

        // 换轴后形状为 (z, x, y).
        assert_eq!(data.dim(), (4, 2, 3));
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let linear = (z * ny + y) * nx + x;
                    assert_eq!(data[(z, x, y)], linear as f32);
                }
            }
        }
    }

    #[test]
    fn test_parse_mode1() {
        let body: Vec<u8> = [-3i16, 0, 7, 1, 2, 5]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let data = parse_mrc(&make_mrc(1, 2, 3, 1, &body)).unwrap();
        assert_eq!(data.dim(), (3, 1, 2));
        assert_eq!(data[(0, 0, 0)], -3.0);
        assert_eq!(data[(2, 0, 1)], 5.0);
    }

    #[test]
    fn test_unsupported_mode() {
        let err = parse_mrc(&make_mrc(1, 1, 1, 3, &[0; 8])).unwrap_err();
        assert!(matches!(err, MrcError::UnsupportedMode(3)));
    }

    #[test]
    fn test_truncated() {
        let err = parse_mrc(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, MrcError::Truncated(_, 100)));

        // 头声称的数据量比实际多.
        let err = parse_mrc(&make_mrc(10, 10, 10, 2, &[0; 16])).unwrap_err();
        assert!(matches!(err, MrcError::Truncated(..)));
    }

    #[test]
    fn test_bad_dimensions() {
        let err = parse_mrc(&make_mrc(-1, 4, 4, 2, &[])).unwrap_err();
        assert!(matches!(err, MrcError::BadDimensions(-1, 4, 4)));
    }
}
