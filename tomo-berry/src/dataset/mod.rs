//! 数据集发现: 在目录树中按名字模式配对 tomogram 与标注文件.
//!
//! 发现逻辑与采样核心无关, 只负责产出未加载的 [`TomogramFile`] 列表.
//! 每个数据集家族 (不同仪器、不同命名习惯) 用一条 [`DiscoveryRule`]
//! 声明式描述, 由同一套遍历例程消费 — 不要把具体路径写进代码.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::annot::{AnnotationFile, OpenAnnotationError};
use crate::data::TomogramFile;

/// 文件/目录名模式.
///
/// 支持 `*` (任意长度, 含空) 与 `?` (恰好一个字符) 通配,
/// 其余字符逐一匹配, 全名匹配才算命中.
#[derive(Debug, Clone)]
pub struct NamePattern(String);

impl NamePattern {
    /// 由模式串构建.
    pub fn new<S: Into<String>>(pattern: S) -> Self {
        Self(pattern.into())
    }

    /// 判断 `name` 是否与模式完全匹配.
    pub fn matches(&self, name: &str) -> bool {
        glob_match(self.0.as_bytes(), name.as_bytes())
    }
}

/// 经典两指针通配匹配: 回溯到最近一个 `*` 重试.
fn glob_match(pattern: &[u8], name: &[u8]) -> bool {
    let (mut p, mut n) = (0usize, 0usize);
    let (mut star, mut mark) = (usize::MAX, 0usize);

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = p;
            mark = n;
            p += 1;
        } else if star != usize::MAX {
            p = star + 1;
            mark += 1;
            n = mark;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

/// 一条数据集发现规则.
///
/// 语义: 在 `root` 下递归寻找名字与 `dir_pattern` 匹配的目录;
/// 每个这样的目录里, `tomogram_pattern` 与每条标注模式都必须
/// **恰好命中一个** 文件, 否则跳过该目录. 命中的标注文件按位置
/// 取 `annotation_names` 中对应的显示名.
#[derive(Debug, Clone)]
pub struct DiscoveryRule {
    root: PathBuf,
    dir_pattern: NamePattern,
    tomogram_pattern: NamePattern,
    annotation_patterns: Vec<NamePattern>,
    annotation_names: Vec<String>,
}

impl DiscoveryRule {
    /// 构建规则.
    ///
    /// `annotation_patterns` 与 `annotation_names` 必须一一对应,
    /// 长度不一致时 panic.
    pub fn new<P: Into<PathBuf>>(
        root: P,
        dir_pattern: NamePattern,
        tomogram_pattern: NamePattern,
        annotation_patterns: Vec<NamePattern>,
        annotation_names: Vec<String>,
    ) -> Self {
        assert_eq!(
            annotation_patterns.len(),
            annotation_names.len(),
            "标注模式与显示名必须一一对应"
        );
        Self {
            root: root.into(),
            dir_pattern,
            tomogram_pattern,
            annotation_patterns,
            annotation_names,
        }
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// 数据集发现错误.
#[derive(Debug)]
pub enum DiscoverError {
    /// 目录遍历 I/O 错误.
    Io(io::Error),

    /// 配对出的标注文件无法解析. 坏标注不该被静默丢弃.
    Annotation {
        /// 出错的标注文件.
        path: PathBuf,
        /// 底层原因.
        source: OpenAnnotationError,
    },
}

/// 在 `root` 下递归收集名字与 `pattern` 匹配的目录.
///
/// 匹配到的目录也会被继续深入 (嵌套数据集). 结果按路径排序,
/// 与文件系统的遍历顺序无关.
pub fn seek_dirs(root: &Path, pattern: &NamePattern) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk_dirs(root, pattern, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk_dirs(dir: &Path, pattern: &NamePattern, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if pattern.matches(name) {
                found.push(path.clone());
            }
        }
        walk_dirs(&path, pattern, found)?;
    }
    Ok(())
}

/// 在 `dir` 下递归为每条模式寻找 **恰好一个** 匹配文件.
///
/// 任何模式命中第二个文件都会使整组配对失去唯一性, 返回 `None`;
/// 有模式一个都没命中时同样返回 `None`.
fn seek_set(dir: &Path, patterns: &[&NamePattern]) -> io::Result<Option<Vec<PathBuf>>> {
    let mut matches: Vec<Option<PathBuf>> = vec![None; patterns.len()];
    let mut stack = vec![dir.to_owned()];

    while let Some(cur) = stack.pop() {
        for entry in fs::read_dir(&cur)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            for (slot, pattern) in matches.iter_mut().zip(patterns) {
                if !pattern.matches(name) {
                    continue;
                }
                if slot.is_some() {
                    warn!("目录 {dir:?} 下模式 {pattern:?} 命中多个文件, 放弃该目录");
                    return Ok(None);
                }
                *slot = Some(path.clone());
            }
        }
    }

    if matches.iter().any(Option::is_none) {
        debug!("目录 {dir:?} 配对不完整, 跳过");
        return Ok(None);
    }
    // 刚检查过全部为 Some, 可直接 unwrap.
    Ok(Some(matches.into_iter().map(Option::unwrap).collect()))
}

/// 按一条规则发现所有配对完整的 tomogram.
///
/// 配对不完整或不唯一的目录被跳过; 配对成功但标注文件解析失败时
/// 整个发现过程以 [`DiscoverError::Annotation`] 失败. 返回的
/// [`TomogramFile`] 均未加载体数据.
pub fn discover(rule: &DiscoveryRule) -> Result<Vec<TomogramFile>, DiscoverError> {
    let mut tomograms = Vec::new();

    let dirs = seek_dirs(&rule.root, &rule.dir_pattern).map_err(DiscoverError::Io)?;
    for dir in dirs {
        let mut patterns = vec![&rule.tomogram_pattern];
        patterns.extend(rule.annotation_patterns.iter());

        let Some(found) = seek_set(&dir, &patterns).map_err(DiscoverError::Io)? else {
            continue;
        };

        let mut annotations = Vec::with_capacity(rule.annotation_names.len());
        for (path, name) in found[1..].iter().zip(&rule.annotation_names) {
            let file = AnnotationFile::open(path, name.clone()).map_err(|source| {
                DiscoverError::Annotation {
                    path: path.clone(),
                    source,
                }
            })?;
            annotations.push(file.into_annotation());
        }

        debug!("发现 tomogram {:?} (标注 {} 组)", found[0], annotations.len());
        tomograms.push(TomogramFile::new(&found[0], annotations));
    }
    Ok(tomograms)
}

/// 按一组规则依次发现, 结果按规则顺序拼接.
pub fn discover_all(rules: &[DiscoveryRule]) -> Result<Vec<TomogramFile>, DiscoverError> {
    let mut tomograms = Vec::new();
    for rule in rules {
        tomograms.append(&mut discover(rule)?);
    }
    Ok(tomograms)
}
