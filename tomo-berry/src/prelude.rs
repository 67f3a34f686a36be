//! 涵盖本 crate 一系列常用功能的一站式导入.

pub use crate::{Idx3d, Pt3d};

pub use crate::bounds::{array_contains, region_contains};

pub use crate::data::{
    read_volume, stretch_contrast, Annotation, ExtractError, OpenTomogramError, Subtomogram,
    Tomogram, TomogramFile,
};

pub use crate::annot::{implied_tomogram_shape, AnnotationFile, OpenAnnotationError};

pub use crate::sample::{SampleError, SampleResult, SubtomogramGenerator};

pub use crate::consts::{DEFAULT_MAX_ATTEMPTS, DEFAULT_PADS, DEFAULT_VOL_SHAPE};

pub use crate::dataset::{self, DiscoverError, DiscoveryRule, NamePattern};
