//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Face, Idx3d, Point3};
pub use crate::{Mesh, OrientationReport, ScalarVolume};

pub use crate::clinical::{clinical_index, resolve_creatinine, ClinicalResult};
pub use crate::config::PipelineConfig;
pub use crate::error::{AnalysisError, AnalysisResult, AtStage, ErrorKind, Failure, Stage};
pub use crate::isosurface::{marching_cubes, MarchingCubes};
pub use crate::pipeline::{Pipeline, StructuralOutcome, VolumeAnalysis};
pub use crate::report::{AnalysisRecord, ErrorRecord, FlatMesh, ResultAssembler};
pub use crate::segment::{default_staging_root, CommandSegmenter, PassThrough, Segmenter, StagingDir};
pub use crate::structural::{RoughnessBand, StructuralResult, VariabilityBand};
pub use crate::volume::{ThresholdPolicy, VolumeMethod};
