use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::OutputDefinition;
use crate::error::{Result, ReviewError};
use crate::instance::{Representation, RepresentationFiles};
use crate::sequence::assemble;
use crate::tags::ReviewTag;
use crate::temp_data::TempData;

pub const IMAGE_EXTS: &[&str] = &["exr", "jpg", "jpeg", "png", "dpx"];
pub const VIDEO_EXTS: &[&str] = &["mov", "mp4"];

/// File name suffix of an output: definition name, plus `_noHandles` when
/// handles are cut off.
pub fn output_suffix(output_def: &OutputDefinition, temp_data: &TempData) -> String {
    if temp_data.without_handles {
        format!("{}_noHandles", output_def.name)
    } else {
        output_def.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    /// Input for ffmpeg; a printf pattern for sequences.
    pub full_input_path: PathBuf,
    /// One real input file, used for probing.
    pub full_input_path_single_file: PathBuf,
    pub full_output_path: PathBuf,
    pub output_ext: String,
    pub output_ext_is_image: bool,
    pub output_is_sequence: bool,
}

/// Resolves input and output paths.
///
/// Inputs are read from the `source` staging directory, outputs are written
/// under the staging directory of `new_repre`. Sets `ext`, `files`,
/// `staging_dir` and, for sequence outputs, `sequence_file` on `new_repre`,
/// and creates the output directory.
pub fn input_output_paths(
    source: &Representation,
    new_repre: &mut Representation,
    output_def: &OutputDefinition,
    temp_data: &TempData,
) -> Result<ResolvedPaths> {
    let src_staging_dir = source.staging_dir.as_path();
    let dst_staging_dir = new_repre.staging_dir.clone();

    let (full_input_path, full_input_path_single_file, filename) =
        input_paths(source, src_staging_dir)?;

    let output_ext = match output_def.ext.as_deref().filter(|ext| !ext.is_empty()) {
        Some(ext) => ext.to_string(),
        None => full_input_path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.ext_clean().to_string()),
    };
    let output_ext = output_ext.trim_start_matches('.').to_string();
    debug!("New representation ext: `{}`", output_ext);

    let output_ext_is_image = IMAGE_EXTS.contains(&output_ext.to_lowercase().as_str());
    let output_is_sequence = output_ext_is_image && output_def.has_tag(&ReviewTag::Sequence);
    let suffix = output_suffix(output_def, temp_data);

    let full_output_path = if output_is_sequence {
        let frame_start = temp_data.output_frame_start;
        let frame_end = temp_data.output_frame_end;

        let filename_base = format!("{}_{}", filename, suffix);
        // "basename.%04d.exr" when the end frame is 1001
        let digits = frame_end.to_string().len();
        let repr_file = format!("{}.%0{}d.{}", filename_base, digits, output_ext);

        let files = (frame_start..=frame_end)
            .map(|frame| format!("{}.{:0width$}.{}", filename_base, frame, output_ext, width = digits))
            .collect();

        new_repre.files = RepresentationFiles::Sequence(files);
        new_repre.sequence_file = Some(repr_file.clone());
        dst_staging_dir.join(&filename_base).join(repr_file)
    } else {
        let repr_file = format!("{}_{}.{}", filename, suffix, output_ext);
        new_repre.files = RepresentationFiles::Single(repr_file.clone());
        dst_staging_dir.join(repr_file)
    };

    let output_dir = full_output_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(dst_staging_dir);
    if !output_dir.exists() {
        debug!("Creating dir: {}", output_dir.display());
        fs::create_dir_all(&output_dir)?;
    }

    new_repre.ext = output_ext.clone();
    new_repre.staging_dir = output_dir;

    debug!("Input path {}", full_input_path.display());
    debug!("Output path {}", full_output_path.display());

    Ok(ResolvedPaths {
        full_input_path,
        full_input_path_single_file,
        full_output_path,
        output_ext,
        output_ext_is_image,
        output_is_sequence,
    })
}

/// (input path, one real input file, base name for outputs)
fn input_paths(source: &Representation, staging_dir: &Path) -> Result<(PathBuf, PathBuf, String)> {
    match &source.files {
        RepresentationFiles::Sequence(files) => {
            let first = files.first().ok_or_else(|| {
                ReviewError::Unsupported(format!("representation \"{}\" has no files", source.name))
            })?;
            let (collections, _) = assemble(files);

            match collections.first() {
                Some(collection) => {
                    let head = collection.head.as_str();
                    let filename = head.strip_suffix('.').unwrap_or(head).to_string();
                    Ok((
                        staging_dir.join(collection.pattern()),
                        staging_dir.join(first),
                        filename,
                    ))
                }
                None => Ok((
                    staging_dir.join(first),
                    staging_dir.join(first),
                    file_stem(first),
                )),
            }
        }
        RepresentationFiles::Single(file) => {
            let path = staging_dir.join(file);
            Ok((path.clone(), path, file_stem(file)))
        }
    }
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}
