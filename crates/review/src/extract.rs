use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{OutputDefinition, ReviewConfig};
use crate::convert::{create_transcode_dir, NoPreConversion, PreConverter};
use crate::encode::{build_ffmpeg_arguments, EncodeRequest, IMAGE_EXTS, VIDEO_EXTS};
use crate::error::{Result, ReviewError};
use crate::instance::{Instance, PublishContext, Representation, RepresentationFiles};
use crate::probe::{FfprobeProbe, StreamProbe};
use crate::profiles::{
    filter_outputs_by_families, filter_outputs_by_frames, filter_outputs_by_product_name,
    filter_outputs_by_tags, find_matching_profile,
};
use crate::runner::{run_checked, SubprocessRunner, ToolRunner};
use crate::sequence::{fill_sequence_gaps, FilledFrames};
use crate::tags::ReviewTag;
use crate::temp_data::prepare_temp_data;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducedOutput {
    pub source: String,
    pub output: String,
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// None when the whole instance was skipped.
    pub representation: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub outputs: Vec<ProducedOutput>,
    pub skipped: Vec<SkippedItem>,
    /// Names of `delete` tagged representations removed at the end.
    pub removed: Vec<String>,
}

impl ExtractionSummary {
    fn skip(&mut self, representation: Option<&str>, reason: impl Into<String>) {
        self.skipped.push(SkippedItem {
            representation: representation.map(str::to_string),
            reason: reason.into(),
        });
    }
}

fn is_supported_ext(ext: &str) -> bool {
    IMAGE_EXTS.contains(&ext) || VIDEO_EXTS.contains(&ext)
}

/// Produces review representations for instances.
pub struct ExtractReview {
    config: ReviewConfig,
    probe: Box<dyn StreamProbe>,
    runner: Box<dyn ToolRunner>,
    converter: Box<dyn PreConverter>,
    transcode_base_dir: Option<PathBuf>,
}

impl ExtractReview {
    pub fn new(config: ReviewConfig) -> Self {
        let probe = FfprobeProbe::new(config.ffprobe_path.clone());
        Self {
            config,
            probe: Box::new(probe),
            runner: Box::new(SubprocessRunner),
            converter: Box::new(NoPreConversion),
            transcode_base_dir: None,
        }
    }

    pub fn with_probe(mut self, probe: impl StreamProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_runner(mut self, runner: impl ToolRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn with_converter(mut self, converter: impl PreConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Parent directory for pre-conversion staging, system temp by default.
    pub fn with_transcode_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcode_base_dir = Some(dir.into());
        self
    }

    /// Appends review representations to `instance` and drops the ones
    /// tagged `delete` (unless also tagged `thumbnail`).
    pub fn process(&self, instance: &mut Instance, context: &PublishContext) -> Result<ExtractionSummary> {
        let mut summary = ExtractionSummary::default();

        if !instance.review {
            debug!("Review disabled on instance \"{}\"", instance.display_label());
            summary.skip(None, "review disabled");
            return Ok(summary);
        }

        // ffmpeg can't read multipart exrs
        if instance.multipart_exr {
            info!("Instance \"{}\" contain \"multipartExr\". Skipped.", instance.display_label());
            summary.skip(None, "multipart exr");
            return Ok(summary);
        }

        self.main_process(instance, context, &mut summary)?;

        let mut removed = Vec::new();
        instance.representations.retain(|repre| {
            let drop_it =
                repre.tags.contains(&ReviewTag::Delete) && !repre.tags.contains(&ReviewTag::Thumbnail);
            if drop_it {
                removed.push(repre.name.clone());
            }
            !drop_it
        });
        summary.removed = removed;

        Ok(summary)
    }

    fn main_process(
        &self,
        instance: &mut Instance,
        context: &PublishContext,
        summary: &mut ExtractionSummary,
    ) -> Result<()> {
        let family = instance.main_family().unwrap_or_default().to_string();
        info!("Host: \"{}\"", context.host_name);
        info!("Task: \"{}\"", context.task_name);
        info!("Family: \"{}\"", family);

        let Some(profile) = find_matching_profile(
            &self.config.profiles,
            &context.host_name,
            &context.task_name,
            &family,
        ) else {
            info!(
                "Skipped instance. None of profiles in presets are for Host: \"{}\" | Family: \"{}\" | Task \"{}\"",
                context.host_name, family, context.task_name
            );
            summary.skip(None, "no matching profile");
            return Ok(());
        };

        let families = instance.all_families();
        let outputs = filter_outputs_by_families(profile, &families);
        let outputs = filter_outputs_by_product_name(outputs, instance.product_name.as_deref());
        if outputs.is_empty() {
            info!(
                "Skipped instance. All output definitions from selected profile does not match to instance families. {:?}",
                families
            );
            summary.skip(None, "no output definition matches instance");
            return Ok(());
        }

        let sources: Vec<Representation> = instance.representations.clone();
        for repre in &sources {
            let Some(repre_outputs) = self.outputs_for_representation(repre, &outputs, summary) else {
                continue;
            };

            let Some(first_input) = repre.files.first().map(|f| repre.staging_dir.join(f)) else {
                info!("Repre: {} - Has no files. Skipping", repre.name);
                summary.skip(Some(repre.name.as_str()), "no files");
                continue;
            };

            let needs_conversion = match self.converter.needs_conversion(&first_input) {
                Some(needs) => needs,
                None => {
                    info!(
                        "Unable to detect if \"{}\" needs conversion. Skipping representation.",
                        first_input.display()
                    );
                    summary.skip(Some(repre.name.as_str()), "undetectable conversion requirement");
                    continue;
                }
            };

            // The working copy points at converted files; `repre` keeps the
            // original staging dir for outputs.
            let mut working = repre.clone();
            let transcode_dir = if needs_conversion {
                let dir = create_transcode_dir(self.transcode_base_dir.as_deref())?;
                debug!("Converting \"{}\" into {}", repre.name, dir.path().display());
                self.converter.convert(
                    &repre.files.paths_in(&repre.staging_dir),
                    dir.path(),
                    instance.frame_start,
                    instance.frame_end,
                )?;
                working.staging_dir = dir.path().to_path_buf();
                Some(dir)
            } else {
                None
            };

            let produced = self.render_outputs(instance, context, repre, &working, &repre_outputs, summary);
            drop(transcode_dir);

            instance.representations.extend(produced?);
        }

        Ok(())
    }

    fn outputs_for_representation<'a>(
        &self,
        repre: &Representation,
        outputs: &[&'a OutputDefinition],
        summary: &mut ExtractionSummary,
    ) -> Option<Vec<&'a OutputDefinition>> {
        if !repre.tags.contains(&ReviewTag::Review) {
            debug!("Repre: {} - Didn't found \"review\" in tags. Skipping", repre.name);
            summary.skip(Some(repre.name.as_str()), "not tagged review");
            return None;
        }
        for tag in [ReviewTag::Thumbnail, ReviewTag::Passing] {
            if repre.tags.contains(&tag) {
                debug!("Repre: {} - Found \"{}\" in tags. Skipping", repre.name, tag);
                summary.skip(Some(repre.name.as_str()), format!("tagged {}", tag));
                return None;
            }
        }

        let input_ext = repre.ext_clean().to_lowercase();
        if !is_supported_ext(&input_ext) {
            info!("Representation has unsupported extension \"{}\"", input_ext);
            summary.skip(Some(repre.name.as_str()), format!("unsupported extension {}", input_ext));
            return None;
        }

        let repre_outputs = filter_outputs_by_tags(outputs, &repre.tags);
        let repre_outputs = filter_outputs_by_frames(repre_outputs, repre, IMAGE_EXTS);
        if repre_outputs.is_empty() {
            info!(
                "Skipped representation. All output definitions from selected profile does not match to representation's tags. {:?}",
                repre.tags
            );
            summary.skip(Some(repre.name.as_str()), "no output definition matches representation");
            return None;
        }

        Some(repre_outputs)
    }

    fn render_outputs(
        &self,
        instance: &Instance,
        context: &PublishContext,
        repre: &Representation,
        working: &Representation,
        outputs: &[&OutputDefinition],
        summary: &mut ExtractionSummary,
    ) -> Result<Vec<Representation>> {
        let mut produced = Vec::new();

        for output_def in outputs {
            let mut new_repre = repre.clone();
            new_repre.tags.remove(&ReviewTag::Delete);
            new_repre.tags.extend(output_def.tags.iter().cloned());
            debug!("New representation tags: `{:?}`", new_repre.tags);

            let temp_data = prepare_temp_data(instance, context, working, output_def);

            let _filled = match (&working.files, self.config.fill_missing_frames) {
                (RepresentationFiles::Sequence(files), true) => {
                    debug!("Checking sequence to fill gaps in sequence..");
                    fill_sequence_gaps(
                        files,
                        &working.staging_dir,
                        temp_data.output_frame_start,
                        temp_data.output_frame_end,
                    )?
                }
                _ => FilledFrames::default(),
            };

            let request = EncodeRequest {
                ffmpeg_path: &self.config.ffmpeg_path,
                instance,
                source: working,
                output_def,
                temp_data: &temp_data,
                probe: self.probe.as_ref(),
            };

            let args = match build_ffmpeg_arguments(&request, &mut new_repre) {
                Ok(args) => args,
                Err(ReviewError::DivisionByZero(what)) => {
                    if working.ext_clean().to_lowercase().contains("exr") {
                        debug!("Unsupported compression on input files. Skipping!!!");
                        // Earlier outputs of this representation are dropped too
                        summary.outputs.retain(|output| output.source != repre.name);
                        summary.skip(Some(repre.name.as_str()), "unsupported exr compression");
                        return Ok(Vec::new());
                    }
                    return Err(ReviewError::Unsupported(format!("division by zero in {}", what)));
                }
                Err(e) => return Err(e),
            };

            let command = args.join(" ");
            debug!("Executing: {}", command);
            run_checked(self.runner.as_ref(), &args)?;

            let mut output_name = output_def.name.clone();
            if temp_data.without_handles {
                output_name.push_str("_noHandles");
            }

            new_repre.name = output_def.name.clone();
            new_repre.output_name = if new_repre.tags.contains(&ReviewTag::CleanName) {
                None
            } else {
                Some(output_name)
            };
            new_repre.output_def = Some(output_def.name.clone());
            new_repre.frame_start = Some(temp_data.output_frame_start);
            new_repre.frame_end = Some(temp_data.output_frame_end);
            new_repre.ffmpeg_cmd = Some(command.clone());

            debug!("Adding new representation: {}", new_repre.name);
            summary.outputs.push(ProducedOutput {
                source: repre.name.clone(),
                output: new_repre.name.clone(),
                command,
            });
            produced.push(new_repre);
        }

        Ok(produced)
    }
}
