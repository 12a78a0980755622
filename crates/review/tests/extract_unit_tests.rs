use review_core::config::{FfmpegArgs, OutputDefinition, Profile, ReviewConfig};
use review_core::convert::{PreConverter, TRANSCODE_DIR_PREFIX};
use review_core::probe::{ProbeStream, StreamProbe};
use review_core::report::{load_report, save_report, ExtractionReport};
use review_core::runner::{ToolOutput, ToolRunner};
use review_core::{
    ExtractReview, Instance, PublishContext, Representation, RepresentationFiles, ReviewError,
    ReviewTag, TagSet,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

struct FixedProbe(u32, u32);

impl StreamProbe for FixedProbe {
    fn streams(&self, _path: &Path) -> review_core::Result<Vec<ProbeStream>> {
        Ok(vec![ProbeStream {
            index: 0,
            codec_type: Some("video".to_string()),
            codec_name: None,
            width: Some(self.0),
            height: Some(self.1),
        }])
    }
}

/// Records every command; optionally checks a file exists while running.
#[derive(Clone, Default)]
struct RecordingRunner {
    calls: Rc<RefCell<Vec<Vec<String>>>>,
    exit_code: i32,
    watch: Option<PathBuf>,
    watched_existed: Rc<RefCell<Vec<bool>>>,
}

impl ToolRunner for RecordingRunner {
    fn run(&self, args: &[String]) -> review_core::Result<ToolOutput> {
        self.calls.borrow_mut().push(args.to_vec());
        if let Some(path) = &self.watch {
            self.watched_existed.borrow_mut().push(path.is_file());
        }
        Ok(ToolOutput {
            code: Some(self.exit_code),
            output: "frame=  20 fps=0.0".to_string(),
        })
    }
}

/// Marks every input as needing conversion and remembers the staging dir.
#[derive(Clone, Default)]
struct CopyConverter {
    detectable: bool,
    dest_dirs: Rc<RefCell<Vec<PathBuf>>>,
}

impl PreConverter for CopyConverter {
    fn needs_conversion(&self, _path: &Path) -> Option<bool> {
        self.detectable.then_some(true)
    }

    fn convert(
        &self,
        inputs: &[PathBuf],
        dest_dir: &Path,
        _frame_start: i64,
        _frame_end: i64,
    ) -> review_core::Result<()> {
        for input in inputs {
            if let Some(name) = input.file_name() {
                fs::write(dest_dir.join(name), b"converted")?;
            }
        }
        self.dest_dirs.borrow_mut().push(dest_dir.to_path_buf());
        Ok(())
    }
}

fn context() -> PublishContext {
    PublishContext {
        host_name: "nuke".to_string(),
        task_name: "comp".to_string(),
        handle_start: 0,
        handle_end: 0,
    }
}

fn h264_output() -> OutputDefinition {
    OutputDefinition {
        name: "h264".to_string(),
        ext: Some("mov".to_string()),
        tags: ["burnin", "ftrackreview"].into_iter().collect(),
        ffmpeg_args: FfmpegArgs {
            output: vec!["-pix_fmt yuv420p".to_string()],
            ..Default::default()
        },
        ..Default::default()
    }
}

fn config(outputs: Vec<OutputDefinition>) -> ReviewConfig {
    ReviewConfig {
        profiles: vec![Profile {
            hosts: vec!["nuke".to_string()],
            outputs,
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn png_sequence(staging_dir: &Path, frames: std::ops::RangeInclusive<i64>, tags: &[&str]) -> Representation {
    Representation {
        name: "png".to_string(),
        ext: "png".to_string(),
        files: RepresentationFiles::Sequence(frames.map(|f| format!("a.{:04}.png", f)).collect()),
        staging_dir: staging_dir.to_path_buf(),
        tags: tags.iter().copied().collect::<TagSet>(),
        resolution_width: None,
        resolution_height: None,
        frame_start: None,
        frame_end: None,
        output_name: None,
        output_def: None,
        sequence_file: None,
        ffmpeg_cmd: None,
    }
}

fn instance(representations: Vec<Representation>) -> Instance {
    Instance {
        name: "renderCompMain".to_string(),
        label: Some("sh010 renderCompMain".to_string()),
        family: Some("render".to_string()),
        families: vec!["review".to_string()],
        product_name: Some("renderCompMain".to_string()),
        frame_start: 1001,
        frame_end: 1010,
        handle_start: Some(5),
        handle_end: Some(5),
        fps: 24.0,
        resolution_width: Some(1920),
        resolution_height: Some(1080),
        pixel_aspect: 1.0,
        representations,
        audio: Vec::new(),
        lut_path: None,
        frame_start_ftrack: None,
        review: true,
        multipart_exr: false,
        anatomy_data: BTreeMap::new(),
    }
}

#[test]
fn test_sequence_with_handles_to_movie() {
    let stage = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    let summary = extractor.process(&mut instance, &context()).unwrap();

    assert_eq!(summary.outputs.len(), 1);
    assert!(summary.skipped.is_empty());
    assert!(summary.removed.is_empty());

    let calls = runner.calls.borrow();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    assert_eq!(args[0], "\"ffmpeg\"");
    assert_eq!(args[1], "-start_number 996");
    assert_eq!(args[2], "-framerate 24");
    assert_eq!(args[3], "-to 0.8333333333");
    assert_eq!(args[4], format!("-i \"{}\"", stage.path().join("a.%04d.png").display()));
    assert_eq!(args[5], "-pix_fmt yuv420p");
    assert_eq!(args[6], "-y");
    assert_eq!(args[7], format!("\"{}\"", stage.path().join("a_h264.mov").display()));

    assert_eq!(instance.representations.len(), 2);
    let produced = &instance.representations[1];
    assert_eq!(produced.name, "h264");
    assert_eq!(produced.output_name.as_deref(), Some("h264"));
    assert_eq!(produced.output_def.as_deref(), Some("h264"));
    assert_eq!(produced.ext, "mov");
    assert_eq!(produced.files, RepresentationFiles::Single("a_h264.mov".to_string()));
    assert_eq!((produced.frame_start, produced.frame_end), (Some(996), Some(1015)));
    assert_eq!((produced.resolution_width, produced.resolution_height), (Some(1920), Some(1080)));
    assert!(produced.tags.contains(&ReviewTag::Review));
    assert!(produced.tags.contains(&ReviewTag::Custom("ftrackreview".to_string())));
    assert_eq!(produced.ffmpeg_cmd.as_deref(), Some(summary.outputs[0].command.as_str()));
}

#[test]
fn test_delete_tagged_source_is_removed() {
    let stage = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone());

    let mut instance = instance(vec![
        png_sequence(stage.path(), 996..=1015, &["review", "delete"]),
        png_sequence(stage.path(), 996..=1015, &["thumbnail", "delete"]),
    ]);
    let summary = extractor.process(&mut instance, &context()).unwrap();

    assert_eq!(summary.removed, vec!["png".to_string()]);
    let names: Vec<&str> = instance.representations.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["png", "h264"]);
    // The kept source is the thumbnail one
    assert!(instance.representations[0].tags.contains(&ReviewTag::Thumbnail));
    assert!(!instance.representations[1].tags.contains(&ReviewTag::Delete));
}

#[test]
fn test_clean_name_and_no_handles() {
    let stage = tempfile::tempdir().unwrap();
    let output_def = OutputDefinition {
        name: "edit".to_string(),
        ext: Some("mov".to_string()),
        tags: ["no-handles", "clean_name"].into_iter().collect(),
        ..Default::default()
    };
    let extractor = ExtractReview::new(config(vec![output_def]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(RecordingRunner::default());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    extractor.process(&mut instance, &context()).unwrap();

    let produced = &instance.representations[1];
    assert_eq!(produced.output_name, None);
    assert_eq!((produced.frame_start, produced.frame_end), (Some(1001), Some(1010)));
    assert_eq!(
        produced.files,
        RepresentationFiles::Single("a_edit_noHandles.mov".to_string())
    );
}

#[test]
fn test_no_handles_suffix_on_file_and_output_name() {
    let stage = tempfile::tempdir().unwrap();
    let output_def = OutputDefinition {
        name: "edit".to_string(),
        ext: Some("mov".to_string()),
        tags: ["no-handles"].into_iter().collect(),
        ..Default::default()
    };
    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![output_def]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    extractor.process(&mut instance, &context()).unwrap();

    let produced = &instance.representations[1];
    assert_eq!(produced.name, "edit");
    assert_eq!(produced.output_name.as_deref(), Some("edit_noHandles"));
    assert_eq!(
        produced.files,
        RepresentationFiles::Single("a_edit_noHandles.mov".to_string())
    );
    let calls = runner.calls.borrow();
    assert_eq!(
        calls[0].last().unwrap(),
        &format!("\"{}\"", stage.path().join("a_edit_noHandles.mov").display())
    );
}

#[test]
fn test_missing_frames_filled_during_run() {
    let stage = tempfile::tempdir().unwrap();
    let frames: Vec<i64> = (996..=1015).filter(|f| *f != 1005).collect();
    let files: Vec<String> = frames.iter().map(|f| format!("a.{:04}.png", f)).collect();
    for file in &files {
        fs::write(stage.path().join(file), file.as_bytes()).unwrap();
    }
    let hole = stage.path().join("a.1005.png");

    let mut source = png_sequence(stage.path(), 996..=1015, &["review"]);
    source.files = RepresentationFiles::Sequence(files);

    let runner = RecordingRunner {
        watch: Some(hole.clone()),
        ..Default::default()
    };
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone());

    let mut instance = instance(vec![source]);
    extractor.process(&mut instance, &context()).unwrap();

    assert_eq!(*runner.watched_existed.borrow(), vec![true]);
    assert!(!hole.exists());
}

#[test]
fn test_pre_converted_sources_are_cleaned_up() {
    let stage = tempfile::tempdir().unwrap();
    let transcode_base = tempfile::tempdir().unwrap();
    let converter = CopyConverter {
        detectable: true,
        ..Default::default()
    };
    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone())
        .with_converter(converter.clone())
        .with_transcode_dir(transcode_base.path());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    extractor.process(&mut instance, &context()).unwrap();

    let dest_dirs = converter.dest_dirs.borrow();
    assert_eq!(dest_dirs.len(), 1);
    let dest = &dest_dirs[0];
    assert!(dest
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with(TRANSCODE_DIR_PREFIX));
    assert!(!dest.exists());
    assert_eq!(fs::read_dir(transcode_base.path()).unwrap().count(), 0);

    // Input is read from the converted copy, output stays in the staging dir
    let args = &runner.calls.borrow()[0];
    assert_eq!(args[4], format!("-i \"{}\"", dest.join("a.%04d.png").display()));
    assert_eq!(args[7], format!("\"{}\"", stage.path().join("a_h264.mov").display()));
    assert_eq!(instance.representations[1].staging_dir, stage.path());
}

#[test]
fn test_undetectable_conversion_skips_representation() {
    let stage = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone())
        .with_converter(CopyConverter::default());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    let summary = extractor.process(&mut instance, &context()).unwrap();

    assert!(runner.calls.borrow().is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].representation.as_deref(), Some("png"));
    assert_eq!(instance.representations.len(), 1);
}

#[test]
fn test_unreadable_exr_is_skipped() {
    let stage = tempfile::tempdir().unwrap();
    let mut source = png_sequence(stage.path(), 996..=1015, &["review"]);
    source.name = "exr".to_string();
    source.ext = "exr".to_string();
    source.files = RepresentationFiles::Sequence((996..=1015).map(|f| format!("a.{:04}.exr", f)).collect());

    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(0, 0))
        .with_runner(runner.clone());

    let mut instance = instance(vec![source]);
    let summary = extractor.process(&mut instance, &context()).unwrap();

    assert!(runner.calls.borrow().is_empty());
    assert!(summary.outputs.is_empty());
    assert_eq!(summary.skipped[0].reason, "unsupported exr compression");
    assert_eq!(instance.representations.len(), 1);
}

#[test]
fn test_zero_resolution_on_other_inputs_fails() {
    let stage = tempfile::tempdir().unwrap();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(0, 0))
        .with_runner(RecordingRunner::default());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    let result = extractor.process(&mut instance, &context());
    assert!(matches!(result, Err(ReviewError::Unsupported(_))));
}

#[test]
fn test_tool_failure_is_propagated() {
    let stage = tempfile::tempdir().unwrap();
    let runner = RecordingRunner {
        exit_code: 1,
        ..Default::default()
    };
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner);

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    match extractor.process(&mut instance, &context()) {
        Err(ReviewError::ToolFailed { tool, code, output }) => {
            assert_eq!(tool, "ffmpeg");
            assert_eq!(code, Some(1));
            assert!(output.contains("frame="));
        }
        other => panic!("expected tool failure, got {:?}", other),
    }
}

#[test]
fn test_tool_failure_removes_transcode_dir() {
    let stage = tempfile::tempdir().unwrap();
    let transcode_base = tempfile::tempdir().unwrap();
    let converter = CopyConverter {
        detectable: true,
        ..Default::default()
    };
    let runner = RecordingRunner {
        exit_code: 1,
        ..Default::default()
    };
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone())
        .with_converter(converter.clone())
        .with_transcode_dir(transcode_base.path());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    let result = extractor.process(&mut instance, &context());

    assert!(matches!(result, Err(ReviewError::ToolFailed { .. })));
    assert_eq!(runner.calls.borrow().len(), 1);
    assert_eq!(converter.dest_dirs.borrow().len(), 1);
    assert!(!converter.dest_dirs.borrow()[0].exists());
    assert_eq!(fs::read_dir(transcode_base.path()).unwrap().count(), 0);
}

#[test]
fn test_tool_failure_removes_filled_frames() {
    let stage = tempfile::tempdir().unwrap();
    let frames: Vec<i64> = (996..=1015).filter(|f| *f != 1005).collect();
    let files: Vec<String> = frames.iter().map(|f| format!("a.{:04}.png", f)).collect();
    for file in &files {
        fs::write(stage.path().join(file), file.as_bytes()).unwrap();
    }
    let hole = stage.path().join("a.1005.png");

    let mut source = png_sequence(stage.path(), 996..=1015, &["review"]);
    source.files = RepresentationFiles::Sequence(files.clone());

    let runner = RecordingRunner {
        exit_code: 1,
        watch: Some(hole.clone()),
        ..Default::default()
    };
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone());

    let mut instance = instance(vec![source]);
    let result = extractor.process(&mut instance, &context());

    assert!(matches!(result, Err(ReviewError::ToolFailed { .. })));
    assert_eq!(*runner.watched_existed.borrow(), vec![true]);
    assert!(!hole.exists());
    assert_eq!(fs::read_dir(stage.path()).unwrap().count(), files.len());
}

/// Reports a resolution for the first input only.
#[derive(Default)]
struct FirstReadableProbe {
    reads: Cell<u32>,
}

impl StreamProbe for FirstReadableProbe {
    fn streams(&self, path: &Path) -> review_core::Result<Vec<ProbeStream>> {
        let reads = self.reads.get();
        self.reads.set(reads + 1);
        if reads == 0 {
            FixedProbe(1920, 1080).streams(path)
        } else {
            FixedProbe(0, 0).streams(path)
        }
    }
}

#[test]
fn test_unreadable_exr_drops_earlier_outputs() {
    let stage = tempfile::tempdir().unwrap();
    let mut source = png_sequence(stage.path(), 996..=1015, &["review"]);
    source.name = "exr".to_string();
    source.ext = "exr".to_string();
    source.files = RepresentationFiles::Sequence((996..=1015).map(|f| format!("a.{:04}.exr", f)).collect());

    let mut proxy = h264_output();
    proxy.name = "proxy".to_string();
    proxy.width = 960;
    proxy.height = 540;

    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output(), proxy]))
        .with_probe(FirstReadableProbe::default())
        .with_runner(runner.clone());

    let mut instance = instance(vec![source]);
    let summary = extractor.process(&mut instance, &context()).unwrap();

    // First output ran before the second hit the unreadable input
    assert_eq!(runner.calls.borrow().len(), 1);
    assert!(summary.outputs.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].representation.as_deref(), Some("exr"));
    assert_eq!(summary.skipped[0].reason, "unsupported exr compression");
    assert_eq!(instance.representations.len(), 1);
}

#[test]
fn test_instance_level_skips() {
    let stage = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone());

    let mut disabled = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    disabled.review = false;
    let summary = extractor.process(&mut disabled, &context()).unwrap();
    assert_eq!(summary.skipped[0].representation, None);

    let mut multipart = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    multipart.multipart_exr = true;
    extractor.process(&mut multipart, &context()).unwrap();

    let mut other_host = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    let context = PublishContext {
        host_name: "maya".to_string(),
        ..context()
    };
    let summary = extractor.process(&mut other_host, &context).unwrap();
    assert_eq!(summary.skipped[0].reason, "no matching profile");

    assert!(runner.calls.borrow().is_empty());
}

#[test]
fn test_untagged_and_unsupported_representations_are_skipped() {
    let stage = tempfile::tempdir().unwrap();
    let runner = RecordingRunner::default();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(runner.clone());

    let mut not_review = png_sequence(stage.path(), 996..=1015, &["burnin"]);
    not_review.name = "plain".to_string();
    let mut tiff = png_sequence(stage.path(), 996..=1015, &["review"]);
    tiff.name = "tiff".to_string();
    tiff.ext = "tif".to_string();

    let mut instance = instance(vec![not_review, tiff]);
    let summary = extractor.process(&mut instance, &context()).unwrap();

    assert!(runner.calls.borrow().is_empty());
    let skipped: Vec<Option<&str>> = summary
        .skipped
        .iter()
        .map(|s| s.representation.as_deref())
        .collect();
    assert_eq!(skipped, vec![Some("plain"), Some("tiff")]);
}

#[test]
fn test_report_round_trip() {
    let stage = tempfile::tempdir().unwrap();
    let reports = tempfile::tempdir().unwrap();
    let extractor = ExtractReview::new(config(vec![h264_output()]))
        .with_probe(FixedProbe(1920, 1080))
        .with_runner(RecordingRunner::default());

    let mut instance = instance(vec![png_sequence(stage.path(), 996..=1015, &["review"])]);
    let mut report = ExtractionReport::start(&instance, &context());
    let summary = extractor.process(&mut instance, &context()).unwrap();
    report.finish(Ok(summary.clone()));

    let path = save_report(&report, reports.path()).unwrap();
    assert_eq!(path, reports.path().join(format!("{}.json", report.id)));

    let loaded = load_report(&path).unwrap();
    assert_eq!(loaded.id, report.id);
    assert_eq!(loaded.instance_name, "renderCompMain");
    assert_eq!(loaded.summary, summary);
    assert!(loaded.finished_at.is_some());
    assert!(loaded.error.is_none());
}
