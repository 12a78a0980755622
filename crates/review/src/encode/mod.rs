pub mod audio;
pub mod common;
pub mod letterbox;
pub mod paths;
pub mod rescale;

pub use paths::{input_output_paths, output_suffix, ResolvedPaths, IMAGE_EXTS, VIDEO_EXTS};

use tracing::debug;

use crate::config::OutputDefinition;
use crate::error::{Result, ReviewError};
use crate::instance::{Instance, Representation};
use crate::probe::StreamProbe;
use crate::temp_data::TempData;

use self::audio::audio_args;
use self::common::{
    background_filters, fill_output_args, format_seconds, lut_filters, non_empty, template_data,
};
use self::rescale::rescaling_filters;

/// Everything needed to build the arguments of one output.
pub struct EncodeRequest<'a> {
    pub ffmpeg_path: &'a str,
    pub instance: &'a Instance,
    /// Representation the input is read from.
    pub source: &'a Representation,
    pub output_def: &'a OutputDefinition,
    pub temp_data: &'a TempData,
    pub probe: &'a dyn StreamProbe,
}

/// Builds the full argument list for one output and fills the output
/// fields (`files`, `ext`, `staging_dir`, resolution) of `new_repre`.
pub fn build_ffmpeg_arguments(
    request: &EncodeRequest<'_>,
    new_repre: &mut Representation,
) -> Result<Vec<String>> {
    let output_def = request.output_def;
    let temp_data = request.temp_data;
    let raw_args = &output_def.ffmpeg_args;

    let mut input_args = non_empty(&raw_args.input);
    let mut output_args = non_empty(&raw_args.output);
    let mut video_filters = non_empty(&raw_args.video_filters);
    let mut audio_filters = non_empty(&raw_args.audio_filters);

    let paths = input_output_paths(request.source, new_repre, output_def, temp_data)?;

    let fill_data = template_data(
        request.instance,
        &output_suffix(output_def, temp_data),
        &paths.output_ext,
    );
    output_args = fill_output_args(output_args, &fill_data);

    let output_frames_len = if paths.output_ext_is_image && !paths.output_is_sequence {
        1
    } else {
        temp_data.output_frame_end - temp_data.output_frame_start + 1
    };

    if temp_data.fps == 0.0 {
        return Err(ReviewError::DivisionByZero("duration from fps"));
    }
    let duration_seconds = output_frames_len as f64 / temp_data.fps;

    if temp_data.input_is_sequence {
        // Start frame in the input file names
        input_args.push(format!("-start_number {}", temp_data.output_frame_start));
        input_args.push(format!("-framerate {}", temp_data.fps));
    }

    if paths.output_is_sequence {
        output_args.push(format!("-start_number {}", temp_data.output_frame_start));
    }

    let mut start_sec = 0.0;
    if temp_data.without_handles && temp_data.handles_are_set {
        if temp_data.handle_start > 0 {
            start_sec = temp_data.handle_start as f64 / temp_data.fps;
            input_args.push(format!("-ss {}", format_seconds(start_sec)));
        }
        output_args.push(format!("-t {}", format_seconds(duration_seconds)));
    } else if paths.output_is_sequence {
        output_args.push(format!("-frames:v {}", output_frames_len));
    }

    // Bound a sequence rendered to video
    if temp_data.input_is_sequence && !paths.output_is_sequence {
        input_args.push(format!("-to {}", format_seconds(duration_seconds + start_sec)));
    }

    input_args.push(format!("-i \"{}\"", paths.full_input_path.display()));

    if !paths.output_ext_is_image && temp_data.with_audio {
        let audio = audio_args(request.instance, temp_data, duration_seconds);
        input_args.extend(audio.input);
        audio_filters.extend(audio.filters);
        output_args.extend(audio.output);
    }

    video_filters.extend(rescaling_filters(
        temp_data,
        output_def,
        new_repre,
        &paths.full_input_path_single_file,
        request.probe,
    )?);

    let mut input_args = split_ffmpeg_args(&input_args);

    video_filters.extend(lut_filters(new_repre, request.instance, &mut input_args));

    if let Some(bg_color) = output_def.bg_color.as_ref() {
        if temp_data.input_allow_bg && bg_color.alpha() > 0.0 {
            debug!("Adding background color {}", bg_color.hex());
            let mut filters = background_filters(bg_color);
            filters.append(&mut video_filters);
            video_filters = filters;
        }
    }

    output_args.push("-y".to_string());
    // Output path must stay the last argument
    output_args.push(format!("\"{}\"", paths.full_output_path.display()));

    Ok(ffmpeg_full_args(
        request.ffmpeg_path,
        input_args,
        video_filters,
        audio_filters,
        output_args,
    ))
}

/// Splits entries holding several flags (`"-ss 1 -t 2"`) into one entry per
/// flag. Empty and repeated entries are dropped.
pub fn split_ffmpeg_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let mut split_args: Vec<String> = Vec::new();
    for arg in args {
        for (idx, part) in arg.as_ref().split(" -").enumerate() {
            let part = if idx == 0 {
                part.to_string()
            } else {
                format!("-{}", part)
            };

            if !part.is_empty() && !split_args.contains(&part) {
                split_args.push(part);
            }
        }
    }
    split_args
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterKind {
    Video,
    Audio,
}

fn filter_flag(arg: &str) -> Option<(FilterKind, String)> {
    let (flag, value) = match arg.split_once(char::is_whitespace) {
        Some((flag, value)) => (flag, value.trim()),
        None => (arg, ""),
    };

    let kind = match flag {
        "-vf" | "-filter:v" => FilterKind::Video,
        "-af" | "-filter:a" => FilterKind::Audio,
        _ => return None,
    };
    Some((kind, value.to_string()))
}

/// Comma-joined filter chain in double quotes, so it stays one argument.
fn quote_chain(filters: &[String]) -> String {
    let chain = filters.join(",").replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", chain)
}

/// Final command: tool, inputs, joined video and audio filters, outputs.
///
/// Filter flags found in the output arguments are moved into the filter
/// lists, so a command never carries two `-filter:v` entries. An identical
/// filter present in both places ends up twice in the joined chain.
pub fn ffmpeg_full_args(
    ffmpeg_path: &str,
    input_args: Vec<String>,
    mut video_filters: Vec<String>,
    mut audio_filters: Vec<String>,
    output_args: Vec<String>,
) -> Vec<String> {
    let mut remaining_output = Vec::new();
    for arg in split_ffmpeg_args(&output_args) {
        match filter_flag(&arg) {
            Some((FilterKind::Video, value)) => {
                if !value.is_empty() {
                    video_filters.push(value);
                }
            }
            Some((FilterKind::Audio, value)) => {
                if !value.is_empty() {
                    audio_filters.push(value);
                }
            }
            None => remaining_output.push(arg),
        }
    }

    let mut all_args = Vec::with_capacity(input_args.len() + remaining_output.len() + 3);
    all_args.push(format!("\"{}\"", ffmpeg_path));
    all_args.extend(input_args);
    if !video_filters.is_empty() {
        all_args.push(format!("-filter:v {}", quote_chain(&video_filters)));
    }
    if !audio_filters.is_empty() {
        all_args.push(format!("-filter:a {}", quote_chain(&audio_filters)));
    }
    all_args.extend(remaining_output);
    all_args
}
