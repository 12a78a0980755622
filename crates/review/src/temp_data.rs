use crate::config::OutputDefinition;
use crate::instance::{Instance, PublishContext, Representation};
use crate::tags::ReviewTag;

/// Extensions whose alpha can be composited over a background color.
pub const ALPHA_EXTS: &[&str] = &["exr", "png", "dpx"];

/// Values derived once per (representation, output definition) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TempData {
    pub fps: f64,
    pub frame_start: i64,
    pub frame_end: i64,
    pub handle_start: i64,
    pub handle_end: i64,
    pub frame_start_handle: i64,
    pub frame_end_handle: i64,
    pub output_frame_start: i64,
    pub output_frame_end: i64,
    pub pixel_aspect: f64,
    pub resolution_width: Option<u32>,
    pub resolution_height: Option<u32>,
    pub input_is_sequence: bool,
    pub input_allow_bg: bool,
    pub with_audio: bool,
    pub without_handles: bool,
    pub handles_are_set: bool,
}

pub fn prepare_temp_data(
    instance: &Instance,
    context: &PublishContext,
    repre: &Representation,
    output_def: &OutputDefinition,
) -> TempData {
    let frame_start = instance.frame_start;
    let frame_end = instance.frame_end;

    // Both handles come from the same place
    let (handle_start, handle_end) = match (instance.handle_start, instance.handle_end) {
        (Some(start), Some(end)) => (start, end),
        _ => (context.handle_start, context.handle_end),
    };

    let frame_start_handle = frame_start - handle_start;
    let frame_end_handle = frame_end + handle_end;

    let without_handles = output_def.has_tag(&ReviewTag::NoHandles);
    let (output_frame_start, output_frame_end) = if without_handles {
        (frame_start, frame_end)
    } else {
        (frame_start_handle, frame_end_handle)
    };

    let with_audio = !output_def.has_tag(&ReviewTag::NoAudio) && !instance.audio.is_empty();
    let input_ext = repre.ext_clean().to_lowercase();

    TempData {
        fps: instance.fps,
        frame_start,
        frame_end,
        handle_start,
        handle_end,
        frame_start_handle,
        frame_end_handle,
        output_frame_start,
        output_frame_end,
        pixel_aspect: instance.pixel_aspect,
        resolution_width: instance.resolution_width,
        resolution_height: instance.resolution_height,
        input_is_sequence: repre.files.is_sequence(),
        input_allow_bg: ALPHA_EXTS.contains(&input_ext.as_str()),
        with_audio,
        without_handles,
        handles_are_set: handle_start > 0 || handle_end > 0,
    }
}
