use crate::encode::common::format_seconds;
use crate::instance::Instance;
use crate::temp_data::TempData;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioArgs {
    pub input: Vec<String>,
    pub filters: Vec<String>,
    pub output: Vec<String>,
}

/// Input arguments for every audio track, plus channel merging when there is
/// more than one track.
pub fn audio_args(instance: &Instance, temp_data: &TempData, duration_seconds: f64) -> AudioArgs {
    let mut args = AudioArgs::default();
    if instance.audio.is_empty() {
        return args;
    }

    for audio in &instance.audio {
        // Audio offset is relative to the timeline start frame
        let offset_seconds = match instance.frame_start_ftrack {
            Some(timeline_start) => (timeline_start - audio.offset) as f64 / temp_data.fps,
            None => 0.0,
        };

        if offset_seconds > 0.0 {
            args.input.push(format!("-ss {}", offset_seconds));
        } else if offset_seconds < 0.0 {
            args.input.push(format!("-itsoffset {}", offset_seconds.abs()));
        }

        args.input
            .push(format!("-to {}", format_seconds(duration_seconds + offset_seconds)));
        args.input.push(format!("-i \"{}\"", audio.filename));
    }

    if instance.audio.len() > 1 {
        args.output.push("-filter_complex amerge".to_string());
        args.output.push(format!("-ac {}", instance.audio.len()));
    }

    args
}
