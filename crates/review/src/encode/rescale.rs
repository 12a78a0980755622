// Resolution and pixel aspect normalisation

use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::OutputDefinition;
use crate::encode::common::color_value;
use crate::encode::letterbox::letterbox_filters;
use crate::error::{Result, ReviewError};
use crate::instance::Representation;
use crate::overscan::OverscanCrop;
use crate::probe::{first_resolution, StreamProbe};
use crate::tags::ReviewTag;
use crate::temp_data::TempData;

pub const ODD_INPUT_PAD_FILTER: &str = "pad=width=ceil(iw/2)*2:height=ceil(ih/2)*2";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Video filters bringing the input to the output resolution. Sets the
/// resolution of `new_repre` to the resulting size.
pub fn rescaling_filters(
    temp_data: &TempData,
    output_def: &OutputDefinition,
    new_repre: &mut Representation,
    input_path: &Path,
    probe: &dyn StreamProbe,
) -> Result<Vec<String>> {
    let mut filters = Vec::new();

    let reformated = new_repre.tags.contains(&ReviewTag::Reformated);
    let letter_box = &output_def.letter_box;
    debug!("reformat_in_baking: `{}`", reformated);

    let streams = probe.streams(input_path).map_err(|e| match e {
        ReviewError::Probe { .. } => e,
        other => ReviewError::Probe {
            path: input_path.to_path_buf(),
            message: other.to_string(),
        },
    })?;
    let (width, height) =
        first_resolution(&streams).ok_or_else(|| ReviewError::MissingResolution(input_path.to_path_buf()))?;
    if width == 0 || height == 0 {
        return Err(ReviewError::DivisionByZero("input resolution ratio"));
    }
    let mut input_width = i64::from(width);
    let mut input_height = i64::from(height);

    let mut pixel_aspect = if output_def.scale_pixel_aspect {
        temp_data.pixel_aspect
    } else {
        1.0
    };

    // Explicit size always wins
    let mut output_size = output_def
        .explicit_size()
        .map(|(w, h)| (i64::from(w), i64::from(h)));

    if reformated {
        debug!("Using resolution from input. It is already reformated from upstream process");
        pixel_aspect = 1.0;
        if !letter_box.enabled && output_size.is_none() {
            output_size = Some((input_width, input_height));
        }
    }

    let overscan_color = color_value(output_def.overscan_color.as_ref());
    debug!("Overscan color: `{}`", overscan_color);

    let overscan = OverscanCrop::parse(&output_def.overscan_crop)?;
    if let Some((crop_width, crop_height)) = overscan.target_size(input_width, input_height)? {
        filters.extend(overscan.video_filters(input_width, input_height, &overscan_color)?);
        input_width = crop_width;
        input_height = crop_height;
        // Cropped size replaces instance resolution
        if output_size.is_none() {
            output_size = Some((input_width, input_height));
        }
    }

    if input_width % 2 != 0 || input_height % 2 != 0 {
        filters.push(ODD_INPUT_PAD_FILTER.to_string());

        if input_width % 2 != 0 {
            info!(
                "Converting input width from odd to even number. {} -> {}",
                input_width,
                input_width + 1
            );
            input_width += 1;
        }
        if input_height % 2 != 0 {
            info!(
                "Converting input height from odd to even number. {} -> {}",
                input_height,
                input_height + 1
            );
            input_height += 1;
        }
    }

    debug!("pixel_aspect: `{}`", pixel_aspect);
    debug!("input_width: `{}`", input_width);
    debug!("input_height: `{}`", input_height);

    let (mut output_width, mut output_height) = match output_size {
        Some(size) => size,
        None => match (temp_data.resolution_width, temp_data.resolution_height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => {
                (i64::from(width), i64::from(height))
            }
            _ => {
                debug!("Using resolution from input.");
                (input_width, input_height)
            }
        },
    };

    if output_width % 2 != 0 {
        warn!(
            "Converting output width from odd to even number. {} -> {}",
            output_width,
            output_width + 1
        );
        output_width += 1;
    }
    if output_height % 2 != 0 {
        warn!(
            "Converting output height from odd to even number. {} -> {}",
            output_height,
            output_height + 1
        );
        output_height += 1;
    }
    debug!("Output resolution is {}x{}", output_width, output_height);

    if output_width == input_width
        && output_height == input_height
        && pixel_aspect == 1.0
        && !letter_box.enabled
    {
        debug!("Output resolution is same as input's and letter box is not set. Skipping reformat part.");
        set_resolution(new_repre, input_width, input_height);
        return Ok(filters);
    }

    let scaled_input_width = input_width as f64 * pixel_aspect;
    if input_height == 0 || scaled_input_width == 0.0 {
        return Err(ReviewError::DivisionByZero("input resolution ratio"));
    }

    let input_res_ratio = round2(scaled_input_width / input_height as f64);
    let output_res_ratio = round2(output_width as f64 / output_height as f64);
    debug!("input_res_ratio: `{}`", input_res_ratio);
    debug!("output_res_ratio: `{}`", output_res_ratio);

    let (width_scale, width_half_pad, height_scale, height_half_pad) =
        if input_res_ratio < output_res_ratio {
            debug!("Input's resolution ratio is lower then output's");
            let width_scale = (scaled_input_width * output_height as f64 / input_height as f64) as i64;
            (width_scale, (output_width - width_scale) / 2, output_height, 0)
        } else {
            debug!("Input is heigher then output");
            let height_scale = (input_height as f64 * output_width as f64 / scaled_input_width) as i64;
            (output_width, 0, height_scale, (output_height - height_scale) / 2)
        };

    debug!("width_scale: `{}`", width_scale);
    debug!("width_half_pad: `{}`", width_half_pad);
    debug!("height_scale: `{}`", height_scale);
    debug!("height_half_pad: `{}`", height_half_pad);

    filters.push(format!("scale={}x{}:flags=lanczos", width_scale, height_scale));
    filters.push(format!(
        "pad={}:{}:{}:{}:{}",
        output_width, output_height, width_half_pad, height_half_pad, overscan_color
    ));
    filters.push("setsar=1".to_string());

    if letter_box.enabled {
        filters.extend(letterbox_filters(letter_box, output_width, output_height));
    }

    set_resolution(new_repre, output_width, output_height);
    Ok(filters)
}

fn set_resolution(repre: &mut Representation, width: i64, height: i64) {
    repre.resolution_width = u32::try_from(width).ok();
    repre.resolution_height = u32::try_from(height).ok();
}
