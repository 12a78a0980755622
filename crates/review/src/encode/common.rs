// Common FFmpeg argument components

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::Rgba;
use crate::error::{Result, ReviewError};
use crate::instance::{Instance, Representation};
use crate::tags::ReviewTag;

/// Seconds with 10 decimal places, e.g. `0.8333333333`.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.10}", seconds)
}

/// `#RRGGBB` for pad filters, `black` when unset.
pub fn color_value(color: Option<&Rgba>) -> String {
    match color {
        Some(color) => format!("#{}", color.hex()),
        None => "black".to_string(),
    }
}

/// Drops entries that are empty or only whitespace.
pub fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .collect()
}

/// Replaces `{key}` placeholders from `data`. `{{` and `}}` are literal braces.
pub fn fill_template(template: &str, data: &BTreeMap<String, String>) -> Result<String> {
    let error = |reason: String| ReviewError::Template {
        template: template.to_string(),
        reason,
    };

    let mut filled = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    filled.push('{');
                    continue;
                }

                let mut key = String::new();
                let mut closed = false;
                for k in chars.by_ref() {
                    if k == '}' {
                        closed = true;
                        break;
                    }
                    key.push(k);
                }
                if !closed {
                    return Err(error("unclosed '{'".to_string()));
                }

                let value = data
                    .get(key.trim())
                    .ok_or_else(|| error(format!("unknown key \"{}\"", key)))?;
                filled.push_str(value);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    filled.push('}');
                    continue;
                }
                return Err(error("single '}' encountered".to_string()));
            }
            c => filled.push(c),
        }
    }

    Ok(filled)
}

/// Fills every output argument; an argument that fails is kept unchanged.
pub fn fill_output_args(args: Vec<String>, data: &BTreeMap<String, String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| match fill_template(&arg, data) {
            Ok(filled) => filled,
            Err(e) => {
                warn!("{}. Using the argument as is.", e);
                arg
            }
        })
        .collect()
}

/// Template data: anatomy fields plus `output` and `ext`.
pub fn template_data(instance: &Instance, output_name: &str, ext: &str) -> BTreeMap<String, String> {
    let mut data = instance.anatomy_data.clone();
    data.insert("output".to_string(), output_name.to_string());
    data.insert("ext".to_string(), ext.to_string());
    data
}

/// LUT baking filters. Removes `-gamma` input arguments when a LUT is added.
pub fn lut_filters(
    new_repre: &Representation,
    instance: &Instance,
    input_args: &mut Vec<String>,
) -> Vec<String> {
    let Some(lut_path) = instance.lut_path.as_deref().filter(|p| !p.is_empty()) else {
        return Vec::new();
    };
    if !new_repre.tags.contains(&ReviewTag::BakeLut) {
        return Vec::new();
    }

    // ffmpeg filter syntax needs forward slashes and escaped colons
    let lut_path = lut_path.replace('\\', "/").replace(':', "\\:");

    input_args.retain(|arg| arg.split_whitespace().next() != Some("-gamma"));

    info!("Added Lut to ffmpeg command.");
    vec![
        format!("lut3d=file='{}'", lut_path),
        "colormatrix=bt601:bt709".to_string(),
    ]
}

/// Composites the input over a solid color. Goes before every other video
/// filter since later filters may drop alpha.
pub fn background_filters(color: &Rgba) -> Vec<String> {
    let color = format!("#{}@{}", color.hex(), color.alpha());
    vec![
        "split=2[bg][fg]".to_string(),
        format!("[bg]drawbox=c={}:replace=1:t=fill[bg]", color),
        "[bg][fg]overlay=format=auto".to_string(),
    ]
}
