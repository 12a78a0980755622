// Overscan crop values and the filters that apply them

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{ReviewError, Result};

/// One axis of an overscan crop definition.
///
/// - `300`, `300px`: explicit pixel size
/// - `10%`: explicit percent of the input
/// - `+300px`, `-300px`: pixels added to the input
/// - `+10%`, `-10%`: percent of the input added to it
/// - `-10%+`: the input is that percentage of the output
///
/// Zero always passes the input size through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverscanValue {
    PixelsExplicit(i64),
    PercentExplicit(f64),
    PixelsRelative(i64),
    PercentRelative(f64),
    PercentRelativeToOutput(f64),
}

impl OverscanValue {
    pub fn size_for(&self, value: i64) -> i64 {
        match *self {
            OverscanValue::PixelsExplicit(0) => value,
            OverscanValue::PixelsExplicit(pixels) => pixels,
            OverscanValue::PercentExplicit(percent) => {
                if percent == 0.0 {
                    return value;
                }
                ((value as f64 / 100.0) * percent) as i64
            }
            OverscanValue::PixelsRelative(pixels) => value + pixels,
            OverscanValue::PercentRelative(percent) => {
                if percent == 0.0 {
                    return value;
                }
                value + ((value as f64 / 100.0) * percent) as i64
            }
            OverscanValue::PercentRelativeToOutput(percent) => {
                if percent == 0.0 {
                    return value;
                }
                ((value as f64 * 100.0) / (100.0 - percent)) as i64
            }
        }
    }
}

impl fmt::Display for OverscanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverscanValue::PixelsExplicit(v) => write!(f, "{}px", v),
            OverscanValue::PercentExplicit(v) => write!(f, "{}%", v),
            OverscanValue::PixelsRelative(v) => write!(f, "{:+}px", v),
            OverscanValue::PercentRelative(v) => write!(f, "{:+}%", v),
            OverscanValue::PercentRelativeToOutput(v) => write!(f, "{:+}%+", v),
        }
    }
}

fn item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([+-])?([0-9]+(?:\.[0-9]+)?)(%[+-]?)?$").unwrap())
}

fn parse_item(item: &str, original: &str) -> Result<OverscanValue> {
    let caps = item_regex()
        .captures(item)
        .ok_or_else(|| ReviewError::InvalidOverscan(original.to_string()))?;

    let sign = caps.get(1).map(|m| m.as_str());
    let number = &caps[2];
    let ending = caps.get(3).map(|m| m.as_str());
    let invalid = || ReviewError::InvalidOverscan(original.to_string());

    let value = match (sign, ending) {
        (None, None) => OverscanValue::PixelsExplicit(number.parse().map_err(|_| invalid())?),
        (None, Some("%")) => {
            OverscanValue::PercentExplicit(number.parse().map_err(|_| invalid())?)
        }
        (Some(sign), None) => {
            let pixels: i64 = number.parse().map_err(|_| invalid())?;
            OverscanValue::PixelsRelative(if sign == "-" { -pixels } else { pixels })
        }
        (Some(sign), Some("%")) => {
            let percent: f64 = number.parse().map_err(|_| invalid())?;
            OverscanValue::PercentRelative(if sign == "-" { -percent } else { percent })
        }
        (Some(sign), Some(_)) => {
            let percent: f64 = number.parse().map_err(|_| invalid())?;
            OverscanValue::PercentRelativeToOutput(if sign == "-" { -percent } else { percent })
        }
        // "10%+" has no sign to apply
        (None, Some(_)) => return Err(invalid()),
    };
    Ok(value)
}

/// Normalizes whitespace so every item is `[sign]number[unit]`.
fn normalize(value: &str) -> String {
    static PX: OnceLock<Regex> = OnceLock::new();
    static PERCENT: OnceLock<Regex> = OnceLock::new();
    static SIGN: OnceLock<Regex> = OnceLock::new();

    let px = PX.get_or_init(|| Regex::new(r"\s*px").unwrap());
    let percent = PERCENT.get_or_init(|| Regex::new(r"\s+%").unwrap());
    let sign = SIGN.get_or_init(|| Regex::new(r"(^|\s)([+-])\s+([0-9])").unwrap());

    let value = px.replace_all(value.trim(), " ");
    let value = percent.replace_all(&value, "%");
    sign.replace_all(&value, "${1}${2}${3}").into_owned()
}

/// Parsed overscan crop for width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverscanCrop {
    pub width: OverscanValue,
    pub height: OverscanValue,
}

impl OverscanCrop {
    /// Parses one value for both axes or two space separated values.
    /// An empty string is a no-op crop.
    pub fn parse(value: &str) -> Result<Self> {
        let normalized = normalize(value);
        let parts: Vec<&str> = normalized.split_whitespace().collect();

        let (width, height) = match parts.as_slice() {
            [] => (
                OverscanValue::PixelsExplicit(0),
                OverscanValue::PixelsExplicit(0),
            ),
            [both] => {
                let item = parse_item(both, value)?;
                (item, item)
            }
            [width, height] => (parse_item(width, value)?, parse_item(height, value)?),
            _ => return Err(ReviewError::InvalidOverscan(value.to_string())),
        };

        Ok(Self { width, height })
    }

    pub fn output_width(&self, input_width: i64) -> Result<i64> {
        let width = self.width.size_for(input_width);
        if width < 1 {
            return Err(ReviewError::InvalidOverscan(format!(
                "{} (calculated width {} from {})",
                self.width, width, input_width
            )));
        }
        Ok(width)
    }

    pub fn output_height(&self, input_height: i64) -> Result<i64> {
        let height = self.height.size_for(input_height);
        if height < 1 {
            return Err(ReviewError::InvalidOverscan(format!(
                "{} (calculated height {} from {})",
                self.height, height, input_height
            )));
        }
        Ok(height)
    }

    /// Size after the crop, or `None` when the input passes through.
    /// Odd sizes are rounded down, encoders need even sizes.
    pub fn target_size(&self, input_width: i64, input_height: i64) -> Result<Option<(i64, i64)>> {
        let mut output_width = self.output_width(input_width)?;
        let mut output_height = self.output_height(input_height)?;

        if output_width == input_width && output_height == input_height {
            return Ok(None);
        }

        if output_width % 2 == 1 {
            output_width -= 1;
        }
        if output_height % 2 == 1 {
            output_height -= 1;
        }
        Ok(Some((output_width, output_height)))
    }

    /// Filters cropping or padding the input to the overscan size.
    /// `color` is the pad color, e.g. `black` or `#102030`.
    pub fn video_filters(&self, input_width: i64, input_height: i64, color: &str) -> Result<Vec<String>> {
        let mut filters = Vec::new();
        let Some((output_width, output_height)) = self.target_size(input_width, input_height)? else {
            return Ok(filters);
        };

        if output_width <= input_width && output_height <= input_height {
            filters.push(format!("crop={}:{}", output_width, output_height));
        } else if output_width >= input_width && output_height >= input_height {
            filters.push(format!(
                "pad={}:{}:(iw-ow)/2:(ih-oh)/2:{}",
                output_width, output_height, color
            ));
        } else if output_width > input_width && output_height < input_height {
            filters.push(format!("crop=iw:{}", output_height));
            filters.push(format!("pad={}:ih:(iw-ow)/2:(ih-oh)/2:{}", output_width, color));
        } else {
            filters.push(format!("crop={}:ih", output_width));
            filters.push(format!("pad=iw:{}:(iw-ow)/2:(ih-oh)/2:{}", output_height, color));
        }

        Ok(filters)
    }
}
