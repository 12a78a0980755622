// Letterbox and pillarbox masks drawn over the scaled output

use tracing::debug;

use crate::config::LetterBox;

/// Drawbox filters masking an `output_width`x`output_height` frame down to
/// the letterbox ratio. Bars go top/bottom when the frame is taller than the
/// ratio and left/right when it is wider. Nothing is drawn when the ratios
/// agree to three decimals.
pub fn letterbox_filters(letter_box: &LetterBox, output_width: i64, output_height: i64) -> Vec<String> {
    let mut filters = Vec::new();
    if output_height == 0 {
        return filters;
    }

    let ratio = letter_box.ratio;
    let output_ratio = output_width as f64 / output_height as f64;
    debug!("Output ratio: {} LetterBox ratio: {}", output_ratio, ratio);

    if format!("{:.3}", output_ratio) == format!("{:.3}", ratio) || ratio <= 0.0 {
        return filters;
    }
    let pillar = output_ratio > ratio;

    let fill_color = letter_box.fill_color.hex();
    let fill_alpha = letter_box.fill_color.alpha();
    let line_color = letter_box.line_color.hex();
    let line_alpha = letter_box.line_color.alpha();
    let thickness = letter_box.line_thickness;

    let (w, h) = (output_width, output_height);

    if !pillar {
        let bar = format!("round(({h}-({w}/{ratio}))/2)");
        if fill_alpha > 0.0 {
            filters.push(format!(
                "drawbox=0:0:{w}:{bar}:t=fill:c={fill_color}@{fill_alpha}"
            ));
            filters.push(format!(
                "drawbox=0:{h}-{bar}:{w}:{bar}:t=fill:c={fill_color}@{fill_alpha}"
            ));
        }
        if line_alpha > 0.0 && thickness > 0 {
            filters.push(format!(
                "drawbox=0:{bar}-{thickness}:{w}:{thickness}:t=fill:c={line_color}@{line_alpha}"
            ));
            filters.push(format!(
                "drawbox=0:{h}-{bar}:{w}:{thickness}:t=fill:c={line_color}@{line_alpha}"
            ));
        }
    } else {
        let bar = format!("round(({w}-({h}*{ratio}))/2)");
        if fill_alpha > 0.0 {
            filters.push(format!(
                "drawbox=0:0:{bar}:{h}:t=fill:c={fill_color}@{fill_alpha}"
            ));
            filters.push(format!(
                "drawbox={w}-{bar}:0:{bar}:{h}:t=fill:c={fill_color}@{fill_alpha}"
            ));
        }
        if line_alpha > 0.0 && thickness > 0 {
            filters.push(format!(
                "drawbox={bar}:0:{thickness}:{h}:t=fill:c={line_color}@{line_alpha}"
            ));
            filters.push(format!(
                "drawbox={w}-{bar}:0:{thickness}:{h}:t=fill:c={line_color}@{line_alpha}"
            ));
        }
    }

    filters
}
