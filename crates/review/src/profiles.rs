// Profile matching and output definition filtering

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::config::{FamilyFilter, OutputDefinition, Profile, SingleFrameFilter};
use crate::instance::Representation;
use crate::tags::TagSet;

/// Returns 0 for an empty pattern list, 1 when any pattern matches at the
/// start of `value` and -1 when none does. Invalid patterns are skipped.
pub fn validate_value_by_regexes(value: &str, patterns: &[String]) -> i32 {
    let patterns: Vec<&String> = patterns.iter().filter(|p| !p.is_empty()).collect();
    if patterns.is_empty() {
        return 0;
    }

    for pattern in patterns {
        match Regex::new(pattern) {
            Ok(regex) => {
                if matches_at_start(&regex, value) {
                    return 1;
                }
            }
            Err(e) => warn!("Invalid filter \"{}\": {}. Skipping.", pattern, e),
        }
    }
    -1
}

// `find` is leftmost-first, so a match at offset 0 exists only if the
// leftmost match starts there.
fn matches_at_start(regex: &Regex, value: &str) -> bool {
    regex.find(value).map(|m| m.start() == 0).unwrap_or(false)
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    profile: &'a Profile,
    // host, task, family
    flags: [bool; 3],
}

pub fn find_matching_profile<'a>(
    profiles: &'a [Profile],
    host_name: &str,
    task_name: &str,
    family: &str,
) -> Option<&'a Profile> {
    let mut highest = -1;
    let mut matching: Vec<Candidate<'a>> = Vec::new();

    for profile in profiles {
        let axes = [
            (host_name, &profile.hosts),
            (task_name, &profile.tasks),
            (family, &profile.families),
        ];

        let mut points = 0;
        let mut flags = [false; 3];
        let mut eliminated = false;
        for (idx, (value, patterns)) in axes.iter().enumerate() {
            let result = validate_value_by_regexes(value, patterns);
            if result == -1 {
                debug!("\"{}\" not found in {:?}", value, patterns);
                eliminated = true;
                break;
            }
            points += result;
            flags[idx] = result == 1;
        }
        if eliminated || points < highest {
            continue;
        }

        if points > highest {
            matching.clear();
            highest = points;
        }
        matching.push(Candidate { profile, flags });
    }

    match matching.len() {
        0 => {
            warn!(
                "None of profiles match your setup. Host \"{}\" | Task: \"{}\" | Family: \"{}\"",
                host_name, task_name, family
            );
            None
        }
        1 => Some(matching[0].profile),
        _ => {
            warn!(
                "More than one profile match your setup. Host \"{}\" | Task: \"{}\" | Family: \"{}\"",
                host_name, task_name, family
            );
            profile_exclusion(matching)
        }
    }
}

/// Narrows equally scored profiles by host, then task, then family match.
fn profile_exclusion<'a>(mut candidates: Vec<Candidate<'a>>) -> Option<&'a Profile> {
    info!("Search for first most matching profile in match order: Host name -> Task name -> Family.");

    for axis in 0..3 {
        let (matched, unmatched): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|c| c.flags[axis]);
        candidates = if matched.is_empty() { unmatched } else { matched };

        if candidates.len() == 1 {
            break;
        }
    }

    candidates.first().map(|c| c.profile)
}

/// True when `families` (already lower-cased) satisfy any of the filters.
pub fn families_filter_validation(families: &[String], filters: &[FamilyFilter]) -> bool {
    if filters.is_empty() {
        return true;
    }

    filters.iter().any(|filter| match filter {
        FamilyFilter::Single(family) => {
            !family.is_empty() && families.contains(&family.to_lowercase())
        }
        FamilyFilter::All(combination) => {
            let required: Vec<String> = combination
                .iter()
                .filter(|f| !f.is_empty())
                .map(|f| f.to_lowercase())
                .collect();
            !required.is_empty() && required.iter().all(|f| families.contains(f))
        }
    })
}

pub fn filter_outputs_by_families<'a>(
    profile: &'a Profile,
    families: &[String],
) -> Vec<&'a OutputDefinition> {
    let families: Vec<String> = families.iter().map(|f| f.to_lowercase()).collect();

    profile
        .outputs
        .iter()
        .filter(|output| families_filter_validation(&families, &output.filter.families))
        .collect()
}

pub fn filter_outputs_by_product_name<'a>(
    outputs: Vec<&'a OutputDefinition>,
    product_name: Option<&str>,
) -> Vec<&'a OutputDefinition> {
    outputs
        .into_iter()
        .filter(|output| {
            let patterns = &output.filter.product_names;
            if patterns.is_empty() {
                return true;
            }
            let Some(product_name) = product_name else {
                return false;
            };

            patterns.iter().any(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => matches_at_start(&regex, product_name),
                    Err(e) => {
                        warn!("Invalid product name filter \"{}\": {}", pattern, e);
                        false
                    }
                }
            })
        })
        .collect()
}

pub fn filter_outputs_by_tags<'a>(
    outputs: &[&'a OutputDefinition],
    tags: &TagSet,
) -> Vec<&'a OutputDefinition> {
    outputs
        .iter()
        .copied()
        .filter(|output| {
            output.filter.tags.is_empty() || tags.intersects_any(&output.filter.tags)
        })
        .collect()
}

/// Applies `single_frame_filter`. A single image is a non-sequence input
/// with an image extension, or a sequence of one file.
pub fn filter_outputs_by_frames<'a>(
    outputs: Vec<&'a OutputDefinition>,
    repre: &Representation,
    image_exts: &[&str],
) -> Vec<&'a OutputDefinition> {
    let ext = repre.ext_clean().to_lowercase();
    let is_single_frame = if repre.files.is_sequence() {
        repre.files.len() == 1
    } else {
        image_exts.contains(&ext.as_str())
    };

    outputs
        .into_iter()
        .filter(|output| match output.filter.single_frame_filter {
            SingleFrameFilter::Everytime => true,
            SingleFrameFilter::SingleFrame => is_single_frame,
            SingleFrameFilter::MultiFrame => !is_single_frame,
        })
        .collect()
}
