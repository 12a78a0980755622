use review_core::config::{FamilyFilter, OutputDefinition, OutputFilter, Profile, SingleFrameFilter};
use review_core::instance::{Representation, RepresentationFiles};
use review_core::profiles::{
    filter_outputs_by_families, filter_outputs_by_frames, filter_outputs_by_product_name,
    filter_outputs_by_tags, find_matching_profile,
};
use review_core::TagSet;
use std::path::PathBuf;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn profile(hosts: &[&str], tasks: &[&str], families: &[&str]) -> Profile {
    Profile {
        hosts: strings(hosts),
        tasks: strings(tasks),
        families: strings(families),
        outputs: Vec::new(),
    }
}

fn output(name: &str, filter: OutputFilter) -> OutputDefinition {
    OutputDefinition {
        name: name.to_string(),
        filter,
        ..Default::default()
    }
}

fn repre(ext: &str, files: RepresentationFiles) -> Representation {
    Representation {
        name: ext.to_string(),
        ext: ext.to_string(),
        files,
        staging_dir: PathBuf::from("/stage"),
        tags: TagSet::new(),
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

#[test]
fn test_host_restricted_profile_beats_unrestricted() {
    let profiles = vec![profile(&[], &[], &[]), profile(&["nuke"], &[], &[])];

    let selected = find_matching_profile(&profiles, "nuke", "comp", "render").unwrap();
    assert_eq!(selected.hosts, strings(&["nuke"]));
}

#[test]
fn test_non_matching_filter_eliminates_profile() {
    let profiles = vec![profile(&["maya"], &[], &[])];
    assert!(find_matching_profile(&profiles, "nuke", "comp", "render").is_none());

    let profiles = vec![profile(&["maya"], &[], &[]), profile(&[], &[], &[])];
    let selected = find_matching_profile(&profiles, "nuke", "comp", "render").unwrap();
    assert!(selected.hosts.is_empty());
}

#[test]
fn test_tie_prefers_host_then_task_then_family() {
    let by_family = profile(&[], &[], &["render"]);
    let by_task = profile(&[], &["comp"], &[]);
    let by_host = profile(&["nuke"], &[], &[]);

    let profiles = vec![by_family.clone(), by_task.clone(), by_host.clone()];
    let selected = find_matching_profile(&profiles, "nuke", "comp", "render").unwrap();
    assert_eq!(selected, &by_host);

    let profiles = vec![by_family.clone(), by_task.clone()];
    let selected = find_matching_profile(&profiles, "nuke", "comp", "render").unwrap();
    assert_eq!(selected, &by_task);
}

#[test]
fn test_tie_without_distinction_takes_first() {
    let mut first = profile(&["nuke"], &[], &[]);
    first.outputs.push(output("first", OutputFilter::default()));
    let mut second = profile(&["nuke"], &[], &[]);
    second.outputs.push(output("second", OutputFilter::default()));

    let profiles = vec![first, second];
    let selected = find_matching_profile(&profiles, "nuke", "comp", "render").unwrap();
    assert_eq!(selected.outputs[0].name, "first");
}

#[test]
fn test_family_filter_combinations() {
    let mut profile = profile(&[], &[], &[]);
    profile.outputs = vec![
        output(
            "any",
            OutputFilter {
                families: vec![FamilyFilter::Single("Render".to_string())],
                ..Default::default()
            },
        ),
        output(
            "both",
            OutputFilter {
                families: vec![FamilyFilter::All(strings(&["render", "ftrack"]))],
                ..Default::default()
            },
        ),
        output("unfiltered", OutputFilter::default()),
    ];

    let names = |outputs: Vec<&OutputDefinition>| -> Vec<String> {
        outputs.iter().map(|o| o.name.clone()).collect()
    };

    let families = strings(&["render", "review"]);
    assert_eq!(
        names(filter_outputs_by_families(&profile, &families)),
        strings(&["any", "unfiltered"])
    );

    let families = strings(&["render", "ftrack"]);
    assert_eq!(
        names(filter_outputs_by_families(&profile, &families)),
        strings(&["any", "both", "unfiltered"])
    );
}

#[test]
fn test_product_name_filter_is_case_insensitive() {
    let filtered = output(
        "main",
        OutputFilter {
            product_names: strings(&["rendermain"]),
            ..Default::default()
        },
    );
    let open = output("open", OutputFilter::default());

    let kept = filter_outputs_by_product_name(vec![&filtered, &open], Some("renderMain_v001"));
    assert_eq!(kept.len(), 2);

    let kept = filter_outputs_by_product_name(vec![&filtered, &open], Some("plateBG"));
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name, "open");

    let kept = filter_outputs_by_product_name(vec![&filtered, &open], None);
    assert_eq!(kept.len(), 1);
}

#[test]
fn test_tag_filter_needs_any_tag() {
    let tagged = output(
        "tagged",
        OutputFilter {
            tags: strings(&["Review", "ftrackreview"]),
            ..Default::default()
        },
    );
    let open = output("open", OutputFilter::default());
    let outputs = vec![&tagged, &open];

    let tags: TagSet = ["review"].into_iter().collect();
    assert_eq!(filter_outputs_by_tags(&outputs, &tags).len(), 2);

    let tags: TagSet = ["burnin"].into_iter().collect();
    let kept = filter_outputs_by_tags(&outputs, &tags);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name, "open");
}

#[test]
fn test_single_frame_filter() {
    let single = output(
        "single",
        OutputFilter {
            single_frame_filter: SingleFrameFilter::SingleFrame,
            ..Default::default()
        },
    );
    let multi = output(
        "multi",
        OutputFilter {
            single_frame_filter: SingleFrameFilter::MultiFrame,
            ..Default::default()
        },
    );
    let image_exts = ["exr", "png", "jpg"];

    let still = repre("png", RepresentationFiles::Single("a.png".to_string()));
    let kept = filter_outputs_by_frames(vec![&single, &multi], &still, &image_exts);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name, "single");

    let one_frame = repre("exr", RepresentationFiles::Sequence(strings(&["a.1001.exr"])));
    let kept = filter_outputs_by_frames(vec![&single, &multi], &one_frame, &image_exts);
    assert_eq!(kept[0].name, "single");

    let movie = repre("mov", RepresentationFiles::Single("a.mov".to_string()));
    let kept = filter_outputs_by_frames(vec![&single, &multi], &movie, &image_exts);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].name, "multi");
}
