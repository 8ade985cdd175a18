//! Story Linter — checks story files for broken links and authoring mistakes.
//!
//! Usage: story_linter <story_file_or_dir> [--stats happiness,trust,...]

use std::path::Path;
use std::process;
use visual_novel_engine::schema::stats::StatVector;
use visual_novel_engine::schema::story::{Severity, Story};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: story_linter <story_file_or_dir> [--stats happiness,trust,...]");
        process::exit(0);
    }

    let target = &args[1];
    let mut stat_names: Option<Vec<String>> = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--stats" && i + 1 < args.len() {
            i += 1;
            stat_names = Some(
                args[i]
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        i += 1;
    }

    // Without --stats, check impacts against the default stat schema
    let stat_names = stat_names.unwrap_or_else(|| {
        StatVector::default()
            .names()
            .map(str::to_string)
            .collect()
    });
    let stat_refs: Vec<&str> = stat_names.iter().map(String::as_str).collect();

    let path = Path::new(target);
    let mut stories = Vec::new();
    let mut load_failures = 0;

    if path.is_file() {
        load_story(path, &mut stories, &mut load_failures);
    } else if path.is_dir() {
        load_stories_recursive(path, &mut stories, &mut load_failures);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target);
        process::exit(1);
    }

    println!("Loaded {} stories", stories.len());

    let mut errors = load_failures;
    let mut warnings = 0;

    for story in &stories {
        println!("\n=== {} ({} scenes) ===\n", story.title, story.len());
        let issues = story.lint(&stat_refs);
        if issues.is_empty() {
            println!("All checks passed!");
        }
        for issue in &issues {
            println!("{}", issue);
            match issue.severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
            }
        }
    }

    println!("\nSummary: {} errors, {} warnings", errors, warnings);

    if errors == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_story(path: &Path, stories: &mut Vec<Story>, failures: &mut usize) {
    // Lint wants to see broken stories too, so skip validation here
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|contents| ron::from_str::<Story>(&contents).map_err(|e| e.to_string()));
    match parsed {
        Ok(story) => {
            println!("  Loaded: {}", path.display());
            stories.push(story);
        }
        Err(e) => {
            eprintln!("  ERROR loading {}: {}", path.display(), e);
            *failures += 1;
        }
    }
}

fn load_stories_recursive(dir: &Path, stories: &mut Vec<Story>, failures: &mut usize) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries.flatten().map(|entry| entry.path()).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            load_stories_recursive(&path, stories, failures);
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            load_story(&path, stories, failures);
        }
    }
}
