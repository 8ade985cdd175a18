/// Story Export — converts a published RON story into a maker export document.
///
/// Usage: story_export --input <story.ron> --output <doc.json>
use std::env;
use std::process;
use visual_novel_engine::core::maker::MakerSession;
use visual_novel_engine::schema::story::Story;

const USAGE: &str = "Usage: story_export --input <story.ron> --output <doc.json>";

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut output = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" if i + 1 < args.len() => {
                i += 1;
                input = Some(args[i].clone());
            }
            "--output" if i + 1 < args.len() => {
                i += 1;
                output = Some(args[i].clone());
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input_path = input.unwrap_or_else(|| {
        eprintln!("Error: --input is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let output_path = output.unwrap_or_else(|| {
        eprintln!("Error: --output is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let story = Story::load_from_ron(std::path::Path::new(&input_path)).unwrap_or_else(|e| {
        eprintln!("Error loading story '{}': {}", input_path, e);
        process::exit(1);
    });

    println!(
        "Loaded '{}' ({} scenes) from '{}'",
        story.title,
        story.len(),
        input_path
    );

    let json = MakerSession::from_scenes(story.scenes)
        .and_then(|session| session.to_json())
        .unwrap_or_else(|e| {
            eprintln!("Error building export document: {}", e);
            process::exit(1);
        });

    std::fs::write(&output_path, json).unwrap_or_else(|e| {
        eprintln!("Error writing '{}': {}", output_path, e);
        process::exit(1);
    });

    println!("Export document saved to '{}'", output_path);
}
