//! Play — interactive terminal reader for trying stories out.
//!
//! Usage: play [--stories <dir>] [--story <title>] [--save-file <path>] [--config <file.ron>]
//!
//! Commands:
//!   look            — show the current scene again
//!   choose <n>      — pick choice n (1-based)
//!   next            — advance an auto scene
//!   stats           — show stats and mood
//!   save            — save progress
//!   reset           — clear progress and start over
//!   help            — list commands
//!   quit            — exit

use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visual_novel_engine::core::graph::Step;
use visual_novel_engine::core::library::StoryLibrary;
use visual_novel_engine::core::progress::{FileStore, KeyValueStore, MemoryStore};
use visual_novel_engine::core::reader::ReaderSession;
use visual_novel_engine::schema::scene::{Scene, Transition};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visual_novel_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut stories_dir = "stories".to_string();
    let mut story_title = None;
    let mut save_file = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--stories" if i + 1 < args.len() => {
                i += 1;
                stories_dir = args[i].clone();
            }
            "--story" if i + 1 < args.len() => {
                i += 1;
                story_title = Some(args[i].clone());
            }
            "--save-file" if i + 1 < args.len() => {
                i += 1;
                save_file = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = StoryLibrary::builder().stories_dir(&stories_dir);
    if let Some(ref path) = config_path {
        builder = builder.config_file(path);
    }
    let library = match builder.build() {
        Ok(library) => library,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let title = match story_title.or_else(|| library.titles().next().map(str::to_string)) {
        Some(title) => title,
        None => {
            eprintln!("ERROR: no stories found in '{}'", stories_dir);
            std::process::exit(1);
        }
    };

    let store: Box<dyn KeyValueStore> = match save_file {
        Some(ref path) => Box::new(FileStore::new(Path::new(path))),
        None => Box::new(MemoryStore::new()),
    };

    let mut session = match library.open_reader(&title, store) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    println!("Stories: {}", library.titles().collect::<Vec<_>>().join(", "));
    println!("Playing: {}", title);
    println!("Type 'help' for commands.\n");
    show_current(&session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "look" | "l" => show_current(&session),
            "choose" | "c" => {
                let Some(n) = parts.get(1).and_then(|s| s.parse::<usize>().ok()) else {
                    println!("Usage: choose <n>");
                    continue;
                };
                if n == 0 {
                    println!("Choices are numbered from 1.");
                    continue;
                }
                match session.choose(n - 1) {
                    Ok(step) => show_step(step),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "next" | "n" => match session.advance() {
                Ok(step) => show_step(step),
                Err(e) => println!("ERROR: {}", e),
            },
            "stats" | "s" => {
                for (name, value) in session.stats().iter() {
                    println!("  {:<14} {:>3}", name, value);
                }
                println!("  mood: {}", session.mood());
            }
            "save" => match session.save() {
                Ok(()) => println!("Saved at scene {}.", session.current_id()),
                Err(e) => println!("ERROR: {}", e),
            },
            "reset" => match session.reset() {
                Ok(()) => {
                    println!("Progress cleared.\n");
                    show_current(&session);
                }
                Err(e) => println!("ERROR: {}", e),
            },
            _ => {
                println!("Unknown command: {}. Type 'help' for commands.", cmd);
            }
        }
    }
}

fn show_current<S: KeyValueStore>(session: &ReaderSession<S>) {
    match session.current_scene() {
        Some(scene) => show_scene(scene),
        None => println!("--- The End ---"),
    }
}

fn show_step(step: Step<'_>) {
    match step {
        Step::Scene(scene) => show_scene(scene),
        Step::Ended => println!("--- The End ---"),
    }
}

fn show_scene(scene: &Scene) {
    println!("\n=== {} ===", scene.title);
    if !scene.background_image.is_empty() {
        println!("[background: {}]", scene.background_image);
    }
    if !scene.character_image.is_empty() {
        println!("[character: {}]", scene.character_image);
    }
    if let Some(ref mood) = scene.mood {
        println!("[mood: {}]", mood);
    }
    if scene.character_name.is_empty() {
        println!("{}", scene.dialogue);
    } else {
        println!("{}: \"{}\"", scene.character_name, scene.dialogue);
    }
    match &scene.next_scene {
        Some(Transition::Choice { options }) => {
            for (i, choice) in options.iter().enumerate() {
                println!("  {}. {}", i + 1, choice.text);
            }
        }
        Some(Transition::Auto { .. }) => println!("  (next)"),
        None => println!("  (the end; 'next' to finish)"),
    }
    println!();
}

fn print_usage() {
    println!(
        "Usage: play [--stories <dir>] [--story <title>] [--save-file <path>] [--config <file.ron>]"
    );
}

fn print_help() {
    println!("Commands:");
    println!("  look            show the current scene again");
    println!("  choose <n>      pick choice n");
    println!("  next            advance an auto scene");
    println!("  stats           show stats and mood");
    println!("  save            save progress");
    println!("  reset           clear progress and start over");
    println!("  help            list commands");
    println!("  quit            exit");
}
