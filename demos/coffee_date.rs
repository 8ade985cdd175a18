/// Coffee Date example — plays the bundled sample story with scripted choices.
///
/// The same story is played twice: once picking the warm options, once the
/// cold ones, to show how the choices move the stats and the derived mood.
///
/// Run with: cargo run --example coffee_date

use visual_novel_engine::core::config::EngineConfig;
use visual_novel_engine::core::graph::Step;
use visual_novel_engine::core::progress::MemoryStore;
use visual_novel_engine::core::reader::ReaderSession;
use visual_novel_engine::schema::scene::TransitionKind;
use visual_novel_engine::schema::story::Story;

fn main() {
    let story = Story::load_from_ron(std::path::Path::new("stories/coffee_shop.ron"))
        .expect("Failed to load coffee shop story");

    println!("========================================");
    println!("   {}", story.title.to_uppercase());
    println!("   {} scenes", story.len());
    println!("========================================");
    println!();

    play_through(&story, "The Sweet Route", &[0, 0]);
    play_through(&story, "The Sour Route", &[2, 2]);
}

fn play_through(story: &Story, route: &str, picks: &[usize]) {
    println!("######## {} ########", route);
    println!();

    let mut session = ReaderSession::start(story.clone(), MemoryStore::new(), EngineConfig::default())
        .expect("Failed to start reader session");
    let mut picks = picks.iter().copied();

    while let Some(scene) = session.current_scene() {
        println!("--- Scene {}: {} ---", scene.id, scene.title);
        println!("[{} | {}]", scene.character_name, scene.mood.as_deref().unwrap_or("?"));
        println!("\"{}\"", scene.dialogue);

        let step = match scene.transition_kind() {
            TransitionKind::Choice => {
                let index = picks.next().unwrap_or(0);
                println!("> {}", scene.choices()[index].text);
                session.choose(index).expect("Scripted choice failed")
            }
            TransitionKind::Auto | TransitionKind::Terminal => {
                session.advance().expect("Advance failed")
            }
        };
        if let Step::Ended = step {
            println!();
            println!("--- The End ---");
        }
        println!();
    }

    println!("Final stats:");
    for (name, value) in session.stats().iter() {
        println!("  {:<14} {:>3}", name, value);
    }
    println!("Mood: {}", session.mood());
    println!();
}
