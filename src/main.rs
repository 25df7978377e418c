use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod library;
mod normalize;
mod player;
mod radio;
mod rank;

use config::Settings;
use library::{import_dir, probe_file, ImportOptions, Library, Track};
use normalize::{AudioFormat, Normalizer, Toolchain};
use player::{PlaybackState, Player, SessionSnapshot, Source};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vivace=info")),
        )
        .init();

    let settings = Settings::load()?;
    settings.validate().map_err(io::Error::other)?;

    // The conversion tool is probed exactly once; without it radio keeps
    // working and only local playback/editing is disabled.
    let normalizer = Arc::new(Normalizer::new(
        Toolchain::detect(&settings.tools.ffmpeg_path).ok(),
    ));
    if !normalizer.available() {
        warn!("conversion tool missing: local playback and editing are disabled");
    }
    let library = Arc::new(Library::open(&settings.library.db_path)?);

    let plays = library.clone();
    let player = Player::new(
        normalizer.clone(),
        settings.audio.initial_volume,
        Box::new(move |path| {
            if let Err(err) = plays.record_play_by_path(path) {
                warn!(path = %path.display(), %err, "could not record the play");
            }
        }),
    )?;

    info!(stations = settings.stations.len(), "vivace ready");
    repl(&settings, &library, &normalizer, &player)
}

fn repl(
    settings: &Settings,
    library: &Library,
    normalizer: &Normalizer,
    player: &Player,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("vivace - type `help` for commands");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match run_command(command, &args, settings, library, normalizer, player) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => println!("error: {err}"),
        }
    }
    player.shutdown();
    Ok(())
}

/// Dispatch one console command. Returns `true` on quit.
fn run_command(
    command: &str,
    args: &[&str],
    settings: &Settings,
    library: &Library,
    normalizer: &Normalizer,
    player: &Player,
) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        "help" => print_help(),
        "open" => {
            let path = PathBuf::from(args.join(" "));
            if path.as_os_str().is_empty() {
                println!("usage: open <path>");
                return Ok(false);
            }
            if !path.is_file() {
                println!("no such file: {}", path.display());
                return Ok(false);
            }
            AudioFormat::from_path(&path)?;
            // First successful open is what creates the library row.
            let (title, duration) = probe_file(&path);
            let id = library.add_or_update(&path, &title)?;
            if let Some(duration) = duration {
                library.cache_duration(id, duration)?;
            }
            player.load(Source::LocalFile(path))?;
            println!("loading \"{title}\"...");
        }
        "play" => {
            if args.is_empty() {
                println!("usage: play <track-id|path>");
                return Ok(false);
            }
            // A numeric argument is a library id, anything else a path.
            let track = match args.first().and_then(|s| s.parse::<i64>().ok()) {
                Some(id) => library.get(id)?,
                None => library.find_by_path(Path::new(&args.join(" ")))?,
            };
            println!("loading \"{}\"...", track.title);
            player.load(Source::LocalFile(track.path))?;
        }
        "pause" => player.pause()?,
        "resume" => player.resume()?,
        "stop" => player.stop()?,
        "seek" => {
            let seconds = parse_arg::<f64>(args.first(), "seek <seconds>")?;
            player.seek(seconds)?;
        }
        "volume" => {
            let volume = parse_arg::<f32>(args.first(), "volume <0.0-1.0>")?;
            player.set_volume(volume)?;
        }
        "loop" => match args.first().copied() {
            Some("on") => player.set_loop(true)?,
            Some("off") => player.set_loop(false)?,
            _ => println!("usage: loop on|off"),
        },
        "stations" => {
            for (i, station) in settings.stations.iter().enumerate() {
                println!("{:>3}  {}", i + 1, station.name);
                if !station.description.is_empty() {
                    println!("     {}", station.description);
                }
            }
        }
        "radio" => {
            let number = parse_arg::<usize>(args.first(), "radio <station-number>")?;
            let Some(station) = number.checked_sub(1).and_then(|i| settings.stations.get(i))
            else {
                println!("no such station; see `stations`");
                return Ok(false);
            };
            println!("tuning in to {}...", station.name);
            player.load(Source::RadioStream(station.clone()))?;
        }
        "list" => {
            for track in rank::rank(library.list_all()?) {
                println!("{}", track_line(&track));
            }
        }
        "find" => {
            if args.is_empty() {
                println!("usage: find <text>");
                return Ok(false);
            }
            for track in library.find(&args.join(" "))? {
                println!("{}", track_line(&track));
            }
        }
        "remove" => {
            let id = parse_arg::<i64>(args.first(), "remove <track-id>")?;
            let track = library.get(id)?;
            print!("remove \"{}\" from the library? [y/N] ", track.title);
            io::stdout().flush()?;
            let mut answer = String::new();
            io::stdin().lock().read_line(&mut answer)?;
            if answer.trim().eq_ignore_ascii_case("y") {
                library.remove(id)?;
                println!("removed");
            } else {
                println!("kept");
            }
        }
        "trim" => {
            if args.len() != 4 {
                println!("usage: trim <input> <start-secs> <end-secs> <output>");
                return Ok(false);
            }
            let input = Path::new(args[0]);
            let start: f64 = args[1].parse()?;
            let end: f64 = args[2].parse()?;
            let output = Path::new(args[3]);

            let buffer = normalizer.trim(input, start, end)?;
            normalizer.save(&buffer, output, AudioFormat::from_path(output)?)?;
            println!("saved {}", output.display());
        }
        "import" => {
            if args.is_empty() {
                println!("usage: import <directory>");
                return Ok(false);
            }
            let dir = PathBuf::from(args.join(" "));
            let options = ImportOptions::from(&settings.library);
            let imported = import_dir(library, &dir, &options)?;
            println!("imported {imported} track(s)");
        }
        "status" => print_status(&player.snapshot()),
        "quit" | "exit" => return Ok(true),
        other => println!("unknown command `{other}`; type `help`"),
    }
    Ok(false)
}

fn parse_arg<T: std::str::FromStr>(arg: Option<&&str>, usage: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = arg else {
        return Err(format!("usage: {usage}"));
    };
    raw.parse().map_err(|e| format!("usage: {usage} ({e})"))
}

fn print_help() {
    println!("  open <path>                      register a file and play it");
    println!("  play <track-id|path>             play a library track");
    println!("  pause | resume | stop            transport controls");
    println!("  seek <seconds>                   jump inside the current file");
    println!("  volume <0.0-1.0>                 set output volume");
    println!("  loop on|off                      repeat the current file");
    println!("  stations                         list the configured stations");
    println!("  radio <station-number>           tune in to a live station");
    println!("  list                             library, most played first");
    println!("  find <text>                      search titles and paths");
    println!("  remove <track-id>                delete a track from the library");
    println!("  trim <in> <start> <end> <out>    cut a slice and save it");
    println!("  import <directory>               register every audio file in a tree");
    println!("  status                           show the playback session");
    println!("  quit");
}

fn print_status(snapshot: &SessionSnapshot) {
    let state = match snapshot.state {
        PlaybackState::Idle => "idle",
        PlaybackState::Loading => "loading",
        PlaybackState::Playing => "playing",
        PlaybackState::Paused => "paused",
        PlaybackState::Stopped => "stopped",
        PlaybackState::Error => "error",
    };
    // Position only makes sense for sources that have one.
    let has_position = snapshot.capabilities().is_some_and(|c| c.has_duration);
    match (&snapshot.name, snapshot.duration) {
        (Some(name), Some(duration)) if has_position => println!(
            "{state}  \"{name}\"  {} / {}{}",
            fmt_duration(snapshot.elapsed),
            fmt_duration(duration),
            if snapshot.looping { "  [loop]" } else { "" },
        ),
        (Some(name), None) if !has_position => println!("{state}  \"{name}\"  (live)"),
        (Some(name), _) => println!("{state}  \"{name}\""),
        _ => println!("{state}"),
    }
    println!("volume {:.2}", snapshot.volume);
    if let Some(err) = &snapshot.error {
        println!("last failure: {err}");
    }
}

fn track_line(track: &Track) -> String {
    let duration = track
        .duration
        .map(|d| fmt_duration(d))
        .unwrap_or_else(|| "-:--".to_string());
    format!(
        "{:>4}  {:<40}  {:>5} plays  {}",
        track.id, track.title, track.play_count, duration
    )
}

fn fmt_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}
