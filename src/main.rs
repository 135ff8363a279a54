//! Veles CLI - inspect packaged movies and extract their scripts.
//!
//! This is the main entry point for the Veles command-line application.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use veles_director::{Directory, MemberType};

/// Veles - packaged movie inspection tool
#[derive(Parser)]
#[command(name = "veles")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the chunk tree as JSON
    Dump {
        /// Path to the movie file
        movie: PathBuf,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Extract script text for every script cast member
    Scripts {
        /// Path to the movie file
        movie: PathBuf,
    },

    /// Summarize the movie configuration
    Info {
        /// Path to the movie file
        movie: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Dump { movie, pretty } => dump(&movie, pretty),
        Commands::Scripts { movie } => scripts(&movie),
        Commands::Info { movie } => info(&movie),
    }
}

fn load(path: &PathBuf) -> Result<Directory> {
    let mut dir =
        Directory::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    dir.load()
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(dir)
}

fn dump(path: &PathBuf, pretty: bool) -> Result<()> {
    let dir = load(path)?;

    let chunks: Vec<_> = dir
        .chunk_keys()
        .into_iter()
        .filter_map(|key| {
            let handle = dir.registered(key)?;
            let json = handle.borrow().to_json();
            Some(json!({
                "fourCC": key.0.to_string(),
                "sectionID": key.1,
                "chunk": json,
            }))
        })
        .collect();

    let tree = json!({
        "initialMap": dir.initial_map.to_json(),
        "memoryMap": dir.memory_map.to_json(),
        "chunks": chunks,
    });

    let rendered = if pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };
    println!("{rendered}");
    Ok(())
}

fn scripts(path: &PathBuf) -> Result<()> {
    let dir = load(path)?;

    for &cast_key in dir.casts() {
        let Some(cast_handle) = dir.registered(cast_key) else {
            continue;
        };
        let cast = cast_handle.borrow();
        let Some(cast) = cast.as_cast() else { continue };
        println!("-- cast {}", cast.name);

        for (&member_id, member_handle) in &cast.members {
            let member = member_handle.borrow();
            let Some(member) = member.as_cast_member() else {
                continue;
            };
            if member.member_type != MemberType::Script {
                continue;
            }
            let Some(script_ref) = member.script else {
                continue;
            };
            let script_handle = dir.registered(script_ref.context).and_then(|ctx| {
                ctx.borrow()
                    .as_script_context()
                    .and_then(|ctx| ctx.scripts.get(&script_ref.ordinal).cloned())
            });
            let Some(script_handle) = script_handle else {
                continue;
            };
            let script = script_handle.borrow();
            let Some(script) = script.as_script() else {
                continue;
            };

            let name = member
                .info
                .as_ref()
                .map(|info| info.name.clone())
                .unwrap_or_default();
            println!("-- member {member_id} {name}");
            // Script text carries classic Mac line endings; normalize.
            let text = script
                .script_text(dir.dot_syntax)
                .unwrap_or_else(|| script.bytecode_text());
            println!("{}", text.replace('\r', "\n"));
        }
    }
    Ok(())
}

fn info(path: &PathBuf) -> Result<()> {
    let dir = load(path)?;
    let config_handle = dir.config().context("movie has no config chunk")?;
    let config = config_handle.borrow();
    let config = config.as_config().context("movie has no config chunk")?;

    println!("codec:        {}", dir.codec);
    println!("version:      {} (raw {})", dir.version, config.director_version);
    println!("file version: {}", config.file_version);
    println!(
        "stage:        {}x{}",
        config.movie_right - config.movie_left,
        config.movie_bottom - config.movie_top
    );
    println!("members:      {}..{}", config.min_member, config.max_member);
    println!("frame rate:   {}", config.frame_rate);
    println!("protection:   {}", config.protection);
    println!("checksum:     {:#010x}", config.checksum);
    println!("casts:        {}", dir.casts().len());
    Ok(())
}
