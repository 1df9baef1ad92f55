//! doclib - Command-line interface for the document library store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use doclib_core::{
    FavoriteFile, FileKind, LibraryConfig, LiveQuery, Note, ReadingPosition, RecentFile,
};
use doclib_repo::{Fragment, Library};

/// doclib - Local document library: recents, favorites, notes, reading
/// positions, and text search
#[derive(Parser)]
#[command(name = "doclib")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (default: platform data dir)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage recently opened files
    Recent {
        #[command(subcommand)]
        action: RecentAction,
    },

    /// Manage favorites
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },

    /// Manage notes
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Manage reading positions
    Position {
        #[command(subcommand)]
        action: PositionAction,
    },

    /// Manage the search index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Search indexed document text (case-sensitive substring match)
    Search {
        /// Search query; empty matches every fragment
        query: String,
    },

    /// Show row counts and storage size
    Stats,

    /// Subscribe to a live query and print each emission
    Watch {
        #[command(subcommand)]
        target: WatchTarget,
    },
}

#[derive(Subcommand)]
enum RecentAction {
    /// List recent files, most recently opened first
    List {
        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Record that a file was opened
    Add {
        /// File path
        path: String,

        /// MIME type, if known
        #[arg(long)]
        mime: Option<String>,
    },

    /// Forget one recent file
    Remove {
        /// File path
        path: String,
    },

    /// Forget all recent files
    Clear,
}

#[derive(Subcommand)]
enum FavoriteAction {
    /// List favorites, most recently added first
    List,

    /// Mark a file as favorite
    Add {
        /// File path
        path: String,

        /// MIME type, if known
        #[arg(long)]
        mime: Option<String>,
    },

    /// Unmark a favorite (no-op when it was never added)
    Remove {
        /// File path
        path: String,
    },

    /// Check whether a path is favorited
    Check {
        /// File path
        path: String,
    },
}

#[derive(Subcommand)]
enum NoteAction {
    /// List notes, most recently modified first
    List,

    /// Create a note
    Add {
        /// Note title
        title: String,

        /// Note body
        content: String,

        /// Link the note to a file path
        #[arg(long)]
        file: Option<String>,
    },

    /// Show a note
    Show {
        /// Note id
        id: i64,
    },

    /// Replace a note's title and body
    Edit {
        /// Note id
        id: i64,

        /// New title
        title: String,

        /// New body
        content: String,
    },

    /// Delete a note
    Delete {
        /// Note id
        id: i64,
    },
}

#[derive(Subcommand)]
enum PositionAction {
    /// Save the reading position for a file
    Save {
        /// File path
        path: String,

        /// Zero-based page number
        page: i64,

        /// Scroll offset within the page (0.0-1.0)
        #[arg(default_value = "0.0")]
        offset: f32,
    },

    /// Show the saved position for a file
    Show {
        /// File path
        path: String,
    },

    /// List the five most recently read files
    Recent,

    /// Delete the saved position for a file
    Delete {
        /// File path
        path: String,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Index text fragments for a file, replacing any previous index
    File {
        /// File path
        path: String,

        /// Text fragments, one per page in order
        #[arg(required = true)]
        fragments: Vec<String>,
    },

    /// Drop the index for a file
    Remove {
        /// File path
        path: String,
    },

    /// Drop the whole index
    Clear,
}

#[derive(Subcommand)]
enum WatchTarget {
    /// Follow the favorites list
    Favorites,

    /// Follow the recent-files list
    Recents {
        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Follow a search query
    Search {
        /// Search query
        query: String,
    },
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(database: Option<PathBuf>) -> Result<LibraryConfig, Box<dyn std::error::Error>> {
    let mut config = LibraryConfig::load_default()?;
    if let Some(path) = database {
        config.database.path = path;
    }
    Ok(config)
}

/// Take the current snapshot of a live query and release the subscription.
async fn snapshot<T>(mut query: LiveQuery<T>) -> Result<T, Box<dyn std::error::Error>> {
    let result = query.next().await.ok_or("subscription ended early")??;
    query.cancel();
    Ok(result)
}

fn file_record_parts(path: &str) -> (String, i64) {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    let size = std::fs::metadata(path).map(|m| m.len() as i64).unwrap_or(0);
    (name, size)
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = load_config(cli.database)?;
    let library = Library::open(&config)?;
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            println!("Database ready at {:?}", config.database.path);
        }
        Commands::Recent { action } => {
            recent_command(&library, &config, action, json).await?;
        }
        Commands::Favorite { action } => {
            favorite_command(&library, action, json).await?;
        }
        Commands::Note { action } => {
            note_command(&library, action, json).await?;
        }
        Commands::Position { action } => {
            position_command(&library, action, json).await?;
        }
        Commands::Index { action } => {
            index_command(&library, action).await?;
        }
        Commands::Search { query } => {
            let entries = snapshot(library.search.search(&query)).await?;
            if json {
                print_json(&entries);
            } else if entries.is_empty() {
                println!("No matches");
            } else {
                for entry in entries {
                    match entry.page_number {
                        Some(page) => println!("{} p.{}: {}", entry.file_path, page, entry.content),
                        None => println!("{}: {}", entry.file_path, entry.content),
                    }
                }
            }
        }
        Commands::Stats => {
            let stats = library.stats().await?;
            if json {
                print_json(&stats);
            } else {
                println!("Recent files:      {}", stats.recent_files);
                println!("Favorites:         {}", stats.favorites);
                println!("Notes:             {}", stats.notes);
                println!("Reading positions: {}", stats.reading_positions);
                println!("Search fragments:  {}", stats.search_entries);
                println!("Storage bytes:     {}", stats.storage_bytes);
            }
        }
        Commands::Watch { target } => {
            watch_command(&library, &config, target).await?;
        }
    }

    Ok(())
}

async fn recent_command(
    library: &Library,
    config: &LibraryConfig,
    action: RecentAction,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RecentAction::List { limit } => {
            let limit = limit.unwrap_or(config.recents.default_limit);
            let files = snapshot(library.recents.recent_files(limit)).await?;
            if json {
                print_json(&files);
            } else {
                for file in files {
                    println!("{} ({}, {} bytes)", file.path, file.file_type, file.size);
                }
            }
        }
        RecentAction::Add { path, mime } => {
            let (name, size) = file_record_parts(&path);
            library
                .recents
                .add(RecentFile::new(&path, &name, size, mime.as_deref()))
                .await?;
            println!("Recorded {}", path);
        }
        RecentAction::Remove { path } => {
            library.recents.remove(&path).await?;
            println!("Removed {}", path);
        }
        RecentAction::Clear => {
            library.recents.clear().await?;
            println!("Cleared recent files");
        }
    }
    Ok(())
}

async fn favorite_command(
    library: &Library,
    action: FavoriteAction,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        FavoriteAction::List => {
            let favorites = snapshot(library.favorites.all()).await?;
            if json {
                print_json(&favorites);
            } else {
                for favorite in favorites {
                    println!("{} ({})", favorite.path, favorite.file_type);
                }
            }
        }
        FavoriteAction::Add { path, mime } => {
            let (name, size) = file_record_parts(&path);
            library
                .favorites
                .add(FavoriteFile::new(&path, &name, size, mime.as_deref()))
                .await?;
            println!("Favorited {}", path);
        }
        FavoriteAction::Remove { path } => {
            library.favorites.remove(&path).await?;
            println!("Unfavorited {}", path);
        }
        FavoriteAction::Check { path } => {
            let favorited = snapshot(library.favorites.is_favorite(&path)).await?;
            println!("{}", favorited);
        }
    }
    Ok(())
}

async fn note_command(
    library: &Library,
    action: NoteAction,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        NoteAction::List => {
            let notes = snapshot(library.notes.all()).await?;
            if json {
                print_json(&notes);
            } else {
                for note in notes {
                    println!("[{}] {}", note.id, note.title);
                }
            }
        }
        NoteAction::Add {
            title,
            content,
            file,
        } => {
            let id = library
                .notes
                .save(Note::new(&title, &content, file.as_deref()))
                .await?;
            println!("Created note {}", id);
        }
        NoteAction::Show { id } => {
            match snapshot(library.notes.note(id)).await? {
                Some(note) => {
                    if json {
                        print_json(&note);
                    } else {
                        println!("# {}", note.title);
                        if let Some(path) = &note.file_path {
                            println!("({})", path);
                        }
                        println!("{}", note.content);
                    }
                }
                None => println!("No note with id {}", id),
            }
        }
        NoteAction::Edit { id, title, content } => {
            match snapshot(library.notes.note(id)).await? {
                Some(note) => {
                    library.notes.save(note.edited(&title, &content)).await?;
                    println!("Updated note {}", id);
                }
                None => println!("No note with id {}", id),
            }
        }
        NoteAction::Delete { id } => {
            library.notes.delete(id).await?;
            println!("Deleted note {}", id);
        }
    }
    Ok(())
}

async fn position_command(
    library: &Library,
    action: PositionAction,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PositionAction::Save { path, page, offset } => {
            library
                .positions
                .save(ReadingPosition::new(&path, page, offset))
                .await?;
            println!("Saved position for {}", path);
        }
        PositionAction::Show { path } => match snapshot(library.positions.position(&path)).await? {
            Some(position) => {
                if json {
                    print_json(&position);
                } else {
                    println!("page {} at {:.0}%", position.page_number, position.scroll_offset * 100.0);
                }
            }
            None => println!("No position saved for {}", path),
        },
        PositionAction::Recent => {
            let positions = snapshot(library.positions.recent()).await?;
            if json {
                print_json(&positions);
            } else {
                for position in positions {
                    println!("{} (page {})", position.file_path, position.page_number);
                }
            }
        }
        PositionAction::Delete { path } => {
            library.positions.delete(&path).await?;
            println!("Deleted position for {}", path);
        }
    }
    Ok(())
}

async fn index_command(
    library: &Library,
    action: IndexAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        IndexAction::File { path, fragments } => {
            let kind = FileKind::from_path(&path);
            let fragments: Vec<_> = fragments
                .into_iter()
                .enumerate()
                .map(|(page, text)| Fragment::new(Some(page as i64), text))
                .collect();
            let count = fragments.len();

            library.search.index_document(&path, fragments, kind).await?;
            println!("Indexed {} fragments for {}", count, path);
        }
        IndexAction::Remove { path } => {
            library.search.remove(&path).await?;
            println!("Removed index for {}", path);
        }
        IndexAction::Clear => {
            library.search.clear().await?;
            println!("Cleared search index");
        }
    }
    Ok(())
}

async fn watch_command(
    library: &Library,
    config: &LibraryConfig,
    target: WatchTarget,
) -> Result<(), Box<dyn std::error::Error>> {
    match target {
        WatchTarget::Favorites => {
            let mut query = library.favorites.all();
            while let Some(result) = query.next().await {
                match result {
                    Ok(favorites) => {
                        let paths: Vec<_> = favorites.iter().map(|f| f.path.as_str()).collect();
                        println!("favorites: {:?}", paths);
                    }
                    Err(e) => eprintln!("recompute failed: {}", e),
                }
            }
        }
        WatchTarget::Recents { limit } => {
            let limit = limit.unwrap_or(config.recents.default_limit);
            let mut query = library.recents.recent_files(limit);
            while let Some(result) = query.next().await {
                match result {
                    Ok(files) => {
                        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
                        println!("recents: {:?}", paths);
                    }
                    Err(e) => eprintln!("recompute failed: {}", e),
                }
            }
        }
        WatchTarget::Search { query: text } => {
            let mut query = library.search.search(&text);
            while let Some(result) = query.next().await {
                match result {
                    Ok(entries) => println!("{} matches for {:?}", entries.len(), text),
                    Err(e) => eprintln!("recompute failed: {}", e),
                }
            }
        }
    }
    Ok(())
}
