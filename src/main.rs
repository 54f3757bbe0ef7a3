use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracklift::progress::{MemoryProgressStore, ProgressStore};
use tracklift::{Platform, config, detect_platform};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "tracklift",
    about = "Extract playlist metadata from music streaming platforms",
    long_about = "Extract playlist metadata (title, creator, track list) from \
    Netease Music, QQ Music and Apple Music.\n\n\
    Examples:\n\
      tracklift serve --port 3000\n\
      tracklift extract https://music.163.com/playlist?id=123456\n\
      tracklift extract -p qq https://y.qq.com/n/ryqq/playlist/789 --json\n\
      tracklift extract -t <user-token> https://music.apple.com/us/playlist/mix/pl.u-abc"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP extraction server
    Serve {
        /// Port to listen on (defaults to $PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Extract a playlist once and print the result
    Extract {
        /// Playlist URL
        url: String,

        /// Platform tag (netease, qq, apple); auto-detected when omitted
        #[arg(short, long)]
        platform: Option<String>,

        /// Apple Music user token for authorized extraction
        #[arg(short, long)]
        token: Option<String>,

        /// Print the raw JSON result instead of a readable listing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracklift=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or_else(config::server_port);
            tracklift::server::serve(port).await?;
        }
        Commands::Extract {
            url,
            platform,
            token,
            json,
        } => {
            extract_once(url, platform, token, json).await?;
        }
    }

    Ok(())
}

async fn extract_once(
    url: String,
    platform: Option<String>,
    token: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let platform = match platform {
        Some(tag) => tag
            .parse::<Platform>()
            .map_err(|_| anyhow::anyhow!("unsupported platform: {tag}"))?,
        None => detect_platform(&url)
            .ok_or_else(|| anyhow::anyhow!("cannot detect platform from URL: {url}"))?,
    };

    let store: Arc<dyn ProgressStore> = Arc::new(MemoryProgressStore::default());
    let result = tracklift::extract_playlist(platform, &url, None, token, store).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let info = &result.playlist_info;
    println!("Playlist: {}", info.title);
    println!("Creator:  {}", info.creator);
    println!("Songs:    {}", info.song_count);
    if let Some(note) = &info.note {
        println!("Note:     {note}");
    }
    println!();

    for song in &result.songs {
        println!("[{}] {}", song.id, song.title);
        println!("    Artist: {}", song.artist);
        println!("    Album: {}", song.album);
        println!("    Duration: {}", song.duration);
        println!();
    }

    Ok(())
}
