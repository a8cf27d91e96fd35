use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use pillar_media::{
    CropResizer, MediaConfig, TargetSize, ThumbnailGenerator, VideoEncoder, VideoFormat,
    VideoProbe,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pillar-media", about = "Thumbnail and video helpers")]
struct Cli {
    /// JSON config with the thumbnail table and tool paths
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every configured thumbnail next to an image
    Thumbs {
        source: PathBuf,
        /// Print size, resolution and checksum of new thumbnails
        #[arg(long)]
        stats: bool,
    },
    /// Resize and crop one image to an exact size
    Crop {
        source: PathBuf,
        destination: PathBuf,
        width: u32,
        height: u32,
        /// top, middle or bottom (left, center, right also accepted)
        #[arg(long, default_value = "middle")]
        anchor: String,
    },
    /// Print duration and resolution of a video
    Probe { file: PathBuf },
    /// Transcode a video to mp4 or webm
    Encode {
        source: PathBuf,
        #[arg(value_enum)]
        format: VideoFormat,
        #[arg(long, default_value_t = 720)]
        height: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => MediaConfig::load(path)?,
        None => MediaConfig::default(),
    };

    match cli.command {
        Commands::Thumbs { source, stats } => {
            let results = ThumbnailGenerator::from_config(&config).generate(&source, stats)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Crop {
            source,
            destination,
            width,
            height,
            anchor,
        } => {
            let target = TargetSize::new(width, height)?;
            CropResizer::new().resize_and_crop_file(&source, &destination, target, &anchor)?;
        }
        Commands::Probe { file } => {
            let info = VideoProbe::from_config(&config).probe(&file).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Encode {
            source,
            format,
            height,
        } => {
            let encoded = VideoEncoder::from_config(&config)
                .encode(&source, format, height)
                .await?;
            let Some(path) = encoded else {
                return Err(eyre!("encoding {} failed", source.display()));
            };
            println!("{}", path.display());
        }
    }

    Ok(())
}
