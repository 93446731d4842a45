use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use nor_log_tool::{
    FlashImage,
    region,
};
use nor_logger::print::Format;

#[derive(Parser)]
#[command(name = "nor-log-tool")]
#[command(about = "Decoder for nor-logger flash images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record of the log
    Dump {
        /// Flash image file path
        image: PathBuf,

        /// Start of the log region (must be a multiple of 4096)
        #[arg(short, long, value_parser = parse_size)]
        base: Option<u32>,

        /// Size of the log region, defaults to the rest of the image
        #[arg(short, long, value_parser = parse_size)]
        size: Option<u32>,

        /// Output format: text or csv
        #[arg(short, long, default_value = "text", value_parser = parse_format)]
        format: Format,

        /// Output file path, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print record count, used bytes and timestamp range
    Stats {
        /// Flash image file path
        image: PathBuf,

        /// Start of the log region (must be a multiple of 4096)
        #[arg(short, long, value_parser = parse_size)]
        base: Option<u32>,

        /// Size of the log region, defaults to the rest of the image
        #[arg(short, long, value_parser = parse_size)]
        size: Option<u32>,
    },
}

fn parse_size(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u32>().map_err(|e| e.to_string())
    }
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse::<Format>().map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump {
            image,
            base,
            size,
            format,
            output,
        } => {
            let mut flash = FlashImage::from_file(&image)?;
            let geometry = region(flash.len(), base, size)?;

            let count = match &output {
                Some(path) => {
                    let mut out = BufWriter::new(File::create(path)?);
                    let count = nor_log_tool::dump_image(&mut flash, geometry, format, &mut out)?;
                    out.flush()?;
                    count
                }
                None => {
                    let mut out = io::stdout().lock();
                    nor_log_tool::dump_image(&mut flash, geometry, format, &mut out)?
                }
            };

            if let Some(path) = output {
                println!("Wrote {} records to {}", count, path.display());
            }

            Ok(())
        }
        Commands::Stats { image, base, size } => {
            let mut flash = FlashImage::from_file(&image)?;
            let geometry = region(flash.len(), base, size)?;

            println!("Image: {} ({} bytes)", image.display(), flash.len());
            println!(
                "Region: {:#08x} .. {:#08x}",
                geometry.base(),
                geometry.end()
            );
            print!("{}", nor_log_tool::stats(&mut flash, geometry)?);

            Ok(())
        }
    }
}
