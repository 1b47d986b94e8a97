// Licensed under the Apache-2.0 license

//! Update Container Tool
//!
//! Packs the application image and the LittleFS image into the streamed
//! dual-image container (`update.zip`) accepted by the OTA page, and can
//! check or split an existing container.
//!
//! Despite the extension the container is not a zip archive: it is a 16-byte
//! header followed by the two images, so the device can flash both while the
//! upload is still streaming.
//!
//! # Examples
//!
//! Use `firmware.bin` and `littlefs.bin` next to the tool, write `./update.zip`:
//! ```bash
//! make-update-zip
//! ```
//!
//! Explicit paths:
//! ```bash
//! make-update-zip firmware.bin littlefs.bin update.zip
//! ```
//!
//! Check or split an existing container:
//! ```bash
//! make-update-zip --verify update.zip
//! make-update-zip --extract update.zip --dir out
//! ```
//!
//! Positional arguments are always paths, so an image named `verify` or
//! `help` is packed like any other file.

use anyhow::{Context, Result};
use clap::{Args, Parser};
use log::{debug, LevelFilter};
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use update_builder::{UpdateZipArgs, UpdateZipPaths};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    create: CreateArgs,

    /// Verify an existing update container instead of building one
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["extract", "firmware", "littlefs", "output"]
    )]
    verify: Option<PathBuf>,

    /// Split an update container into firmware.bin and littlefs.bin
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["firmware", "littlefs", "output"]
    )]
    extract: Option<PathBuf>,

    /// Output directory for --extract [default: .]
    #[arg(short, long, value_name = "DIRECTORY", requires = "extract")]
    dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Firmware app binary [default: firmware.bin next to this tool]
    #[arg(value_name = "FIRMWARE", env = "UPDATE_ZIP_FIRMWARE")]
    firmware: Option<PathBuf>,

    /// LittleFS image [default: littlefs.bin next to this tool]
    #[arg(value_name = "LITTLEFS", env = "UPDATE_ZIP_LITTLEFS")]
    littlefs: Option<PathBuf>,

    /// Output file [default: update.zip]
    #[arg(value_name = "OUTPUT", env = "UPDATE_ZIP_OUTPUT")]
    output: Option<PathBuf>,
}

impl From<&CreateArgs> for UpdateZipArgs {
    fn from(args: &CreateArgs) -> Self {
        UpdateZipArgs {
            firmware: args.firmware.clone(),
            filesystem: args.littlefs.clone(),
            output: args.output.clone(),
        }
    }
}

fn create(args: &CreateArgs) -> Result<()> {
    // Only look up the executable when a default input path is needed.
    let tool_dir = if args.firmware.is_none() || args.littlefs.is_none() {
        update_builder::tool_dir().context("Unable to locate the tool directory")?
    } else {
        PathBuf::new()
    };
    let paths = UpdateZipPaths::resolve(args.into(), &tool_dir);
    debug!("Resolved paths: {:?}", paths);

    let summary =
        update_builder::update_zip_create(&paths).context("Failed to build update container")?;

    println!("Wrote {}", summary.output.display());
    println!("  firmware: {} bytes", summary.firmware_size);
    println!("  littlefs: {} bytes", summary.filesystem_size);
    println!("Upload this file from the OTA page as update.zip");
    Ok(())
}

fn verify(file: &Path) -> Result<()> {
    let header = update_builder::update_zip_verify(file)
        .with_context(|| format!("Failed to verify {}", file.display()))?;

    println!("{} is a valid update container", file.display());
    println!("  firmware: {} bytes", header.firmware_size());
    println!("  littlefs: {} bytes", header.filesystem_size());
    Ok(())
}

fn extract(file: &Path, dir: &Path) -> Result<()> {
    let (firmware, filesystem) = update_builder::update_zip_extract(file, dir)
        .with_context(|| format!("Failed to extract {}", file.display()))?;

    println!("Extracted {}", file.display());
    println!("  firmware: {}", firmware.display());
    println!("  littlefs: {}", filesystem.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let _ = SimpleLogger::new()
        .with_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .env()
        .init();

    let result = match (&cli.verify, &cli.extract) {
        (Some(file), _) => verify(file),
        (None, Some(file)) => extract(file, cli.dir.as_deref().unwrap_or(Path::new("."))),
        (None, None) => create(&cli.create),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positionals_override_independently() {
        let cli = Cli::try_parse_from(["make-update-zip", "app.bin"]).unwrap();
        assert!(cli.verify.is_none() && cli.extract.is_none());
        let args = UpdateZipArgs::from(&cli.create);
        assert_eq!(args.firmware, Some(PathBuf::from("app.bin")));

        let cli =
            Cli::try_parse_from(["make-update-zip", "app.bin", "fs.bin", "out.zip"]).unwrap();
        let paths = UpdateZipPaths::resolve((&cli.create).into(), Path::new("/tools"));
        assert_eq!(paths.firmware, Path::new("app.bin"));
        assert_eq!(paths.filesystem, Path::new("fs.bin"));
        assert_eq!(paths.output, Path::new("out.zip"));

        assert!(Cli::try_parse_from(["make-update-zip", "a", "b", "c", "d"]).is_err());
    }

    #[test]
    fn test_positionals_named_like_commands() {
        let cli =
            Cli::try_parse_from(["make-update-zip", "verify", "help", "extract"]).unwrap();
        assert!(cli.verify.is_none() && cli.extract.is_none());
        assert_eq!(cli.create.firmware, Some(PathBuf::from("verify")));
        assert_eq!(cli.create.littlefs, Some(PathBuf::from("help")));
        assert_eq!(cli.create.output, Some(PathBuf::from("extract")));

        let cli = Cli::try_parse_from(["make-update-zip", "create", "fs.bin"]).unwrap();
        assert_eq!(cli.create.firmware, Some(PathBuf::from("create")));
    }

    #[test]
    fn test_verify_and_extract_flags() {
        let cli =
            Cli::try_parse_from(["make-update-zip", "-v", "--verify", "update.zip"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.verify, Some(PathBuf::from("update.zip")));
        assert!(cli.extract.is_none());

        let cli = Cli::try_parse_from(["make-update-zip", "--extract", "update.zip"]).unwrap();
        assert_eq!(cli.extract, Some(PathBuf::from("update.zip")));
        assert_eq!(cli.dir, None);

        let cli = Cli::try_parse_from(["make-update-zip", "--extract", "update.zip", "-d", "out"])
            .unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("out")));

        for args in [
            &["make-update-zip", "--verify", "a.zip", "--extract", "b.zip"][..],
            &["make-update-zip", "--verify", "update.zip", "app.bin"][..],
            &["make-update-zip", "--extract", "update.zip", "app.bin", "fs.bin"][..],
            &["make-update-zip", "--dir", "out"][..],
            &["make-update-zip", "--verify", "update.zip", "--dir", "out"][..],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }
}
