// ============================================================================
// ChannelFE CLI — headless channel shifting via command-line arguments
// ============================================================================
//
// Usage examples:
//   channelfe --input photo.png --red 12,0 --output result.png
//   channelfe -i photo.jpg --swap red,blue -o out.png
//   channelfe -i "shots/*.jpg" --green 0,30 --output-dir processed/
//
// No GUI is opened in CLI mode. Each input runs through the same
// EditPipeline as the GUI: load → set shifts → set swap → render → save.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{SaveFormat, encode_and_write, load_image_sync};
use crate::ops::channels::ChannelIndex;
use crate::pipeline::EditPipeline;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// ChannelFE headless channel shifter.
///
/// Apply per-channel wraparound shifts and a channel swap to image files
/// without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "channelfe",
    about = "ChannelFE headless channel-shift processor",
    long_about = "Apply per-channel wraparound shifts and an optional channel swap to\n\
                  image files without opening the GUI. Reads PNG, JPEG, WEBP, BMP and\n\
                  TGA; writes lossless PNG or BMP.\n\n\
                  Example:\n  \
                  channelfe --input photo.png --red 12,0 --swap red,blue --output result.png\n  \
                  channelfe -i \"*.jpg\" --blue 0,40 --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Red channel shift as "DX,DY" (wraparound; clamped to image size).
    #[arg(long, value_name = "DX,DY")]
    pub red: Option<String>,

    /// Green channel shift as "DX,DY".
    #[arg(long, value_name = "DX,DY")]
    pub green: Option<String>,

    /// Blue channel shift as "DX,DY".
    #[arg(long, value_name = "DX,DY")]
    pub blue: Option<String>,

    /// Swap the content of two channels, e.g. "red,blue" or "r,b".
    #[arg(long, value_name = "SRC,TGT")]
    pub swap: Option<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png or bmp (both lossless).
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    // Parse edit parameters up front so a typo fails before any file work.
    let shifts = match parse_shift_args(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let swap = match args.swap.as_deref().map(parse_swap).transpose() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let save_format = parse_format(args.format.as_deref(), args.output.as_deref());

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        match run_one(input_path, &output_path, &shifts, swap, save_format) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    shifts: &[Option<(u32, u32)>; 3],
    swap: Option<(ChannelIndex, ChannelIndex)>,
    format: SaveFormat,
) -> Result<(), String> {
    // -- Step 1: Load ------------------------------------------------------
    let source = load_image_sync(input).map_err(|e| format!("load failed: {}", e))?;

    let mut pipeline = EditPipeline::new();
    pipeline
        .load_image(&source)
        .map_err(|e| format!("load failed: {}", e))?;

    // -- Step 2: Apply edit parameters --------------------------------------
    for channel in ChannelIndex::all() {
        if let Some((dx, dy)) = shifts[channel.offset()] {
            pipeline.set_shift(channel, dx, dy);
        }
    }
    if let Some((src, tgt)) = swap {
        pipeline.set_selection(src, tgt);
    }

    // -- Step 3: Render and save --------------------------------------------
    let rendered = pipeline
        .render()
        .ok_or_else(|| "render produced no image".to_string())?;
    encode_and_write(&rendered, output, format).map_err(|e| format!("save failed: {}", e))?;

    Ok(())
}

// ============================================================================
// Argument parsing helpers
// ============================================================================

fn parse_shift_args(args: &CliArgs) -> Result<[Option<(u32, u32)>; 3], String> {
    let parse = |label: &str, value: Option<&str>| -> Result<Option<(u32, u32)>, String> {
        value.map(|v| parse_shift(label, v)).transpose()
    };
    Ok([
        parse("--red", args.red.as_deref())?,
        parse("--green", args.green.as_deref())?,
        parse("--blue", args.blue.as_deref())?,
    ])
}

/// Parse a "DX,DY" pair. Negative or non-numeric values are rejected here;
/// values beyond the image size are clamped later by the pipeline.
fn parse_shift(label: &str, s: &str) -> Result<(u32, u32), String> {
    let (dx, dy) = s
        .split_once(',')
        .ok_or_else(|| format!("{} expects \"DX,DY\", got '{}'", label, s))?;
    let dx = dx
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("{}: '{}' is not a non-negative integer", label, dx.trim()))?;
    let dy = dy
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("{}: '{}' is not a non-negative integer", label, dy.trim()))?;
    Ok((dx, dy))
}

/// Parse a "SRC,TGT" channel pair, e.g. "red,blue" or "r,b".
fn parse_swap(s: &str) -> Result<(ChannelIndex, ChannelIndex), String> {
    let (src, tgt) = s
        .split_once(',')
        .ok_or_else(|| format!("--swap expects \"SRC,TGT\", got '{}'", s))?;
    let src = ChannelIndex::parse(src)
        .ok_or_else(|| format!("--swap: unknown channel '{}'", src.trim()))?;
    let tgt = ChannelIndex::parse(tgt)
        .ok_or_else(|| format!("--swap: unknown channel '{}'", tgt.trim()))?;
    Ok((src, tgt))
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from
/// the output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> SaveFormat {
    if let Some(f) = format_arg {
        return SaveFormat::parse(f);
    }
    if let Some(out) = output {
        return SaveFormat::parse(out.extension().and_then(|e| e.to_str()).unwrap_or(""));
    }
    SaveFormat::Png
}

// ============================================================================
// Path helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_pairs_parse_and_reject_garbage() {
        assert_eq!(parse_shift("--red", "12,0").unwrap(), (12, 0));
        assert_eq!(parse_shift("--red", " 3 , 7 ").unwrap(), (3, 7));
        assert!(parse_shift("--red", "12").is_err());
        assert!(parse_shift("--red", "-1,0").is_err());
        assert!(parse_shift("--red", "a,b").is_err());
    }

    #[test]
    fn swap_pairs_accept_names_and_shorthands() {
        assert_eq!(
            parse_swap("red,blue").unwrap(),
            (ChannelIndex::Red, ChannelIndex::Blue)
        );
        assert_eq!(
            parse_swap("g,B").unwrap(),
            (ChannelIndex::Green, ChannelIndex::Blue)
        );
        assert!(parse_swap("red").is_err());
        assert!(parse_swap("red,alpha").is_err());
    }

    #[test]
    fn format_inferred_from_output_extension() {
        assert_eq!(
            parse_format(None, Some(Path::new("out.bmp"))),
            SaveFormat::Bmp
        );
        assert_eq!(
            parse_format(None, Some(Path::new("out.png"))),
            SaveFormat::Png
        );
        assert_eq!(parse_format(Some("bmp"), None), SaveFormat::Bmp);
        assert_eq!(parse_format(None, None), SaveFormat::Png);
    }

    #[test]
    fn output_path_avoids_clobbering_input() {
        let p = build_output_path(Path::new("dir/shot.png"), None, None, SaveFormat::Png);
        assert_eq!(p, Some(PathBuf::from("dir/shot_out.png")));

        let p = build_output_path(Path::new("dir/shot.jpg"), None, None, SaveFormat::Png);
        assert_eq!(p, Some(PathBuf::from("dir/shot.png")));

        let p = build_output_path(
            Path::new("dir/shot.jpg"),
            None,
            Some(Path::new("out")),
            SaveFormat::Bmp,
        );
        assert_eq!(p, Some(PathBuf::from("out/shot.bmp")));
    }
}
