use std::path::{Path, PathBuf};
use std::process;

use fits_cutout::{
    cutout, raster_format, CutoutRequest, ImageSource, KeywordWcs, OutputFormat, RegionSpec, Wcs,
};

const USAGE: &str = "Usage: fitscut <file.fits> [options]

Cut a region out of a FITS image.

Region (choose one):
  --ra DEG --dec DEG --radius DEG   circle on the sky
  --x N --y N --width N --height N  pixel rectangle (0-based, x/y may be negative)

Options:
  --hdu N              HDU to read (default 0)
  --plane N            cube plane to keep (default: all planes)
  --format FMT         fits, png, gif, or auto (default fits)
  --delay MS           animated GIF frame delay in milliseconds
  -o, --output PATH    output file (default: derived from the input name)";

struct Options {
    input: PathBuf,
    output: Option<PathBuf>,
    hdu: usize,
    plane: Option<usize>,
    format: Option<String>,
    delay_ms: Option<u32>,
    ra: Option<f64>,
    dec: Option<f64>,
    radius: Option<f64>,
    x: Option<i64>,
    y: Option<i64>,
    width: Option<i64>,
    height: Option<i64>,
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<&String>) -> Result<T, String> {
    let raw = value.ok_or_else(|| format!("Missing value for {}", flag))?;
    raw.parse()
        .map_err(|_| format!("Invalid value for {}: {}", flag, raw))
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        input: PathBuf::new(),
        output: None,
        hdu: 0,
        plane: None,
        format: None,
        delay_ms: None,
        ra: None,
        dec: None,
        radius: None,
        x: None,
        y: None,
        width: None,
        height: None,
    };
    let mut input = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--ra" => opts.ra = Some(parse_number(arg, iter.next())?),
            "--dec" => opts.dec = Some(parse_number(arg, iter.next())?),
            "--radius" => opts.radius = Some(parse_number(arg, iter.next())?),
            "--x" => opts.x = Some(parse_number(arg, iter.next())?),
            "--y" => opts.y = Some(parse_number(arg, iter.next())?),
            "--width" => opts.width = Some(parse_number(arg, iter.next())?),
            "--height" => opts.height = Some(parse_number(arg, iter.next())?),
            "--hdu" => opts.hdu = parse_number(arg, iter.next())?,
            "--plane" => opts.plane = Some(parse_number(arg, iter.next())?),
            "--delay" => opts.delay_ms = Some(parse_number(arg, iter.next())?),
            "--format" => {
                let value = iter.next().ok_or("Missing value for --format")?;
                opts.format = Some(value.clone());
            }
            "-o" | "--output" => {
                let value = iter.next().ok_or("Missing value for --output")?;
                opts.output = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown option: {}", other));
            }
            other => {
                if input.is_some() {
                    return Err("Too many arguments".to_string());
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    opts.input = input.ok_or_else(|| USAGE.to_string())?;
    Ok(opts)
}

fn region_from(opts: &Options) -> Result<RegionSpec, String> {
    let sky = [opts.ra, opts.dec, opts.radius];
    let rect = [
        opts.x.map(|_| ()),
        opts.y.map(|_| ()),
        opts.width.map(|_| ()),
        opts.height.map(|_| ()),
    ];
    match (
        sky.iter().filter(|v| v.is_some()).count(),
        rect.iter().filter(|v| v.is_some()).count(),
    ) {
        (3, 0) => Ok(RegionSpec::Sky {
            ra: opts.ra.unwrap(),
            dec: opts.dec.unwrap(),
            radius: opts.radius.unwrap(),
        }),
        (0, 4) => Ok(RegionSpec::Pixels {
            x: opts.x.unwrap(),
            y: opts.y.unwrap(),
            width: opts.width.unwrap(),
            height: opts.height.unwrap(),
        }),
        (0, 0) => Err("No region given; pass --ra/--dec/--radius or --x/--y/--width/--height"
            .to_string()),
        _ => Err("Give either a complete sky region or a complete pixel region".to_string()),
    }
}

fn pick_format(
    name: Option<&str>,
    source: &ImageSource,
    plane: Option<usize>,
) -> Result<OutputFormat, String> {
    match name.unwrap_or("fits") {
        "fits" => Ok(OutputFormat::Fits),
        "png" => Ok(OutputFormat::Png),
        "gif" => Ok(OutputFormat::AnimatedGif),
        "auto" => Ok(raster_format(source, plane)),
        other => Err(format!("Unknown format: {}", other)),
    }
}

fn extension_for(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Fits => "fits",
        OutputFormat::Png => "png",
        OutputFormat::AnimatedGif => "gif",
    }
}

fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cutout");
    input.with_file_name(format!("{}_cutout.{}", stem, extension_for(format)))
}

fn run(args: &[String]) -> Result<String, String> {
    let opts = parse_args(args)?;
    let region = region_from(&opts)?;

    let source = ImageSource::open(&opts.input, opts.hdu)
        .map_err(|e| format!("Error reading '{}': {}", opts.input.display(), e))?;
    let format = pick_format(opts.format.as_deref(), &source, opts.plane)?;

    let wcs = match region {
        RegionSpec::Sky { .. } => Some(
            KeywordWcs::from_cards(&source.cards, source.width(), source.height())
                .map_err(|e| format!("No usable WCS in '{}': {}", opts.input.display(), e))?,
        ),
        RegionSpec::Pixels { .. } => None,
    };

    let request = CutoutRequest {
        region,
        plane: opts.plane,
        format,
        delay_ms: opts.delay_ms,
    };
    let out = cutout(&source, wcs.as_ref().map(|w| w as &dyn Wcs), &request)
        .map_err(|e| format!("Cutout failed: {}", e))?;

    let output_path = opts
        .output
        .unwrap_or_else(|| default_output(&opts.input, format));
    std::fs::write(&output_path, &out.bytes)
        .map_err(|e| format!("Error writing '{}': {}", output_path.display(), e))?;

    let shape = out
        .naxes
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join("x");
    Ok(format!("Wrote {} cutout to {}\n", shape, output_path.display()))
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => print!("{}", output),
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fits_cutout::card::{serialize_header, Card, Value};
    use fits_cutout::PixelBuffer;

    fn image_fits(width: usize, height: usize, depth: Option<usize>) -> Vec<u8> {
        let mut cards = vec![
            Card::new(b"SIMPLE", Value::Logical(true)),
            Card::new(b"BITPIX", Value::Integer(16)),
            Card::new(
                b"NAXIS",
                Value::Integer(if depth.is_some() { 3 } else { 2 }),
            ),
            Card::new(b"NAXIS1", Value::Integer(width as i64)),
            Card::new(b"NAXIS2", Value::Integer(height as i64)),
        ];
        if let Some(d) = depth {
            cards.push(Card::new(b"NAXIS3", Value::Integer(d as i64)));
        }
        cards.extend([
            Card::new(b"CRVAL1", Value::Float(180.0)),
            Card::new(b"CRVAL2", Value::Float(0.0)),
            Card::new(b"CRPIX1", Value::Float(width as f64 / 2.0 + 0.5)),
            Card::new(b"CRPIX2", Value::Float(height as f64 / 2.0 + 0.5)),
            Card::new(b"CDELT1", Value::Float(-1.0 / 3600.0)),
            Card::new(b"CDELT2", Value::Float(1.0 / 3600.0)),
        ]);

        let n = width * height * depth.unwrap_or(1);
        let data = PixelBuffer::I16((0..n).map(|i| i as i16).collect());
        let mut bytes = serialize_header(&cards);
        bytes.extend_from_slice(&data.encode_be());
        bytes
    }

    fn temp_fits(
        width: usize,
        height: usize,
        depth: Option<usize>,
    ) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.fits");
        std::fs::write(&path, image_fits(width, height, depth)).unwrap();
        (dir, path)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn run_no_args_prints_usage() {
        let result = run(&[]);
        assert!(result.unwrap_err().contains("Usage:"));
    }

    #[test]
    fn run_unknown_option() {
        let result = run(&args(&["a.fits", "--bogus"]));
        assert!(result.unwrap_err().contains("Unknown option"));
    }

    #[test]
    fn run_requires_a_region() {
        let result = run(&args(&["a.fits"]));
        assert!(result.unwrap_err().contains("No region"));
    }

    #[test]
    fn run_rejects_mixed_region() {
        let result = run(&args(&["a.fits", "--ra", "180", "--x", "3"]));
        assert!(result.unwrap_err().contains("complete"));
    }

    #[test]
    fn run_missing_file() {
        let result = run(&args(&[
            "/nonexistent.fits",
            "--x",
            "0",
            "--y",
            "0",
            "--width",
            "4",
            "--height",
            "4",
        ]));
        assert!(result.unwrap_err().contains("Error reading"));
    }

    #[test]
    fn pixel_cutout_writes_fits() {
        let (_dir, input) = temp_fits(32, 32, None);
        let out_path = input.with_file_name("out.fits");
        let result = run(&args(&[
            input.to_str().unwrap(),
            "--x",
            "4",
            "--y",
            "4",
            "--width",
            "8",
            "--height",
            "8",
            "-o",
            out_path.to_str().unwrap(),
        ]))
        .unwrap();

        assert!(result.contains("8x8"));
        let reopened = ImageSource::open(&out_path, 0).unwrap();
        assert_eq!(reopened.width(), 8);
        assert_eq!(reopened.height(), 8);
    }

    #[test]
    fn sky_cutout_uses_header_wcs() {
        let (_dir, input) = temp_fits(256, 256, None);
        let out_path = input.with_file_name("sky.fits");
        let result = run(&args(&[
            input.to_str().unwrap(),
            "--ra",
            "180",
            "--dec",
            "0",
            "--radius",
            "0.01",
            "-o",
            out_path.to_str().unwrap(),
        ]))
        .unwrap();

        // 0.01 deg at 1 arcsec per pixel is about 72 px across.
        let reopened = ImageSource::open(&out_path, 0).unwrap();
        assert!((71..=73).contains(&reopened.width()), "{}", reopened.width());
        assert!(result.contains("Wrote"));
    }

    #[test]
    fn auto_format_picks_gif_for_cubes() {
        let (_dir, input) = temp_fits(16, 16, Some(3));
        let result = run(&args(&[
            input.to_str().unwrap(),
            "--x",
            "0",
            "--y",
            "0",
            "--width",
            "16",
            "--height",
            "16",
            "--format",
            "auto",
        ]))
        .unwrap();

        assert!(result.contains(".gif"));
        let gif_path = input.with_file_name("test_cutout.gif");
        let bytes = std::fs::read(&gif_path).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
    }

    #[test]
    fn plane_selection_flattens_cubes() {
        let (_dir, input) = temp_fits(16, 16, Some(3));
        let out_path = input.with_file_name("plane.fits");
        run(&args(&[
            input.to_str().unwrap(),
            "--x",
            "0",
            "--y",
            "0",
            "--width",
            "8",
            "--height",
            "8",
            "--plane",
            "1",
            "-o",
            out_path.to_str().unwrap(),
        ]))
        .unwrap();

        let reopened = ImageSource::open(&out_path, 0).unwrap();
        assert!(!reopened.is_cube());
    }

    #[test]
    fn out_of_bounds_region_fails_cleanly() {
        let (_dir, input) = temp_fits(16, 16, None);
        let result = run(&args(&[
            input.to_str().unwrap(),
            "--x",
            "100",
            "--y",
            "0",
            "--width",
            "4",
            "--height",
            "4",
        ]));
        assert!(result.unwrap_err().contains("Cutout failed"));
    }
}
