use std::path::PathBuf;

use clap::Parser;
use winit::dpi::LogicalSize;

/// Studio window configuration.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(
    name = "tessel-studio",
    about = "Draws an animated quad scene. IMAGE, when given, is shown next to the built-in atlas."
)]
pub struct StudioConfig {
    /// Window title.
    #[arg(short, long, default_value = "tessel studio")]
    pub title: String,

    /// Initial window size in logical pixels.
    #[arg(short = 's', long = "size", value_name = "WxH", default_value = "1024x640", value_parser = parse_size)]
    pub initial_size: LogicalSize<f64>,

    /// Extra image to display.
    #[arg(value_name = "IMAGE")]
    pub texture_path: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            title: "tessel studio".to_string(),
            initial_size: LogicalSize::new(1024.0, 640.0),
            texture_path: None,
        }
    }
}

fn parse_size(value: &str) -> Result<LogicalSize<f64>, String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("size `{value}` is not WIDTHxHEIGHT"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width in `{value}`: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height in `{value}`: {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("size `{value}` must be non-zero"));
    }
    Ok(LogicalSize::new(w as f64, h as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<StudioConfig, clap::Error> {
        StudioConfig::try_parse_from(std::iter::once("tessel-studio").chain(args.iter().copied()))
    }

    #[test]
    fn no_args_is_default() {
        assert_eq!(parse(&[]).unwrap(), StudioConfig::default());
    }

    #[test]
    fn help_is_reported_by_clap() {
        let err = parse(&["-s", "10x10", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn unknown_flag_fails() {
        assert!(parse(&["--fullscreen"]).is_err());
    }

    #[test]
    fn missing_value_fails() {
        assert!(parse(&["--title"]).is_err());
    }

    #[test]
    fn zero_size_fails() {
        assert!(parse(&["--size", "0x480"]).is_err());
        assert!(parse(&["--size", "640"]).is_err());
    }

    #[test]
    fn two_images_fail() {
        assert!(parse(&["a.png", "b.png"]).is_err());
    }

    #[test]
    fn full_command_line() {
        let config = parse(&["--title", "sheet", "-s", "800X600", "sprites.png"]).unwrap();
        assert_eq!(config.title, "sheet");
        assert_eq!(config.initial_size, LogicalSize::new(800.0, 600.0));
        assert_eq!(config.texture_path, Some(PathBuf::from("sprites.png")));
    }
}
