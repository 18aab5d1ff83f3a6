use argh::FromArgs;
use std::path::PathBuf;
use std::str::FromStr;

use depthcloud::io::functional::{read_depth_any, read_image_rgb8};
use depthcloud::k3d;
use depthcloud::k3d::colorize::SamplingPolicy;
use depthcloud::k3d::io::pcd::{write_pcd_ascii, PcdWriteOptions};
use depthcloud::k3d::pipeline::CloudAssembler;
use depthcloud::k3d::pointcloud::{AssembledCloud, PointCloud, PointRecord};

/// The kind of cloud to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Colour,
}

impl Mode {
    fn default_output(&self) -> &'static str {
        match self {
            Mode::Normal => "./pointCloud.pcd",
            Mode::Colour => "./RGBpointCloud.pcd",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" | "n" => Ok(Mode::Normal),
            "colour" | "color" | "c" => Ok(Mode::Colour),
            _ => Err(format!(
                "unknown mode '{s}': use 'normal' (n) for a geometric cloud or 'colour' (c) for a colorized cloud"
            )),
        }
    }
}

#[derive(FromArgs)]
/// Convert a depth raster to a point cloud, optionally colorized from an RGB image
struct Args {
    /// normal (n) for a geometric cloud, colour (c) for a colorized cloud
    #[argh(positional)]
    mode: Mode,

    /// path to the depth raster (.pfm, 16-bit or float image)
    #[argh(option)]
    depth: PathBuf,

    /// path to the calibration file (libconfig or .json)
    #[argh(option)]
    calibration: PathBuf,

    /// path to the RGB image, required in colour mode
    #[argh(option)]
    color: Option<PathBuf>,

    /// path to the output .pcd file
    #[argh(option)]
    output: Option<PathBuf>,

    /// number of decimal digits written for coordinates
    #[argh(option)]
    precision: Option<usize>,

    /// mirror negative pixel coordinates instead of dropping the points
    #[argh(switch)]
    fold_negative: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let calibration = k3d::io::config::read_calibration(&args.calibration)?;

    let depth = read_depth_any(&args.depth)?;
    log::info!("Depth raster: {}", depth.size());

    let color_image = match (args.mode, &args.color) {
        (Mode::Colour, Some(path)) => Some(read_image_rgb8(path)?),
        (Mode::Colour, None) => return Err("colour mode requires --color <path>".into()),
        (Mode::Normal, Some(path)) => {
            log::warn!("ignoring {} in normal mode", path.display());
            None
        }
        (Mode::Normal, None) => None,
    };

    let policy = if args.fold_negative {
        SamplingPolicy::FoldNegative
    } else {
        SamplingPolicy::Discard
    };

    let assembler = CloudAssembler::new(calibration).with_policy(policy);
    let (cloud, stats) = assembler.run(&depth, color_image.as_ref())?;

    if let Some(stats) = stats {
        log::info!(
            "Colorized #{} points, dropped #{}",
            stats.kept,
            stats.discarded()
        );
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(args.mode.default_output()));
    let options = PcdWriteOptions {
        precision: args.precision,
    };

    match &cloud {
        AssembledCloud::Geometric(cloud) => {
            log_bounds(cloud);
            write_pcd_ascii(&output, cloud, &options)?;
        }
        AssembledCloud::Colorized(cloud) => {
            log_bounds(cloud);
            write_pcd_ascii(&output, cloud, &options)?;
        }
    }

    println!("Saved #{} points to {}", cloud.len(), output.display());

    Ok(())
}

fn log_bounds<P: PointRecord>(cloud: &PointCloud<P>) {
    if let (Some(min), Some(max)) = (cloud.min_bound(), cloud.max_bound()) {
        log::info!(
            "Bounds: [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]",
            min.x,
            min.y,
            min.z,
            max.x,
            max.y,
            max.z
        );
    } else {
        log::warn!("The cloud has no finite point");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode() {
        assert_eq!("n".parse::<Mode>(), Ok(Mode::Normal));
        assert_eq!("normal".parse::<Mode>(), Ok(Mode::Normal));
        assert_eq!("c".parse::<Mode>(), Ok(Mode::Colour));
        assert_eq!("color".parse::<Mode>(), Ok(Mode::Colour));
        assert!("rgb".parse::<Mode>().is_err());
        assert_eq!(Mode::Colour.default_output(), "./RGBpointCloud.pcd");
    }
}
