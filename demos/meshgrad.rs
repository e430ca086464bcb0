//! Very simple tool that accepts a JSON list of mesh gradients and produces a rasterized image
#![deny(warnings)]

use meshgrad::*;
use std::{
    env,
    fs::File,
    io::{BufWriter, Read},
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

type Error = Box<dyn std::error::Error>;

#[derive(Debug)]
struct Args {
    input_file: String,
    output_file: String,
    id: Option<String>,
    width: usize,
    height: usize,
    bbox: Option<BBox>,
}

impl Args {
    fn parse() -> Result<Args, Error> {
        let mut result = Args {
            input_file: String::new(),
            output_file: String::new(),
            id: None,
            width: 512,
            height: 512,
            bbox: None,
        };
        let mut positional = 0;
        let mut args = env::args();
        let cmd = args.next().unwrap();
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-h" => {
                    positional = 0;
                    break;
                }
                "-w" => {
                    let width = args.next().ok_or("-w requires argument")?;
                    result.width = width.parse()?;
                }
                "-e" => {
                    let height = args.next().ok_or("-e requires argument")?;
                    result.height = height.parse()?;
                }
                "-g" => {
                    result.id = Some(args.next().ok_or("-g requires argument")?);
                }
                "-b" => {
                    let bbox = args.next().ok_or("-b requires argument")?;
                    result.bbox = Some(bbox_parse(&bbox)?);
                }
                _ => {
                    positional += 1;
                    match positional {
                        1 => result.input_file = arg,
                        2 => result.output_file = arg,
                        _ => return Err("unexpected positional argment".into()),
                    }
                }
            }
        }
        if positional < 2 {
            eprintln!(
                "Very simple tool that accepts a JSON list of mesh gradients and produces a rasterized image"
            );
            eprintln!("\nUSAGE:");
            eprintln!(
                "    {} [-w <width>] [-e <height>] [-g <id>] [-b <bbox>] <file.json> <out.bmp>",
                cmd
            );
            eprintln!("\nARGS:");
            eprintln!("    -w <width>     width in pixels of the output image (default: 512)");
            eprintln!("    -e <height>    height in pixels of the output image (default: 512)");
            eprintln!("    -g <id>        id of the gradient to render (default: first)");
            eprintln!("    -b <bbox>      shape bounding box as `x,y,width,height`");
            eprintln!("                   (default: the mesh bounding box for userSpaceOnUse");
            eprintln!("                   gradients, else the full output image)");
            eprintln!("    <file.json>    file with a list of mesh gradients ('-' means stdin)");
            eprintln!("    <out.bmp>      image rendered in the BMP format ('-' means stdout)");
            std::process::exit(1);
        }
        Ok(result)
    }
}

fn bbox_parse(text: &str) -> Result<BBox, Error> {
    let values = text
        .split(',')
        .map(|value| value.trim().parse::<Scalar>())
        .collect::<Result<Vec<_>, _>>()?;
    match *values.as_slice() {
        [x, y, width, height] => Ok(BBox::new((x, y), (x + width, y + height))),
        _ => Err("bbox expected to be `x,y,width,height`".into()),
    }
}

/// Load the list of gradients from a file
fn gradients_load(path: String) -> Result<Vec<MeshGradient>, Error> {
    let mut contents = String::new();
    if path != "-" {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    } else {
        std::io::stdin().read_to_string(&mut contents)?;
    }
    Ok(tracing::debug_span!("[parse]").in_scope(|| serde_json::from_str(&contents))?)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    let gradients = gradients_load(args.input_file)?;
    let gradient = match &args.id {
        Some(id) => MeshGradient::find(&gradients, id)?,
        None => gradients.first().ok_or("no gradients in the input")?,
    };

    let (mut mesh, errors) = tracing::debug_span!("[build]").in_scope(|| gradient.build());
    for error in errors {
        tracing::warn!("{}", error);
    }

    let bbox = match args.bbox {
        Some(bbox) => bbox,
        None => match gradient.units {
            Units::UserSpaceOnUse => mesh.bbox().ok_or("mesh is empty")?,
            Units::ObjectBoundingBox => {
                BBox::new((0.0, 0.0), (args.width as Scalar, args.height as Scalar))
            }
        },
    };
    for error in mesh.to_raster_space(gradient.units, gradient.transform.as_deref(), bbox) {
        tracing::warn!("{}", error);
    }

    let mut image = ImageOwned::<Rgba>::new_default(args.height, args.width);
    tracing::debug_span!("[paint]").in_scope(|| mesh.paint(&mut image));

    let save = tracing::debug_span!("[save]");
    {
        let _ = save.enter();
        if args.output_file != "-" {
            let mut image_file = BufWriter::new(File::create(args.output_file)?);
            image.write_bmp(&mut image_file)?;
        } else {
            image.write_bmp(std::io::stdout())?;
        }
    }

    Ok(())
}
