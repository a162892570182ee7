// pixel-compare: render korge-raster scenes and compare images.
//
// Usage:
//   pixel-compare render <scene> <w> <h> [--gpu] -o <file>
//   pixel-compare compare <a> <b> [-d diff.bmp] [-s sidebyside.bmp]
//   pixel-compare verify <scene> <w> <h> [--tolerance N] [-d diff.bmp]
//   pixel-compare list

use std::path::{Path, PathBuf};
use std::process;

use pixel_compare::scenes::{build_scene, list_scenes, render_shape, Backend};
use pixel_compare::*;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }
    let rest = &args[2..];
    let result = match args[1].as_str() {
        "render" => cmd_render(rest),
        "compare" => cmd_compare(rest),
        "verify" => cmd_verify(rest),
        "list" => {
            for name in list_scenes() {
                println!("{name}");
            }
            Ok(true)
        }
        _ => {
            print_usage();
            Ok(false)
        }
    };
    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  pixel-compare render <scene> <w> <h> [--gpu] -o <file>");
    eprintln!("  pixel-compare compare <a> <b> [-d diff.bmp] [-s sidebyside.bmp]");
    eprintln!("  pixel-compare verify <scene> <w> <h> [--tolerance N] [-d diff.bmp]");
    eprintln!("  pixel-compare list");
}

type CmdResult = Result<bool, Box<dyn std::error::Error>>;

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

fn scene_args(args: &[String]) -> Result<(String, u32, u32), Box<dyn std::error::Error>> {
    if args.len() < 3 {
        return Err("expected <scene> <w> <h>".into());
    }
    Ok((args[0].clone(), args[1].parse()?, args[2].parse()?))
}

fn render(name: &str, w: u32, h: u32, backend: Backend) -> Result<PixelBuffer, Box<dyn std::error::Error>> {
    let shape = build_scene(name, w, h).ok_or_else(|| format!("unknown scene '{name}'"))?;
    let bmp = render_shape(&shape, w, h, backend)?;
    Ok(PixelBuffer::from_bitmap(&bmp))
}

fn cmd_render(args: &[String]) -> CmdResult {
    let (name, w, h) = scene_args(args)?;
    let output = flag_value(args, "-o").ok_or("missing -o <file>")?;
    let backend = if args.iter().any(|a| a == "--gpu") {
        Backend::Gpu
    } else {
        Backend::Cpu
    };
    let buf = render(&name, w, h, backend)?;
    save_image(Path::new(&output), &buf)?;
    println!("rendered '{name}' ({w}x{h}, {backend:?}) -> {output}");
    Ok(true)
}

fn write_diffs(args: &[String], a: &PixelBuffer, b: &PixelBuffer) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = flag_value(args, "-d").map(PathBuf::from) {
        save_image(&path, &generate_diff_image(a, b)?)?;
        println!("diff image: {}", path.display());
    }
    if let Some(path) = flag_value(args, "-s").map(PathBuf::from) {
        save_image(&path, &generate_sidebyside(a, b)?)?;
        println!("side-by-side: {}", path.display());
    }
    Ok(())
}

fn cmd_compare(args: &[String]) -> CmdResult {
    if args.len() < 2 {
        return Err("expected <a> <b>".into());
    }
    let a = load_image(Path::new(&args[0]))?;
    let b = load_image(Path::new(&args[1]))?;
    let result = compare_buffers(&a, &b)?;
    println!("{result}");
    if !result.identical() {
        write_diffs(args, &a, &b)?;
    }
    Ok(result.identical())
}

/// Renders a scene through both backends and checks they agree.
fn cmd_verify(args: &[String]) -> CmdResult {
    let (name, w, h) = scene_args(args)?;
    let tolerance = match flag_value(args, "--tolerance") {
        Some(t) => t.parse::<f64>()?,
        None => 2.0,
    };
    let cpu = render(&name, w, h, Backend::Cpu)?;
    let gpu = render(&name, w, h, Backend::Gpu)?;
    let result = compare_buffers(&cpu, &gpu)?;
    println!("{result}");
    let ok = result.similar(tolerance);
    if !ok {
        write_diffs(args, &cpu, &gpu)?;
    }
    println!("{}", if ok { "PASS" } else { "FAIL" });
    Ok(ok)
}
